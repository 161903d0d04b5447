//! Reference extraction for a single asset file.
//!
//! Finds every `{fileID: <digits>, guid: <hex>, ...}` token in the file's
//! raw bytes, then hands the same bytes to any registered
//! [`SubExtractor`]s for format-specific references.

use std::collections::HashSet;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

use super::scanner::ByteScanner;
use crate::graph::Guid;
use crate::source::{MetadataReader, RawBytesReader};

/// Literal that opens an object reference.
pub const REFERENCE_PREFIX: &[u8] = b"{fileID:";

const GUID_KEY: &[u8] = b"guid:";

/// Why a file contributed nothing to a batch.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// Intentionally excluded by configuration; not a data problem.
    #[error("{} is under a reserved prefix", .0.display())]
    Excluded(PathBuf),

    /// The companion metadata file is absent or has no identifier.
    #[error("no valid metadata for {}", .0.display())]
    MissingMeta(PathBuf),

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Extraction code panicked while processing this file.
    #[error("extraction panicked for {}", .0.display())]
    Panicked(PathBuf),
}

impl ExtractError {
    /// True for configuration exclusions, false for data errors.
    pub fn is_exclusion(&self) -> bool {
        matches!(self, ExtractError::Excluded(_))
    }
}

/// Pluggable format-specific reference finder.
///
/// `init_before_batch` runs once per batch on the calling thread, before any
/// worker starts. `extract` is then called concurrently from workers.
pub trait SubExtractor: Send + Sync {
    fn name(&self) -> &str;

    fn init_before_batch(&mut self) {}

    /// Additional identifiers referenced by `bytes` (already truncated to the
    /// valid length).
    fn extract(&self, bytes: &[u8]) -> HashSet<Guid>;
}

/// Per-worker reusable buffers. Never shared between threads.
#[derive(Debug, Default)]
pub struct ScanScratch {
    bytes: Vec<u8>,
    token: String,
}

impl ScanScratch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current byte buffer size (the largest file seen so far).
    pub fn buffer_len(&self) -> usize {
        self.bytes.len()
    }
}

/// Everything one file contributes to the graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReferences {
    pub path: PathBuf,
    pub guid: Guid,
    pub references: HashSet<Guid>,
}

/// Try to match a full reference starting at `start` (which must hold
/// [`REFERENCE_PREFIX`]). On success `token` holds the identifier and the
/// index just past the trailing comma is returned.
fn match_reference_at(
    scanner: &ByteScanner<'_>,
    start: usize,
    token: &mut String,
) -> Option<usize> {
    let mut i = start + REFERENCE_PREFIX.len();
    scanner.skip_whitespace(&mut i);
    scanner.skip_digits(&mut i);
    if !scanner.skip_literal_char(&mut i, b',') {
        return None;
    }
    scanner.skip_whitespace(&mut i);
    if !scanner.match_literal(i, GUID_KEY) {
        return None;
    }
    i += GUID_KEY.len();
    scanner.skip_whitespace(&mut i);

    let len = scanner.read_hex_token(i, token).len();
    if len == 0 {
        return None;
    }
    i += len;
    if !scanner.skip_literal_char(&mut i, b',') {
        return None;
    }
    Some(i)
}

/// Add every referenced identifier in the scanner's bytes to `out`.
///
/// Single forward pass. A failed partial match at `i` resumes at `i + 1`.
pub fn scan_references(
    scanner: &ByteScanner<'_>,
    token: &mut String,
    out: &mut HashSet<Guid>,
) {
    let mut i = 0;
    while i < scanner.len() {
        if scanner.match_literal(i, REFERENCE_PREFIX) {
            if let Some(end) = match_reference_at(scanner, i, token) {
                if !out.contains(token.as_str()) {
                    out.insert(Guid::new(token.as_str()));
                }
                i = end;
                continue;
            }
        }
        i += 1;
    }
}

/// Convenience wrapper over [`scan_references`] for a standalone buffer.
pub fn extract_references(bytes: &[u8]) -> HashSet<Guid> {
    let mut out = HashSet::new();
    let mut token = String::new();
    scan_references(&ByteScanner::new(bytes, bytes.len()), &mut token, &mut out);
    out
}

/// Resolves a file's own identifier and collects its outgoing references.
pub struct ReferenceExtractor {
    metadata: Arc<dyn MetadataReader>,
    reader: Arc<dyn RawBytesReader>,
    sub_extractors: Vec<Box<dyn SubExtractor>>,
    reserved_prefixes: Vec<PathBuf>,
}

impl ReferenceExtractor {
    pub fn new(metadata: Arc<dyn MetadataReader>, reader: Arc<dyn RawBytesReader>) -> Self {
        Self {
            metadata,
            reader,
            sub_extractors: Vec::new(),
            reserved_prefixes: Vec::new(),
        }
    }

    /// Build from a single source that provides both metadata and contents.
    pub fn from_source<S>(source: Arc<S>) -> Self
    where
        S: MetadataReader + RawBytesReader + 'static,
    {
        Self::new(source.clone(), source)
    }

    pub fn with_reserved_prefixes<I, P>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.reserved_prefixes = prefixes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_sub_extractor(mut self, extractor: Box<dyn SubExtractor>) -> Self {
        self.sub_extractors.push(extractor);
        self
    }

    pub fn sub_extractor_names(&self) -> Vec<&str> {
        self.sub_extractors.iter().map(|e| e.name()).collect()
    }

    /// Run every sub-extractor's one-time setup on the calling thread.
    pub fn init_before_batch(&mut self) {
        for extractor in &mut self.sub_extractors {
            extractor.init_before_batch();
        }
    }

    pub fn is_reserved(&self, path: &Path) -> bool {
        self.reserved_prefixes.iter().any(|p| path.starts_with(p))
    }

    /// Extract one file's identifier and references, reusing `scratch`.
    pub fn extract(
        &self,
        path: &Path,
        scratch: &mut ScanScratch,
    ) -> Result<FileReferences, ExtractError> {
        if self.is_reserved(path) {
            return Err(ExtractError::Excluded(path.to_path_buf()));
        }
        let guid = self
            .metadata
            .read_guid(path)
            .ok_or_else(|| ExtractError::MissingMeta(path.to_path_buf()))?;

        let len = self
            .reader
            .read_all(path, &mut scratch.bytes)
            .map_err(|source| ExtractError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        let scanner = ByteScanner::new(&scratch.bytes, len);
        let mut references = HashSet::new();
        scan_references(&scanner, &mut scratch.token, &mut references);

        let valid = &scratch.bytes[..len];
        for extractor in &self.sub_extractors {
            references.extend(extractor.extract(valid));
        }

        Ok(FileReferences {
            path: path.to_path_buf(),
            guid,
            references,
        })
    }

    /// Like [`extract`](Self::extract), but a panic becomes
    /// [`ExtractError::Panicked`] instead of unwinding into the worker.
    pub fn extract_isolated(
        &self,
        path: &Path,
        scratch: &mut ScanScratch,
    ) -> Result<FileReferences, ExtractError> {
        panic::catch_unwind(AssertUnwindSafe(|| self.extract(path, scratch)))
            .unwrap_or_else(|_| Err(ExtractError::Panicked(path.to_path_buf())))
    }
}
