//! Collaborators that supply file contents and own identifiers.
//!
//! The scanner only talks to these traits, so tests and embedders can feed
//! it from memory, an archive, or a virtual filesystem.

use std::ffi::OsString;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use crate::config::ScanConfig;
use crate::graph::Guid;
use crate::parser::ByteScanner;

/// Resolves an asset path to its own identifier.
pub trait MetadataReader: Send + Sync {
    /// `None` when there is no valid companion descriptor. The caller logs.
    fn read_guid(&self, path: &Path) -> Option<Guid>;
}

/// Reads raw file contents into a caller-owned buffer.
pub trait RawBytesReader: Send + Sync {
    /// Fill `buffer` with the file's contents and return the valid length.
    ///
    /// The buffer may be grown but is never shrunk; bytes past the returned
    /// length are unspecified.
    fn read_all(&self, path: &Path, buffer: &mut Vec<u8>) -> io::Result<usize>;
}

/// Find the first `guid: <hex>` entry in a metadata descriptor.
pub fn parse_meta_guid(bytes: &[u8]) -> Option<Guid> {
    const GUID_KEY: &[u8] = b"guid:";

    let scanner = ByteScanner::new(bytes, bytes.len());
    let mut token = String::new();
    let mut from = 0;
    while let Some(at) = scanner.find_literal(from, GUID_KEY) {
        let mut i = at + GUID_KEY.len();
        scanner.skip_whitespace(&mut i);
        let hex = scanner.read_hex_token(i, &mut token);
        if !hex.is_empty() {
            return Some(Guid::new(hex));
        }
        from = at + 1;
    }
    None
}

/// Filesystem-backed source rooted at a project directory.
///
/// Paths handed to it are project-relative; metadata lives next to the
/// asset at `<asset>.<meta_extension>`.
#[derive(Debug, Clone)]
pub struct FsAssetSource {
    root: PathBuf,
    meta_extension: String,
}

impl FsAssetSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            meta_extension: "meta".to_string(),
        }
    }

    pub fn from_config(root: impl Into<PathBuf>, config: &ScanConfig) -> Self {
        Self {
            root: root.into(),
            meta_extension: config.meta_extension.clone(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        self.root.join(path)
    }

    /// Path of the companion metadata file for `path`.
    pub fn meta_path(&self, path: &Path) -> PathBuf {
        let mut meta: OsString = self.resolve(path).into_os_string();
        meta.push(".");
        meta.push(&self.meta_extension);
        PathBuf::from(meta)
    }
}

impl MetadataReader for FsAssetSource {
    fn read_guid(&self, path: &Path) -> Option<Guid> {
        let bytes = std::fs::read(self.meta_path(path)).ok()?;
        parse_meta_guid(&bytes)
    }
}

impl RawBytesReader for FsAssetSource {
    fn read_all(&self, path: &Path, buffer: &mut Vec<u8>) -> io::Result<usize> {
        let mut file = File::open(self.resolve(path))?;
        let expected = file.metadata().map(|m| m.len() as usize).unwrap_or(0);
        if buffer.len() < expected {
            buffer.resize(expected, 0);
        }

        let mut filled = 0;
        loop {
            if filled == buffer.len() {
                // Probe for bytes beyond the size reported at open time.
                let mut probe = [0u8; 4096];
                let n = file.read(&mut probe)?;
                if n == 0 {
                    break;
                }
                buffer.extend_from_slice(&probe[..n]);
                filled += n;
                continue;
            }
            match file.read(&mut buffer[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        Ok(filled)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::HashMap;
    use std::sync::RwLock;

    /// In-memory asset store for scanner and graph tests.
    #[derive(Default)]
    pub(crate) struct MemorySource {
        files: RwLock<HashMap<PathBuf, (Option<Guid>, Vec<u8>)>>,
    }

    impl MemorySource {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        pub(crate) fn put(&self, path: &str, guid: &str, content: &str) {
            self.files.write().unwrap().insert(
                PathBuf::from(path),
                (Some(Guid::from(guid)), content.as_bytes().to_vec()),
            );
        }

        pub(crate) fn put_without_meta(&self, path: &str, content: &str) {
            self.files
                .write()
                .unwrap()
                .insert(PathBuf::from(path), (None, content.as_bytes().to_vec()));
        }

        pub(crate) fn remove(&self, path: &str) {
            self.files.write().unwrap().remove(Path::new(path));
        }
    }

    impl MetadataReader for MemorySource {
        fn read_guid(&self, path: &Path) -> Option<Guid> {
            self.files.read().unwrap().get(path)?.0.clone()
        }
    }

    impl RawBytesReader for MemorySource {
        fn read_all(&self, path: &Path, buffer: &mut Vec<u8>) -> io::Result<usize> {
            let files = self.files.read().unwrap();
            let (_, content) = files
                .get(path)
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such asset"))?;
            if buffer.len() < content.len() {
                buffer.resize(content.len(), 0);
            }
            buffer[..content.len()].copy_from_slice(content);
            Ok(content.len())
        }
    }
}
