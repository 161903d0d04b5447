//! Core types for the asset reference graph.
//!
//! Defines identifiers, changesets, the path index and the chains
//! returned by dependency queries.

use ignore::WalkBuilder;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::config::ScanConfig;
use crate::error::{AssetGraphError, Result};
use crate::parser::{is_hex_digit, AssetKind};

/// Length of a well-formed asset identifier.
pub const GUID_LEN: usize = 32;

/// Forward edges produced by a scan: identifier -> identifiers it references.
///
/// An empty set means "scanned, found nothing" (or deleted), which is
/// different from the identifier being absent.
pub type ForwardEdges = HashMap<Guid, HashSet<Guid>>;

/// An opaque asset identifier (a 32-character lowercase hex GUID in practice).
///
/// Equality and hashing are by content. Construction through `From` does not
/// validate; use [`Guid::parse`] for untrusted input.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Guid(String);

impl Guid {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Parse a user-supplied identifier, requiring 32 lowercase hex digits.
    pub fn parse(value: &str) -> Result<Self> {
        let guid = Self(value.trim().to_string());
        if guid.is_well_formed() {
            Ok(guid)
        } else {
            Err(AssetGraphError::InvalidGuid(value.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True if this is exactly 32 lowercase hex digits.
    pub fn is_well_formed(&self) -> bool {
        self.0.len() == GUID_LEN && self.0.bytes().all(is_hex_digit)
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Guid {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for Guid {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl FromStr for Guid {
    type Err = AssetGraphError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Borrow<str> for Guid {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// A set of filesystem changes to apply to the graph.
///
/// Paths are project-relative (e.g. `Assets/Scenes/Main.unity`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    /// New or modified files to (re)scan.
    pub added: Vec<PathBuf>,
    /// Files that no longer exist.
    pub deleted: Vec<PathBuf>,
    /// Renamed files, `(from, to)`.
    pub moved: Vec<(PathBuf, PathBuf)>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn added(mut self, path: impl Into<PathBuf>) -> Self {
        self.added.push(path.into());
        self
    }

    pub fn deleted(mut self, path: impl Into<PathBuf>) -> Self {
        self.deleted.push(path.into());
        self
    }

    pub fn moved(mut self, from: impl Into<PathBuf>, to: impl Into<PathBuf>) -> Self {
        self.moved.push((from.into(), to.into()));
        self
    }

    /// Total number of entries, used as the progress denominator.
    pub fn len(&self) -> usize {
        self.added.len() + self.deleted.len() + self.moved.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry whose extension is not on the scannable allow-list.
    ///
    /// Moves survive when either side is scannable; a move into a
    /// non-scannable path becomes a deletion of the source.
    pub fn retain_scannable(&mut self) {
        let is_asset = |p: &Path| AssetKind::from_path(p).is_some();

        self.added.retain(|p| is_asset(p));
        self.deleted.retain(|p| is_asset(p));

        let mut moved = Vec::with_capacity(self.moved.len());
        for (from, to) in self.moved.drain(..) {
            match (is_asset(&from), is_asset(&to)) {
                (_, true) => moved.push((from, to)),
                (true, false) => self.deleted.push(from),
                (false, false) => {}
            }
        }
        self.moved = moved;
    }

    /// Build a changeset that marks every scannable file under `root` as added.
    ///
    /// Respects .gitignore when configured and always skips hidden entries.
    /// Returned paths are relative to `root`.
    pub fn full_scan(root: &Path, config: &ScanConfig) -> Result<Self> {
        let mut added = Vec::new();

        for entry in WalkBuilder::new(root)
            .hidden(true)
            .git_ignore(config.respect_gitignore)
            .git_global(config.respect_gitignore)
            .git_exclude(config.respect_gitignore)
            .build()
        {
            let entry = entry?;
            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }
            if AssetKind::from_path(entry.path()).is_none() {
                continue;
            }
            let relative = entry
                .path()
                .strip_prefix(root)
                .map(Path::to_path_buf)
                .unwrap_or_else(|_| entry.path().to_path_buf());
            added.push(relative);
        }

        added.sort();
        Ok(Self {
            added,
            ..Self::default()
        })
    }
}

/// Bidirectional path <-> identifier index for scanned assets.
#[derive(Debug, Clone, Default)]
pub struct PathIndex {
    by_path: HashMap<PathBuf, Guid>,
    by_guid: HashMap<Guid, PathBuf>,
}

impl PathIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.by_path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_path.is_empty()
    }

    pub fn guid_of(&self, path: &Path) -> Option<&Guid> {
        self.by_path.get(path)
    }

    pub fn path_of(&self, guid: &str) -> Option<&Path> {
        self.by_guid.get(guid).map(PathBuf::as_path)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Path, &Guid)> {
        self.by_path.iter().map(|(p, g)| (p.as_path(), g))
    }

    /// Map `path` to `guid`. Returns the identifier previously stored at
    /// `path`, if any. A stale path still pointing at `guid` is dropped.
    pub fn insert(&mut self, path: PathBuf, guid: Guid) -> Option<Guid> {
        if let Some(old_path) = self.by_guid.get(&guid) {
            if *old_path != path && self.by_path.get(old_path) == Some(&guid) {
                let old_path = old_path.clone();
                self.by_path.remove(&old_path);
            }
        }

        let previous = self.by_path.insert(path.clone(), guid.clone());
        if let Some(prev) = &previous {
            let points_here = self.by_guid.get(prev).map(PathBuf::as_path) == Some(path.as_path());
            if *prev != guid && points_here {
                self.by_guid.remove(prev);
            }
        }
        self.by_guid.insert(guid, path);
        previous
    }

    /// Forget `path`. Returns its identifier if the path was known.
    pub fn remove_path(&mut self, path: &Path) -> Option<Guid> {
        let guid = self.by_path.remove(path)?;
        if self.by_guid.get(&guid).map(PathBuf::as_path) == Some(path) {
            self.by_guid.remove(&guid);
        }
        Some(guid)
    }

    /// Re-key `from` to `to`, keeping the identifier. Unknown `from` is a no-op.
    pub fn rename(&mut self, from: &Path, to: PathBuf) -> Option<Guid> {
        let guid = self.remove_path(from)?;
        self.insert(to, guid.clone());
        Some(guid)
    }
}

/// A dependency chain found by [`crate::graph::find_chains`].
///
/// Ordered from the matching node (head, the "top" of the dependency tree)
/// down to the query identifier (last). Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Chain(Vec<Guid>);

impl Chain {
    pub(crate) fn from_nodes(nodes: Vec<Guid>) -> Self {
        debug_assert!(!nodes.is_empty());
        Self(nodes)
    }

    /// The node that satisfied the search predicate.
    pub fn head(&self) -> &Guid {
        &self.0[0]
    }

    /// The identifier the query started from.
    pub fn tail(&self) -> &Guid {
        &self.0[self.0.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Guid> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Guid] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<Guid> {
        self.0
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, guid) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" -> ")?;
            }
            write!(f, "{}", guid)?;
        }
        Ok(())
    }
}
