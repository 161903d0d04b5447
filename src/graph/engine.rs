//! The reference graph engine.
//!
//! Two adjacency maps kept in lockstep, plus the path index. The only
//! mutators are whole-batch operations, so the invariant
//! `c ∈ children_of[p] ⇔ p ∈ parents_of[c]` is enforced here and nowhere else.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;
use tracing::{debug, info};

use super::builder::{ParallelScanner, ScanProgress};
use super::chains::{find_chains, PathResolver};
use super::types::{Chain, ChangeSet, ForwardEdges, Guid, PathIndex};
use crate::error::Result;

/// How a batch of edges was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyMode {
    /// The graph was empty; the batch became the whole graph.
    FullScan,
    /// Existing state was patched for the touched identifiers only.
    Incremental,
}

impl fmt::Display for ApplyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApplyMode::FullScan => write!(f, "full_scan"),
            ApplyMode::Incremental => write!(f, "incremental"),
        }
    }
}

/// Summary of one `apply_changeset` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyReport {
    pub mode: ApplyMode,
    pub scanned: usize,
    pub failed: usize,
    pub excluded: usize,
    pub deleted: usize,
    pub moved: usize,
    /// Identifiers whose forward edges were replaced.
    pub touched: usize,
}

/// The asset reference graph.
#[derive(Debug, Clone, Default)]
pub struct ReferenceGraph {
    /// Inverse adjacency: who references this identifier.
    parents_of: HashMap<Guid, HashSet<Guid>>,
    /// Forward adjacency: what this identifier references. Never holds empty sets.
    children_of: HashMap<Guid, HashSet<Guid>>,
    paths: PathIndex,
}

impl ReferenceGraph {
    /// Create a new empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// True when no edges are stored (the next batch is a full scan).
    pub fn is_empty(&self) -> bool {
        self.parents_of.is_empty() && self.children_of.is_empty()
    }

    // ─── Read-only access ───────────────────────────────────────

    pub fn parents_of(&self) -> &HashMap<Guid, HashSet<Guid>> {
        &self.parents_of
    }

    pub fn children_of(&self) -> &HashMap<Guid, HashSet<Guid>> {
        &self.children_of
    }

    /// Identifiers whose files reference `guid`.
    pub fn parents(&self, guid: &str) -> Option<&HashSet<Guid>> {
        self.parents_of.get(guid)
    }

    /// Identifiers referenced by `guid`'s file.
    pub fn children(&self, guid: &str) -> Option<&HashSet<Guid>> {
        self.children_of.get(guid)
    }

    pub fn path_index(&self) -> &PathIndex {
        &self.paths
    }

    pub fn path_of(&self, guid: &str) -> Option<&Path> {
        self.paths.path_of(guid)
    }

    pub fn guid_of(&self, path: &Path) -> Option<&Guid> {
        self.paths.guid_of(path)
    }

    // ─── Mutation ───────────────────────────────────────────────

    /// Scan `changes` with `scanner` and patch the graph in place.
    ///
    /// Blocks until the whole batch is applied. The first call on an empty
    /// graph is a full scan.
    pub fn apply_changeset(
        &mut self,
        scanner: &mut ParallelScanner,
        changes: &ChangeSet,
        workers: usize,
        progress: &ScanProgress,
    ) -> Result<ApplyReport> {
        let batch = scanner.scan(changes, workers, progress, &mut self.paths)?;
        let touched = batch.edges.len();
        let mode = self.apply_edges(batch.edges);

        let report = ApplyReport {
            mode,
            scanned: batch.scanned,
            failed: batch.failed,
            excluded: batch.excluded,
            deleted: batch.deleted,
            moved: batch.moved,
            touched,
        };
        info!(
            mode = %report.mode,
            scanned = report.scanned,
            failed = report.failed,
            excluded = report.excluded,
            deleted = report.deleted,
            moved = report.moved,
            touched = report.touched,
            "applied changeset"
        );
        Ok(report)
    }

    /// Apply the complete new forward-edge state of a batch.
    pub fn apply_edges(&mut self, edges: ForwardEdges) -> ApplyMode {
        if self.is_empty() {
            self.apply_full_scan(edges);
            ApplyMode::FullScan
        } else {
            self.apply_patch(edges);
            ApplyMode::Incremental
        }
    }

    fn apply_full_scan(&mut self, edges: ForwardEdges) {
        debug!(identifiers = edges.len(), "building graph from full scan");
        for (parent, children) in &edges {
            for child in children {
                self.parents_of
                    .entry(child.clone())
                    .or_default()
                    .insert(parent.clone());
            }
        }
        self.children_of = edges
            .into_iter()
            .filter(|(_, children)| !children.is_empty())
            .collect();
    }

    fn apply_patch(&mut self, edges: ForwardEdges) {
        debug!(identifiers = edges.len(), "patching graph");

        // Undo every touched identifier's old state before applying new
        // state, or stale parents leak when a file's references shrink.
        for parent in edges.keys() {
            let Some(old_children) = self.children_of.remove(parent) else {
                continue;
            };
            for child in old_children {
                if let Some(parents) = self.parents_of.get_mut(&child) {
                    parents.remove(parent);
                    if parents.is_empty() {
                        self.parents_of.remove(&child);
                    }
                }
            }
        }

        for (parent, children) in &edges {
            for child in children {
                self.parents_of
                    .entry(child.clone())
                    .or_default()
                    .insert(parent.clone());
            }
        }

        for (parent, children) in edges {
            if !children.is_empty() {
                self.children_of.insert(parent, children);
            }
        }
    }

    // ─── Queries ────────────────────────────────────────────────

    /// Every chain from an ancestor of `start` whose path satisfies
    /// `predicate`, resolving paths through this graph's own index.
    ///
    /// Uncached: each call redoes the traversal.
    pub fn find_chains<P>(&self, start: &Guid, predicate: P) -> Vec<Chain>
    where
        P: FnMut(&Path) -> bool,
    {
        find_chains(&self.parents_of, start, &self.paths, predicate)
    }

    /// [`find_chains`](Self::find_chains) with an external path resolver.
    pub fn find_chains_with<R, P>(&self, start: &Guid, resolver: &R, predicate: P) -> Vec<Chain>
    where
        R: PathResolver + ?Sized,
        P: FnMut(&Path) -> bool,
    {
        find_chains(&self.parents_of, start, resolver, predicate)
    }

    /// Check the bidirectional invariant and the no-empty-forward-set rule.
    pub fn is_consistent(&self) -> bool {
        let forward_ok = self.children_of.iter().all(|(parent, children)| {
            !children.is_empty()
                && children.iter().all(|child| {
                    self.parents_of
                        .get(child)
                        .is_some_and(|parents| parents.contains(parent))
                })
        });
        let inverse_ok = self.parents_of.iter().all(|(child, parents)| {
            parents.iter().all(|parent| {
                self.children_of
                    .get(parent)
                    .is_some_and(|children| children.contains(child))
            })
        });
        forward_ok && inverse_ok
    }

    // ─── Stats ──────────────────────────────────────────────────

    pub fn stats(&self) -> GraphStats {
        GraphStats {
            scanned_assets: self.paths.len(),
            assets_with_references: self.children_of.len(),
            referenced_assets: self.parents_of.len(),
            total_edges: self.children_of.values().map(HashSet::len).sum(),
        }
    }
}

/// Statistics about the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphStats {
    pub scanned_assets: usize,
    pub assets_with_references: usize,
    pub referenced_assets: usize,
    pub total_edges: usize,
}

impl fmt::Display for GraphStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} assets scanned ({} with references), {} referenced, {} edges",
            self.scanned_assets,
            self.assets_with_references,
            self.referenced_assets,
            self.total_edges
        )
    }
}
