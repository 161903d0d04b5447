//! Graph builder — scans changed assets in parallel and produces new edges.
//!
//! Added files are split into one partition per worker. Each worker owns its
//! scratch buffers and a local result list, and takes the shared lock exactly
//! once, when its partition is done. Deletions and renames are O(1) per entry
//! and run on the calling thread afterwards.

use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, warn};

use super::engine::{ApplyReport, ReferenceGraph};
use super::types::{ChangeSet, ForwardEdges, Guid, PathIndex};
use crate::config::ScanConfig;
use crate::error::Result;
use crate::parser::{ExtractError, FileReferences, ReferenceExtractor, ScanScratch};
use crate::source::FsAssetSource;

/// Shared scan progress cursor.
///
/// Updated under a lock after every changeset entry so no increment is lost.
/// Readers may poll it from any thread.
#[derive(Debug, Default)]
pub struct ScanProgress {
    state: Mutex<ProgressState>,
}

#[derive(Debug, Default, Clone, Copy)]
struct ProgressState {
    completed: usize,
    total: usize,
}

impl ScanProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn begin(&self, total: usize) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        *state = ProgressState {
            completed: 0,
            total,
        };
    }

    pub(crate) fn advance(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.completed += 1;
    }

    /// Completed entries of the current batch.
    pub fn completed(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .completed
    }

    /// Fraction of the current batch done, in `0.0..=1.0`. An empty batch is done.
    pub fn fraction(&self) -> f32 {
        let state = *self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.total == 0 {
            1.0
        } else {
            (state.completed as f32 / state.total as f32).min(1.0)
        }
    }
}

/// Result of scanning one changeset, ready to patch into the graph.
#[derive(Debug, Default)]
pub struct ScanBatch {
    /// Complete new forward-edge state for every identifier touched.
    pub edges: ForwardEdges,
    pub scanned: usize,
    pub failed: usize,
    pub excluded: usize,
    pub deleted: usize,
    pub moved: usize,
}

/// Destination shared by workers; merged into once per partition.
#[derive(Default)]
struct Merged {
    edges: ForwardEdges,
    files: Vec<(PathBuf, Guid)>,
    failed: usize,
    excluded: usize,
}

/// Per-worker result list.
#[derive(Default)]
struct Partition {
    files: Vec<FileReferences>,
    failed: usize,
    excluded: usize,
}

/// Applies a [`ReferenceExtractor`] to changesets with a bounded worker pool.
pub struct ParallelScanner {
    extractor: ReferenceExtractor,
}

impl ParallelScanner {
    pub fn new(extractor: ReferenceExtractor) -> Self {
        Self { extractor }
    }

    /// Filesystem scanner for the project at `root`.
    pub fn from_config(root: &Path, config: &ScanConfig) -> Self {
        let source = Arc::new(FsAssetSource::from_config(root, config));
        let extractor = ReferenceExtractor::from_source(source)
            .with_reserved_prefixes(config.reserved_prefixes.iter().map(PathBuf::from));
        Self::new(extractor)
    }

    pub fn extractor(&self) -> &ReferenceExtractor {
        &self.extractor
    }

    pub fn extractor_mut(&mut self) -> &mut ReferenceExtractor {
        &mut self.extractor
    }

    /// Scan `changes` and update `paths` in place.
    ///
    /// Blocks until every worker partition has been merged. Per-file failures
    /// are logged and counted, never returned. A panic that escapes per-file
    /// isolation propagates to the caller.
    pub fn scan(
        &mut self,
        changes: &ChangeSet,
        workers: usize,
        progress: &ScanProgress,
        paths: &mut PathIndex,
    ) -> Result<ScanBatch> {
        let mut changes = changes.clone();
        changes.retain_scannable();
        progress.begin(changes.len());

        self.extractor.init_before_batch();
        let merged = self.scan_added(&changes.added, workers, progress)?;

        let mut batch = ScanBatch {
            edges: merged.edges,
            scanned: merged.files.len(),
            failed: merged.failed,
            excluded: merged.excluded,
            ..ScanBatch::default()
        };

        let mut files = merged.files;
        files.sort();
        for (path, guid) in files {
            if let Some(previous) = paths.insert(path, guid.clone()) {
                if previous != guid {
                    // Metadata was regenerated: the old identifier is gone.
                    batch.edges.entry(previous).or_default();
                }
            }
        }

        for path in &changes.deleted {
            if let Some(guid) = paths.remove_path(path) {
                batch.edges.entry(guid).or_default();
                batch.deleted += 1;
            }
            progress.advance();
        }

        for (from, to) in &changes.moved {
            if paths.rename(from, to.clone()).is_some() {
                batch.moved += 1;
            }
            progress.advance();
        }

        Ok(batch)
    }

    fn scan_added(
        &self,
        added: &[PathBuf],
        workers: usize,
        progress: &ScanProgress,
    ) -> Result<Merged> {
        if added.is_empty() {
            return Ok(Merged::default());
        }

        let workers = workers.clamp(1, added.len());
        let chunk_size = added.len().div_ceil(workers);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("assetgraph-scan-{}", i))
            .build()?;

        let merged = Mutex::new(Merged::default());
        let extractor = &self.extractor;

        pool.install(|| {
            added.par_chunks(chunk_size).for_each(|part| {
                let mut scratch = ScanScratch::new();
                let mut local = Partition::default();

                for path in part {
                    match extractor.extract_isolated(path, &mut scratch) {
                        Ok(file) => local.files.push(file),
                        Err(e) => record_failure(&mut local, &e),
                    }
                    progress.advance();
                }

                debug!(
                    files = part.len(),
                    ok = local.files.len(),
                    "merging scan partition"
                );
                let mut shared = merged.lock().unwrap_or_else(PoisonError::into_inner);
                shared.failed += local.failed;
                shared.excluded += local.excluded;
                for file in local.files {
                    shared
                        .edges
                        .entry(file.guid.clone())
                        .or_default()
                        .extend(file.references);
                    shared.files.push((file.path, file.guid));
                }
            });
        });

        Ok(merged.into_inner().unwrap_or_else(PoisonError::into_inner))
    }
}

fn record_failure(local: &mut Partition, error: &ExtractError) {
    if error.is_exclusion() {
        debug!(error = %error, "skipping excluded asset");
        local.excluded += 1;
    } else {
        warn!(error = %error, "failed to extract references");
        local.failed += 1;
    }
}

/// Full scan of the project at `root`: discover every asset and build the graph.
///
/// Returns the scanner too, so later changesets can be applied incrementally.
pub fn build_graph(
    root: &Path,
    config: &ScanConfig,
) -> Result<(ReferenceGraph, ParallelScanner)> {
    let changes = ChangeSet::full_scan(root, config)?;
    let mut scanner = ParallelScanner::from_config(root, config);
    let mut graph = ReferenceGraph::new();
    let report: ApplyReport = graph.apply_changeset(
        &mut scanner,
        &changes,
        config.worker_count(),
        &ScanProgress::new(),
    )?;
    info!(
        root = %root.display(),
        scanned = report.scanned,
        failed = report.failed,
        "full scan complete"
    );
    Ok((graph, scanner))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::testing::MemorySource;

    const A: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
    const B: &str = "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";
    const C: &str = "cccccccccccccccccccccccccccccccc";

    fn reference(guid: &str) -> String {
        format!("  m_Ref: {{fileID: 11400000, guid: {}, type: 2}}\n", guid)
    }

    fn scanner(source: &Arc<MemorySource>) -> ParallelScanner {
        ParallelScanner::new(
            ReferenceExtractor::from_source(source.clone())
                .with_reserved_prefixes(["ProjectSettings"]),
        )
    }

    #[test]
    fn test_progress_cursor() {
        let progress = ScanProgress::new();
        assert_eq!(progress.fraction(), 1.0);
        progress.begin(4);
        assert_eq!(progress.fraction(), 0.0);
        progress.advance();
        assert_eq!(progress.fraction(), 0.25);
        assert_eq!(progress.completed(), 1);
    }

    #[test]
    fn test_scan_added_files() {
        let source = Arc::new(MemorySource::new());
        source.put("Assets/a.prefab", A, &(reference(B) + &reference(C)));
        source.put("Assets/b.prefab", B, "");
        source.put("Assets/readme.txt", C, &reference(A));

        let changes = ChangeSet::new()
            .added("Assets/a.prefab")
            .added("Assets/b.prefab")
            .added("Assets/readme.txt");
        let progress = ScanProgress::new();
        let mut paths = PathIndex::new();

        let batch = scanner(&source)
            .scan(&changes, 2, &progress, &mut paths)
            .unwrap();

        assert_eq!(batch.scanned, 2);
        assert_eq!(batch.edges.len(), 2);
        assert_eq!(batch.edges[A].len(), 2);
        assert!(batch.edges[B].is_empty(), "scanned-but-empty must be kept");
        assert_eq!(paths.guid_of(Path::new("Assets/b.prefab")), Some(&Guid::from(B)));
        assert_eq!(progress.completed(), 2);
        assert_eq!(progress.fraction(), 1.0);
    }

    #[test]
    fn test_failures_are_counted_not_fatal() {
        let source = Arc::new(MemorySource::new());
        source.put("Assets/ok.prefab", A, &reference(B));
        source.put_without_meta("Assets/orphan.prefab", &reference(C));
        source.put("ProjectSettings/Tags.asset", C, &reference(A));

        let changes = ChangeSet::new()
            .added("Assets/ok.prefab")
            .added("Assets/orphan.prefab")
            .added("ProjectSettings/Tags.asset")
            .added("Assets/missing.prefab");
        let mut paths = PathIndex::new();

        let batch = scanner(&source)
            .scan(&changes, 3, &ScanProgress::new(), &mut paths)
            .unwrap();

        assert_eq!(batch.scanned, 1);
        assert_eq!(batch.failed, 2);
        assert_eq!(batch.excluded, 1);
        assert_eq!(batch.edges.keys().collect::<Vec<_>>(), vec![&Guid::from(A)]);
    }

    #[test]
    fn test_deletions_and_moves() {
        let source = Arc::new(MemorySource::new());
        let mut paths = PathIndex::new();
        paths.insert(PathBuf::from("Assets/a.prefab"), Guid::from(A));
        paths.insert(PathBuf::from("Assets/b.prefab"), Guid::from(B));

        let changes = ChangeSet::new()
            .deleted("Assets/a.prefab")
            .deleted("Assets/unknown.prefab")
            .moved("Assets/b.prefab", "Assets/Moved/b.prefab")
            .moved("Assets/ghost.prefab", "Assets/ghost2.prefab");
        let progress = ScanProgress::new();

        let batch = scanner(&source)
            .scan(&changes, 4, &progress, &mut paths)
            .unwrap();

        assert_eq!(batch.deleted, 1);
        assert_eq!(batch.moved, 1);
        assert!(batch.edges[A].is_empty());
        assert!(!batch.edges.contains_key(B));
        assert_eq!(paths.guid_of(Path::new("Assets/a.prefab")), None);
        assert_eq!(paths.path_of(B), Some(Path::new("Assets/Moved/b.prefab")));
        assert_eq!(progress.completed(), 4);
    }

    #[test]
    fn test_delete_does_not_clobber_rescan_of_same_guid() {
        // A move reported as delete + add.
        let source = Arc::new(MemorySource::new());
        source.put("Assets/new.prefab", A, &reference(B));
        let mut paths = PathIndex::new();
        paths.insert(PathBuf::from("Assets/old.prefab"), Guid::from(A));

        let changes = ChangeSet::new()
            .added("Assets/new.prefab")
            .deleted("Assets/old.prefab");
        let batch = scanner(&source)
            .scan(&changes, 1, &ScanProgress::new(), &mut paths)
            .unwrap();

        assert_eq!(batch.edges[A].len(), 1);
        assert_eq!(paths.path_of(A), Some(Path::new("Assets/new.prefab")));
    }

    #[test]
    fn test_regenerated_guid_empties_old_identifier() {
        let source = Arc::new(MemorySource::new());
        source.put("Assets/a.prefab", B, &reference(C));
        let mut paths = PathIndex::new();
        paths.insert(PathBuf::from("Assets/a.prefab"), Guid::from(A));

        let batch = scanner(&source)
            .scan(
                &ChangeSet::new().added("Assets/a.prefab"),
                1,
                &ScanProgress::new(),
                &mut paths,
            )
            .unwrap();

        assert!(batch.edges[A].is_empty());
        assert_eq!(batch.edges[B].len(), 1);
        assert_eq!(paths.path_of(A), None);
    }

    #[test]
    fn test_more_workers_than_files() {
        let source = Arc::new(MemorySource::new());
        source.put("Assets/a.prefab", A, &reference(B));

        let batch = scanner(&source)
            .scan(
                &ChangeSet::new().added("Assets/a.prefab"),
                64,
                &ScanProgress::new(),
                &mut PathIndex::new(),
            )
            .unwrap();
        assert_eq!(batch.scanned, 1);
    }

    #[test]
    fn test_build_graph_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        let assets = dir.path().join("Assets");
        std::fs::create_dir_all(&assets).unwrap();
        std::fs::write(assets.join("Main.unity"), reference(B)).unwrap();
        std::fs::write(assets.join("Main.unity.meta"), format!("guid: {}\n", A)).unwrap();
        std::fs::write(assets.join("Hero.prefab"), "").unwrap();
        std::fs::write(assets.join("Hero.prefab.meta"), format!("guid: {}\n", B)).unwrap();

        let config = ScanConfig {
            workers: 2,
            ..ScanConfig::default()
        };
        let (graph, _scanner) = build_graph(dir.path(), &config).unwrap();

        assert_eq!(graph.stats().scanned_assets, 2);
        assert!(graph.parents(B).is_some_and(|p| p.contains(A)));
        assert_eq!(graph.path_of(A), Some(Path::new("Assets/Main.unity")));
    }
}
