//! # assetgraph
//!
//! Incremental "which asset references which" graph for large content
//! repositories.
//!
//! Assets are named by 32-character hex GUIDs read from companion `.meta`
//! files. References are found by a hand-rolled byte scanner looking for
//! `{fileID: <n>, guid: <hex>, type: <n>}` tokens, in parallel across a
//! bounded worker pool. After the first full scan the graph is only ever
//! patched: each changeset replaces the forward edges of the identifiers it
//! touches and leaves everything else alone.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use assetgraph::{build_graph, has_extension, ChangeSet, Guid, ScanConfig, ScanProgress};
//! use std::path::Path;
//!
//! let root = Path::new(".");
//! let config = ScanConfig::load_for_project(root);
//! let (mut graph, mut scanner) = build_graph(root, &config)?;
//!
//! // Later, apply what the file watcher saw.
//! let changes = ChangeSet::new().added("Assets/Hero.prefab");
//! graph.apply_changeset(&mut scanner, &changes, config.worker_count(), &ScanProgress::new())?;
//!
//! // Which scenes pull in this material?
//! let material = Guid::parse("0123456789abcdef0123456789abcdef")?;
//! for chain in graph.find_chains(&material, has_extension("unity")) {
//!     println!("{}", chain);
//! }
//! # Ok::<(), assetgraph::AssetGraphError>(())
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod graph;
pub mod parser;
pub mod source;

// Re-exports for convenience
pub use config::ScanConfig;
pub use error::{AssetGraphError, Result};

// Graph re-exports
pub use graph::{
    build_graph, find_chains, has_extension, ApplyMode, ApplyReport, Chain, ChangeSet,
    ForwardEdges, GraphStats, Guid, ParallelScanner, PathIndex, PathResolver, ReferenceGraph,
    ScanProgress,
};
pub use parser::{
    extract_references, AssetKind, ByteScanner, ExtractError, ReferenceExtractor, SubExtractor,
};
pub use source::{FsAssetSource, MetadataReader, RawBytesReader};
