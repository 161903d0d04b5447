//! Asset reference graph — the structural backbone of assetgraph.
//!
//! Provides the data model, the incrementally patched graph engine, the
//! parallel changeset scanner and dependency-chain queries.

pub mod builder;
pub mod chains;
pub mod engine;
pub mod types;

pub use builder::{build_graph, ParallelScanner, ScanBatch, ScanProgress};
pub use chains::{find_chains, has_extension, PathResolver};
pub use engine::{ApplyMode, ApplyReport, GraphStats, ReferenceGraph};
pub use types::{Chain, ChangeSet, ForwardEdges, Guid, PathIndex, GUID_LEN};
