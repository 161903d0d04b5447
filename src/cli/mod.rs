//! CLI module for assetgraph.
//!
//! Commands:
//! - scan: full scan, print stats
//! - refs: direct parents and children of an asset
//! - chains: dependency chains up to assets of a given type
//! - stats: graph statistics

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "assetgraph")]
#[command(about = "Asset reference graph for large content repositories")]
pub struct Cli {
    /// Project root directory (default: current directory)
    #[arg(short, long, default_value = ".")]
    pub root: PathBuf,

    /// Worker threads for scanning (default: from config, else one per core)
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Emit JSON instead of plain text
    #[arg(long)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scan the whole project and report what was found
    Scan,

    /// Show what references an asset and what it references
    Refs {
        /// Asset GUID (32 hex digits) or project-relative path
        asset: String,
    },

    /// Find dependency chains from an asset up to assets of a given type
    Chains {
        /// Asset GUID (32 hex digits) or project-relative path
        asset: String,

        /// Extension of the assets to stop at (e.g. "unity" for scenes)
        #[arg(short, long, default_value = "unity")]
        ext: String,
    },

    /// Show graph statistics
    Stats,
}
