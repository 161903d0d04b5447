//! assetgraph CLI - asset reference queries from the command line.
//!
//! Usage:
//!   assetgraph scan                      # Full scan + summary
//!   assetgraph refs <guid|path>          # Direct parents / children
//!   assetgraph chains <guid|path> -e unity
//!   assetgraph stats                     # Graph statistics
//!
//! The graph is not persisted; every invocation starts with a full scan.

use anyhow::{anyhow, Context, Result};
use assetgraph::cli::{Cli, Commands};
use assetgraph::{
    has_extension, ChangeSet, Guid, ParallelScanner, ReferenceGraph, ScanConfig, ScanProgress,
};
use clap::Parser;
use serde_json::json;
use std::path::Path;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let root = cli.root.canonicalize().unwrap_or(cli.root);
    let mut config = ScanConfig::load_for_project(&root);
    if let Some(workers) = cli.workers {
        config.workers = workers;
    }

    let start = Instant::now();
    let graph = scan_project(&root, &config)?;
    let elapsed = start.elapsed();

    match cli.command {
        Commands::Scan | Commands::Stats => {
            let stats = graph.stats();
            if cli.json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&json!({
                        "stats": stats,
                        "elapsed_ms": elapsed.as_millis() as u64,
                    }))?
                );
            } else {
                println!("{}", stats);
                println!("Scanned in {}ms", elapsed.as_millis());
            }
        }

        Commands::Refs { asset } => {
            let guid = resolve_asset(&graph, &asset)?;
            let mut parents: Vec<&Guid> =
                graph.parents(guid.as_str()).into_iter().flatten().collect();
            let mut children: Vec<&Guid> =
                graph.children(guid.as_str()).into_iter().flatten().collect();
            parents.sort();
            children.sort();

            if cli.json {
                let describe =
                    |g: &Guid| json!({ "guid": g, "path": graph.path_of(g.as_str()) });
                println!(
                    "{}",
                    serde_json::to_string_pretty(&json!({
                        "guid": guid,
                        "path": graph.path_of(guid.as_str()),
                        "referenced_by": parents.iter().map(|g| describe(*g)).collect::<Vec<_>>(),
                        "references": children.iter().map(|g| describe(*g)).collect::<Vec<_>>(),
                    }))?
                );
            } else {
                println!("{} {}", guid, display_path(&graph, &guid));
                println!("\nReferenced by ({}):", parents.len());
                for g in &parents {
                    println!("  {} {}", g, display_path(&graph, g));
                }
                println!("\nReferences ({}):", children.len());
                for g in &children {
                    println!("  {} {}", g, display_path(&graph, g));
                }
            }
        }

        Commands::Chains { asset, ext } => {
            let guid = resolve_asset(&graph, &asset)?;
            let ext = ext.trim_start_matches('.');
            let chains = graph.find_chains(&guid, has_extension(ext));

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&chains)?);
            } else if chains.is_empty() {
                println!("No .{} asset depends on {}", ext, asset);
            } else {
                for chain in &chains {
                    let steps: Vec<String> = chain
                        .iter()
                        .map(|g| display_path(&graph, g))
                        .collect();
                    println!("{}", steps.join(" -> "));
                }
                println!("\n{} chain(s)", chains.len());
            }
        }
    }

    Ok(())
}

/// Full scan with a progress line on stderr while workers run.
fn scan_project(root: &Path, config: &ScanConfig) -> Result<ReferenceGraph> {
    let changes = ChangeSet::full_scan(root, config)
        .with_context(|| format!("failed to walk {}", root.display()))?;
    let mut scanner = ParallelScanner::from_config(root, config);
    let progress = Arc::new(ScanProgress::new());
    let workers = config.worker_count();

    let (done_tx, done_rx) = mpsc::channel::<()>();
    let reporter = {
        let progress = Arc::clone(&progress);
        thread::spawn(move || loop {
            eprint!("\rScanning... {:>3.0}%", progress.fraction() * 100.0);
            match done_rx.recv_timeout(Duration::from_millis(100)) {
                Err(RecvTimeoutError::Timeout) => continue,
                _ => {
                    eprintln!();
                    break;
                }
            }
        })
    };

    let mut graph = ReferenceGraph::new();
    let result = graph.apply_changeset(&mut scanner, &changes, workers, &progress);
    drop(done_tx);
    let _ = reporter.join();
    result?;

    Ok(graph)
}

/// Accept either a GUID or a project-relative path.
fn resolve_asset(graph: &ReferenceGraph, asset: &str) -> Result<Guid> {
    if let Ok(guid) = Guid::parse(asset) {
        return Ok(guid);
    }
    graph
        .guid_of(Path::new(asset))
        .cloned()
        .ok_or_else(|| anyhow!("'{}' is neither a GUID nor a scanned asset path", asset))
}

fn display_path(graph: &ReferenceGraph, guid: &Guid) -> String {
    graph
        .path_of(guid.as_str())
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| format!("<{}>", guid))
}
