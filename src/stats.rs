//! Corpus statistics.
//!
//! Provides a quick summary of what's indexed: chunk counts, the embedding
//! model, snapshot health, and a per-document breakdown. Used by
//! `docsift stats` to confirm that ingests are landing and persisting.

use anyhow::Result;
use std::path::Path;

use crate::config::Config;
use crate::retriever::{Retriever, RetrieverStats};

/// Run the stats command: load the snapshot and print a summary.
pub async fn run_stats(config: &Config) -> Result<()> {
    let retriever = Retriever::open(config).await?;
    let stats = retriever.stats();

    print!(
        "{}",
        render_stats(
            &stats,
            &config.snapshot.index_path,
            &config.snapshot.store_path
        )
    );
    Ok(())
}

fn render_stats(stats: &RetrieverStats, index_path: &Path, store_path: &Path) -> String {
    let mut out = String::new();
    out.push_str("docsift corpus stats\n");
    out.push_str("====================\n\n");
    out.push_str(&format!(
        "  Index:       {} ({})\n",
        index_path.display(),
        file_size(index_path)
    ));
    out.push_str(&format!(
        "  Records:     {} ({})\n",
        store_path.display(),
        file_size(store_path)
    ));
    out.push_str(&format!("  Snapshot:    {}\n\n", stats.load_outcome));
    out.push_str(&format!("  Model:       {}\n", stats.model));
    out.push_str(&format!("  Dimensions:  {}\n", stats.dims));
    out.push_str(&format!("  Chunks:      {}\n", stats.rows));
    out.push_str(&format!("  Documents:   {}\n", stats.sources.len()));

    if !stats.sources.is_empty() {
        out.push_str("\n  By document:\n");
        out.push_str(&format!("  {:<40} {:>8}\n", "SOURCE", "CHUNKS"));
        out.push_str(&format!("  {}\n", "-".repeat(49)));
        for (source, count) in &stats.sources {
            out.push_str(&format!("  {:<40} {:>8}\n", source, count));
        }
    }
    out.push('\n');
    out
}

fn file_size(path: &Path) -> String {
    match std::fs::metadata(path) {
        Ok(meta) => format_bytes(meta.len()),
        Err(_) => "missing".to_string(),
    }
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}
