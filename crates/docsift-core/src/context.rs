//! Context assembly for downstream prompts.
//!
//! Each search result becomes one block:
//!
//! ```text
//! [Source: guide.pdf, Page 3, Relevance: 0.87]
//! chunk text
//! ```
//!
//! The `Page` part is omitted for sources without pages. Blocks are joined
//! with [`CONTEXT_SEPARATOR`] and added greedily, best result first, while
//! the summed block lengths stay within the character budget. Separators are
//! not charged against the budget, so the joined string can exceed it by
//! `(blocks - 1) * 5` characters.

use crate::models::SearchResult;

/// Text placed between consecutive blocks.
pub const CONTEXT_SEPARATOR: &str = "\n---\n";

/// Render a single result as a context block.
pub fn format_block(result: &SearchResult) -> String {
    let chunk = &result.chunk;
    let page = match chunk.page {
        Some(page) => format!(", Page {}", page),
        None => String::new(),
    };
    format!(
        "[Source: {}{}, Relevance: {:.2}]\n{}\n",
        chunk.source, page, result.relevance_score, chunk.text
    )
}

/// Concatenate result blocks until adding the next would push the summed
/// block length past `max_length` characters.
///
/// Assembly stops at the first block that does not fit; later, smaller
/// blocks are not considered. Returns an empty string when `results` is
/// empty or the first block alone is over budget.
pub fn assemble_context(results: &[SearchResult], max_length: usize) -> String {
    let mut ordered: Vec<&SearchResult> = results.iter().collect();
    ordered.sort_by(|a, b| b.relevance_score.total_cmp(&a.relevance_score));

    let mut blocks: Vec<String> = Vec::new();
    let mut used = 0usize;

    for result in ordered {
        let block = format_block(result);
        let cost = block.chars().count();
        if used + cost > max_length {
            break;
        }
        used += cost;
        blocks.push(block);
    }

    blocks.join(CONTEXT_SEPARATOR)
}
