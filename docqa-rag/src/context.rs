//! Bounded context assembly from ranked search results.

use serde::Serialize;
use tracing::debug;

use crate::document::SearchResult;

/// Placed between chunk texts in the assembled context.
pub const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

/// Lower bound on the share of the budget any single chunk may use.
const MIN_PER_CHUNK_CHARS: usize = 300;

/// The context handed to the prompt builder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AssembledContext {
    /// Accepted chunk texts joined by [`CONTEXT_SEPARATOR`].
    pub context: String,
    /// Source document names of the accepted chunks, first-seen order.
    pub sources: Vec<String>,
    /// Whether the global budget shortened or dropped any chunk.
    pub truncated: bool,
}

/// Concatenate ranked chunk texts into a context of at most `max_chars`
/// characters.
///
/// Each chunk is trimmed and limited to an even share of the budget (never
/// less than 300 characters). Chunks are taken in rank order until the
/// budget runs out; the last accepted chunk may be cut short to fill it
/// exactly. Separators count against the budget.
pub fn assemble(ranked: &[SearchResult], max_chars: usize) -> AssembledContext {
    let per_chunk = MIN_PER_CHUNK_CHARS.max(max_chars / ranked.len().max(1));
    let separator_len = CONTEXT_SEPARATOR.chars().count();

    let mut parts: Vec<String> = Vec::new();
    let mut sources: Vec<String> = Vec::new();
    let mut used = 0usize;
    let mut truncated = false;

    for (rank, result) in ranked.iter().enumerate() {
        let text = take_chars(result.chunk.text.trim(), per_chunk);
        if text.is_empty() {
            continue;
        }

        let overhead = if parts.is_empty() { 0 } else { separator_len };
        let remaining = max_chars.saturating_sub(used + overhead);
        if remaining == 0 {
            debug!(rank, max_chars, "context budget exhausted");
            truncated = true;
            break;
        }

        let len = text.chars().count();
        let text = if len > remaining {
            truncated = true;
            debug!(rank, len, remaining, "chunk shortened to fit context budget");
            take_chars(text, remaining)
        } else {
            text
        };

        used += overhead + text.chars().count();
        parts.push(text.to_string());

        let source = result.chunk.source_name();
        if !sources.iter().any(|s| s == source) {
            sources.push(source.to_string());
        }
    }

    AssembledContext { context: parts.join(CONTEXT_SEPARATOR), sources, truncated }
}

/// The first `n` characters of `text`.
fn take_chars(text: &str, n: usize) -> &str {
    match text.char_indices().nth(n) {
        Some((byte, _)) => &text[..byte],
        None => text,
    }
}
