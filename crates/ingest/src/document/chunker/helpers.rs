//! Recursive splitting and overlap merging.

use std::collections::VecDeque;

use tracing::debug;

use super::types::{ChunkConfig, DEFAULT_SEPARATORS};

/// Character length, the unit every size in [`ChunkConfig`] is measured in.
pub(crate) fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Split text into overlapping chunks of at most `chunk_size` characters.
///
/// Pieces that still exceed the limit after the final (per-character)
/// separator cannot occur, so every returned chunk fits.
pub fn split_text_into_chunks(text: &str, config: &ChunkConfig) -> Vec<String> {
    split_recursive(text, DEFAULT_SEPARATORS, config)
}

fn split_recursive(text: &str, separators: &[&str], config: &ChunkConfig) -> Vec<String> {
    // First separator that occurs in the text; "" always matches.
    let position = separators
        .iter()
        .position(|s| s.is_empty() || text.contains(s))
        .unwrap_or(separators.len().saturating_sub(1));
    let separator = separators.get(position).copied().unwrap_or("");
    let finer = separators.get(position + 1..).unwrap_or(&[]);

    let mut chunks = Vec::new();
    let mut good: Vec<&str> = Vec::new();

    for piece in split_keeping_separator(text, separator) {
        if char_len(piece) < config.chunk_size {
            good.push(piece);
            continue;
        }
        if !good.is_empty() {
            chunks.extend(merge_splits(&good, config));
            good.clear();
        }
        if finer.is_empty() {
            chunks.push(piece.to_string());
        } else {
            chunks.extend(split_recursive(piece, finer, config));
        }
    }

    if !good.is_empty() {
        chunks.extend(merge_splits(&good, config));
    }
    chunks
}

/// Split on `separator`, leaving the separator at the start of the piece
/// that follows it. Empty pieces are dropped. An empty separator splits
/// into characters.
pub(crate) fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    if separator.is_empty() {
        return text
            .char_indices()
            .map(|(i, c)| &text[i..i + c.len_utf8()])
            .collect();
    }

    let mut pieces = Vec::new();
    let mut start = 0;
    for (pos, _) in text.match_indices(separator) {
        pieces.push(&text[start..pos]);
        start = pos;
    }
    pieces.push(&text[start..]);
    pieces.retain(|p| !p.is_empty());
    pieces
}

/// Greedily pack pieces into chunks, carrying up to `chunk_overlap`
/// characters from the tail of each chunk into the next.
pub(crate) fn merge_splits(splits: &[&str], config: &ChunkConfig) -> Vec<String> {
    let mut docs = Vec::new();
    let mut current: VecDeque<&str> = VecDeque::new();
    let mut total = 0usize;

    for &piece in splits {
        let len = char_len(piece);
        if total + len > config.chunk_size && !current.is_empty() {
            if total > config.chunk_size {
                debug!("created a chunk of {total} chars, longer than {}", config.chunk_size);
            }
            push_joined(&mut docs, &current);
            while total > config.chunk_overlap || (total + len > config.chunk_size && total > 0) {
                match current.pop_front() {
                    Some(front) => total -= char_len(front),
                    None => break,
                }
            }
        }
        current.push_back(piece);
        total += len;
    }

    push_joined(&mut docs, &current);
    docs
}

fn push_joined(docs: &mut Vec<String>, pieces: &VecDeque<&str>) {
    let joined: String = pieces.iter().copied().collect();
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        docs.push(trimmed.to_string());
    }
}
