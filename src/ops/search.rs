//! Semantic search over diary entries.
//!
//! Entries are ranked by cosine similarity between their cached embedding and
//! a query embedding. Entries without an embedding (photo-only days, or text
//! saved while the provider was down) do not take part.

use crate::ai::EmbeddingProvider;
use crate::diary::DiaryEntry;
use crate::errors::{AppResult, EmbeddingError};
use std::cmp::Ordering;
use tracing::{debug, info};

/// An entry together with its similarity to the query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Match<'a> {
    pub entry: &'a DiaryEntry,
    /// Cosine similarity in [-1.0, 1.0], higher is closer.
    pub score: f32,
}

/// Cosine similarity of two vectors.
///
/// Returns 0.0 if either vector has zero length or norm, or if the lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Scores every embedded entry against `query` and keeps the best `top_n`.
///
/// `skip` excludes one entry by identity. The sort is stable, so equal scores
/// keep table order.
fn rank_by_vector<'a>(
    query: &[f32],
    entries: &'a [DiaryEntry],
    top_n: usize,
    skip: Option<&DiaryEntry>,
) -> Vec<Match<'a>> {
    let mut matches: Vec<Match<'a>> = entries
        .iter()
        .filter(|entry| skip.map_or(true, |skipped| entry.day() != skipped.day()))
        .filter_map(|entry| {
            let embedding = entry.embedding.as_deref()?;
            if embedding.len() != query.len() {
                debug!(
                    "Skipping entry {} with {} dimensions (query has {})",
                    entry.day(),
                    embedding.len(),
                    query.len()
                );
                return None;
            }
            Some(Match {
                entry,
                score: cosine_similarity(query, embedding),
            })
        })
        .collect();

    // NaN scores sort last
    matches.sort_by(|a, b| match (a.score.is_nan(), b.score.is_nan()) {
        (false, false) => b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal),
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (true, true) => Ordering::Equal,
    });
    matches.truncate(top_n);
    matches
}

/// Ranks entries by similarity to free text.
///
/// # Errors
///
/// Returns the provider's `EmbeddingError` if the query cannot be embedded.
/// Nothing is written to the diary.
pub fn rank<'a>(
    provider: &dyn EmbeddingProvider,
    query_text: &str,
    entries: &'a [DiaryEntry],
    top_n: usize,
) -> AppResult<Vec<Match<'a>>> {
    info!("Searching for: {}", query_text);

    let query = provider.embed(query_text)?;
    let matches = rank_by_vector(&query, entries, top_n, None);

    info!("Returning {} search results", matches.len());
    Ok(matches)
}

/// Ranks entries by similarity to an existing entry, excluding that entry.
///
/// # Errors
///
/// Returns `EmbeddingError::MissingEmbedding` if `entry` has no embedding.
pub fn similar_to<'a>(
    entry: &DiaryEntry,
    entries: &'a [DiaryEntry],
    top_n: usize,
) -> AppResult<Vec<Match<'a>>> {
    let query = entry
        .embedding
        .as_deref()
        .ok_or_else(|| EmbeddingError::MissingEmbedding(entry.day().to_string()))?;

    Ok(rank_by_vector(query, entries, top_n, Some(entry)))
}
