//! User-facing operations on top of the diary store.
//!
//! Semantic search, summary statistics, photo import, and the text rendering
//! the CLI prints.

pub mod photo;
pub mod search;
pub mod show;
pub mod stats;

pub use photo::add_photo;
pub use search::{cosine_similarity, rank, similar_to, Match};
pub use stats::{summarize, DiaryStats};
