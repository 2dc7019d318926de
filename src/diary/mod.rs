//! Diary entries and the rules for merging new fragments into them.
//!
//! A diary holds at most one [`DiaryEntry`] per calendar day. Every text
//! message received on a day is merged into that day's entry; whether it gets
//! its own `-- HH:MM --` header depends on how long ago the previous fragment
//! was added (the merge window).
//!
//! This module is pure: persistence lives in [`table`] and the locked
//! read-modify-write cycle in [`store`].

pub mod store;
pub mod table;

pub use store::{DiaryStore, ReindexReport};

use crate::constants::FRAGMENT_HEADER_TIME_FORMAT;
use crate::errors::{AppError, AppResult};
use chrono::{Duration, NaiveDate, NaiveDateTime};

/// One calendar day's diary record.
#[derive(Debug, Clone, PartialEq)]
pub struct DiaryEntry {
    /// When the entry was created. Its calendar day is the entry's identity.
    pub date: NaiveDateTime,
    /// Fragments of the day, with `-- HH:MM --` headers.
    pub text: String,
    /// Photo filenames, relative to the image directory.
    pub images: Vec<String>,
    /// When the most recent text fragment was added, if any.
    pub last_fragment: Option<NaiveDateTime>,
    /// Embedding of `text`, if it has been computed.
    pub embedding: Option<Vec<f32>>,
}

impl DiaryEntry {
    /// Creates an entry from a first text fragment.
    pub fn from_text(fragment: &str, now: NaiveDateTime) -> Self {
        DiaryEntry {
            date: now,
            text: format_headed_fragment(fragment, now),
            images: Vec::new(),
            last_fragment: Some(now),
            embedding: None,
        }
    }

    /// Creates a photo-only entry with empty text.
    pub fn from_image(image_ref: &str, now: NaiveDateTime) -> Self {
        DiaryEntry {
            date: now,
            text: String::new(),
            images: vec![image_ref.to_string()],
            last_fragment: None,
            embedding: None,
        }
    }

    /// The calendar day this entry belongs to.
    pub fn day(&self) -> NaiveDate {
        self.date.date()
    }

    /// Merges a text fragment into this entry.
    ///
    /// If the previous fragment was added no longer than `merge_window` before
    /// `now`, the fragment is appended without a header. Otherwise a
    /// `-- HH:MM --` header is inserted first. The embedding is cleared because
    /// it no longer matches the text.
    pub fn merge_text(&mut self, fragment: &str, now: NaiveDateTime, merge_window: Duration) {
        let within_window = self
            .last_fragment
            .map(|last| now.signed_duration_since(last) <= merge_window)
            .unwrap_or(false);

        if self.text.is_empty() {
            self.text = format_headed_fragment(fragment, now);
        } else if within_window {
            self.text.push('\n');
            self.text.push_str(fragment);
            self.text.push('\n');
        } else {
            self.text.push('\n');
            self.text.push_str(&format_headed_fragment(fragment, now));
        }

        self.last_fragment = Some(now);
        self.embedding = None;
    }

    /// Adds an image reference. Returns `false` if it was already present.
    pub fn merge_image(&mut self, image_ref: &str) -> bool {
        if self.images.iter().any(|existing| existing == image_ref) {
            return false;
        }
        self.images.push(image_ref.to_string());
        true
    }

    /// Number of whitespace-separated words in the text.
    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}

fn format_headed_fragment(fragment: &str, at: NaiveDateTime) -> String {
    format!(
        "-- {} --\n{}\n",
        at.format(FRAGMENT_HEADER_TIME_FORMAT),
        fragment
    )
}

/// Trims a text fragment and rejects it if nothing is left.
pub fn normalize_fragment(text: &str) -> AppResult<&str> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(AppError::InvalidEntry(
            "Text fragment is empty".to_string(),
        ));
    }
    Ok(trimmed)
}

/// Checks that an image reference is a bare filename.
pub fn validate_image_ref(image_ref: &str) -> AppResult<()> {
    if image_ref.trim().is_empty() {
        return Err(AppError::InvalidEntry(
            "Image reference is empty".to_string(),
        ));
    }
    if image_ref.contains('/') || image_ref.contains('\\') || image_ref == "." || image_ref == ".." {
        return Err(AppError::InvalidEntry(format!(
            "Image reference must be a filename without a path: {}",
            image_ref
        )));
    }
    Ok(())
}
