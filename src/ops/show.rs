//! Plain-text rendering of entries and lookup results for the terminal.

use crate::diary::{DiaryEntry, DiaryStore};
use crate::ops::search::Match;
use crate::resolve::{entry_label, Memory, NeighborLabels, Resolution};
use std::fmt::Write;

fn push_images(out: &mut String, entry: &DiaryEntry, store: &DiaryStore) {
    if entry.images.is_empty() {
        return;
    }
    out.push_str("\n\nPhotos:");
    for image in &entry.images {
        let _ = write!(out, "\n  {}", store.image_path(image).display());
    }
}

fn push_neighbors(out: &mut String, neighbors: &NeighborLabels) {
    let _ = write!(
        out,
        "Before: {}\nAfter: {}",
        neighbors.past, neighbors.future
    );
}

/// Renders one entry: an intro line naming its day, the text and any photos.
pub fn render_entry(intro: &str, entry: &DiaryEntry, store: &DiaryStore) -> String {
    let mut out = format!("{} {}:\n\n{}", intro, entry.day(), entry.text.trim_end());
    push_images(&mut out, entry, store);
    out
}

/// Renders an "on this day" reminder with its chosen photo, if any.
pub fn render_memory(memory: &Memory<'_>, store: &DiaryStore) -> String {
    let entry = memory.entry;
    let mut out = format!(
        "Here is what you wrote in {}:\n\n{}",
        entry.day(),
        entry.text.trim_end()
    );
    if let Some(photo) = memory.photo {
        let _ = write!(out, "\n\nPhoto:\n  {}", store.image_path(photo).display());
    }
    out
}

/// Renders the result of a date lookup.
///
/// A found entry is followed by the days before and after it. A missing date
/// lists the closest entries instead.
pub fn render_resolution(resolution: &Resolution<'_>, store: &DiaryStore) -> String {
    match resolution {
        Resolution::Exact { entry, neighbors } => {
            let mut out = render_entry("Here is what you wrote in", entry, store);
            out.push_str("\n\n");
            push_neighbors(&mut out, neighbors);
            out
        }
        Resolution::Missing { date, neighbors } => {
            let mut out = format!(
                "No entry for {}.\nHere are the closest entries:\n",
                date
            );
            push_neighbors(&mut out, neighbors);
            out
        }
    }
}

/// Renders search results, best first, with their similarity scores.
pub fn render_matches(matches: &[Match<'_>], store: &DiaryStore) -> String {
    if matches.is_empty() {
        return "No matching entries.".to_string();
    }

    let mut out = String::new();
    for (rank, m) in matches.iter().enumerate() {
        if rank > 0 {
            out.push_str("\n\n");
        }
        let _ = write!(
            out,
            "{}. {} (score {:.3})\n\n{}",
            rank + 1,
            entry_label(m.entry),
            m.score,
            m.entry.text.trim_end()
        );
        push_images(&mut out, m.entry, store);
    }
    out
}
