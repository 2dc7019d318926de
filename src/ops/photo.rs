//! Adding photos to the diary.

use crate::diary::{DiaryEntry, DiaryStore};
use crate::errors::AppResult;
use chrono::NaiveDateTime;
use std::path::Path;
use tracing::{info, warn};

/// Copies `source` into the image directory and attaches it to the entry for
/// `now`'s day.
///
/// If the table update fails, the copied file is removed again so no
/// unreferenced image is left behind.
///
/// # Errors
///
/// Returns `AppError::Io` if the photo cannot be copied, or any error from
/// [`DiaryStore::append_image`].
pub fn add_photo(store: &DiaryStore, source: &Path, now: NaiveDateTime) -> AppResult<DiaryEntry> {
    let image_ref = store.import_image(source)?;

    match store.append_image(&image_ref, now) {
        Ok(entry) => {
            info!("Attached photo {} to {}", image_ref, entry.day());
            Ok(entry)
        }
        Err(e) => {
            warn!("Discarding photo {} after failed update", image_ref);
            store.discard_image(&image_ref);
            Err(e)
        }
    }
}
