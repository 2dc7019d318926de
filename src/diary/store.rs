//! The diary store: sole owner of the persisted entry table.
//!
//! Every mutation is a full read-modify-write of the table. Mutations are
//! serialized twice: an in-process mutex for concurrent callers sharing one
//! store, and an exclusive `fs2` lock on `diary.lock` for other processes.

use crate::ai::EmbeddingProvider;
use crate::config::Config;
use crate::constants::{IMAGE_EXTENSION, LOCK_RETRY_INTERVAL_MS};
use crate::diary::{normalize_fragment, table, validate_image_ref, DiaryEntry};
use crate::errors::{AppError, AppResult, LockError};
use chrono::{Duration as ChronoDuration, NaiveDateTime};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Outcome of [`DiaryStore::reindex`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReindexReport {
    /// Entries whose embedding was (re)computed.
    pub embedded: usize,
    /// Entries that already had a current embedding.
    pub up_to_date: usize,
    /// Photo-only entries, which have no text to embed.
    pub skipped_empty: usize,
}

/// Persistent store of diary entries.
pub struct DiaryStore {
    table_path: PathBuf,
    cache_path: PathBuf,
    lock_path: PathBuf,
    image_dir: PathBuf,
    merge_window: ChronoDuration,
    lock_timeout: Duration,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    mutation: Mutex<()>,
}

impl std::fmt::Debug for DiaryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiaryStore")
            .field("merge_window", &self.merge_window)
            .field("lock_timeout", &self.lock_timeout)
            .field("embeddings", &self.embedder.is_some())
            .finish()
    }
}

impl DiaryStore {
    /// Opens the store described by `config`, creating its directories.
    ///
    /// `embedder` computes entry embeddings on every text change. Without one,
    /// entries are stored without embeddings and search is unavailable.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Io` if the data or image directory cannot be created.
    pub fn open(config: &Config, embedder: Option<Arc<dyn EmbeddingProvider>>) -> AppResult<Self> {
        ensure_directory_exists(&config.data_dir)?;
        ensure_directory_exists(&config.image_dir)?;

        Ok(DiaryStore {
            table_path: config.table_path(),
            cache_path: config.embedding_cache_path(),
            lock_path: config.lock_path(),
            image_dir: config.image_dir.clone(),
            merge_window: config.merge_window,
            lock_timeout: config.lock_timeout,
            embedder,
            mutation: Mutex::new(()),
        })
    }

    /// The embedding provider this store uses, if any.
    pub fn embedder(&self) -> Option<&dyn EmbeddingProvider> {
        self.embedder.as_deref()
    }

    /// Full path of a stored image.
    pub fn image_path(&self, image_ref: &str) -> PathBuf {
        self.image_dir.join(image_ref)
    }

    /// Reads every entry in table order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Corrupt` if a row or the embedding cache cannot be decoded.
    pub fn load_all(&self) -> AppResult<Vec<DiaryEntry>> {
        table::load(&self.table_path, &self.cache_path)
    }

    /// Writes `entries` as the complete table, replacing what is stored.
    pub fn save(&self, entries: &[DiaryEntry]) -> AppResult<()> {
        let _guard = self.lock_mutations()?;
        table::save(&self.table_path, &self.cache_path, entries)
    }

    /// Merges a text fragment into the entry for `now`'s day, or creates it.
    ///
    /// The embedding is recomputed from the new text. Provider errors are not
    /// returned: the text is saved anyway, the returned entry has
    /// `embedding == None`, and a warning is logged. Callers that care check
    /// the returned embedding; [`DiaryStore::reindex`] fills the gap later.
    /// See "Embedding failure during append" in DESIGN.md.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidEntry` for an empty fragment, plus any storage
    /// or lock error. Never an embedding error.
    pub fn append_text(&self, text: &str, now: NaiveDateTime) -> AppResult<DiaryEntry> {
        let fragment = normalize_fragment(text)?;
        let merge_window = self.merge_window;

        self.mutate(|entries| {
            let index = match entries.iter().position(|e| e.day() == now.date()) {
                Some(index) => {
                    debug!("Merging text into entry for {}", now.date());
                    entries[index].merge_text(fragment, now, merge_window);
                    index
                }
                None => {
                    info!("Creating diary entry for {}", now.date());
                    entries.push(DiaryEntry::from_text(fragment, now));
                    entries.len() - 1
                }
            };

            let entry = &mut entries[index];
            if let Some(embedder) = self.embedder.as_deref() {
                match embedder.embed(&entry.text) {
                    Ok(vector) => entry.embedding = Some(vector),
                    Err(e) => warn!(
                        "Saving entry for {} without embedding: {}",
                        entry.day(),
                        e
                    ),
                }
            }
            Ok(entry.clone())
        })
    }

    /// Adds an image reference to the entry for `now`'s day, or creates a
    /// photo-only entry. Text and embedding are left unchanged.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidEntry` if `image_ref` is empty or has a path component.
    pub fn append_image(&self, image_ref: &str, now: NaiveDateTime) -> AppResult<DiaryEntry> {
        validate_image_ref(image_ref)?;

        self.mutate(|entries| {
            match entries.iter_mut().find(|e| e.day() == now.date()) {
                Some(entry) => {
                    if !entry.merge_image(image_ref) {
                        debug!("Image {} already attached to {}", image_ref, entry.day());
                    }
                    Ok(entry.clone())
                }
                None => {
                    info!("Creating photo entry for {}", now.date());
                    let entry = DiaryEntry::from_image(image_ref, now);
                    entries.push(entry.clone());
                    Ok(entry)
                }
            }
        })
    }

    /// Copies a photo into the image directory under a fresh `<id>.jpeg` name.
    ///
    /// Returns the new filename, ready for [`DiaryStore::append_image`].
    pub fn import_image(&self, source: &Path) -> AppResult<String> {
        let name = format!("{}.{}", Uuid::new_v4().simple(), IMAGE_EXTENSION);
        let destination = self.image_dir.join(&name);
        fs::copy(source, &destination)?;

        #[cfg(unix)]
        {
            use crate::constants::DEFAULT_FILE_PERMISSIONS;
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&destination, fs::Permissions::from_mode(DEFAULT_FILE_PERMISSIONS))?;
        }

        debug!("Imported image as {}", name);
        Ok(name)
    }

    /// Removes an image file that is not referenced by any entry.
    pub(crate) fn discard_image(&self, image_ref: &str) {
        if let Err(e) = fs::remove_file(self.image_path(image_ref)) {
            warn!("Failed to remove unused image {}: {}", image_ref, e);
        }
    }

    /// Computes embeddings for entries that lack a current one.
    ///
    /// Idempotent: a second run without text changes embeds nothing. With
    /// `force`, every entry with text is re-embedded. Progress made before a
    /// provider failure is saved before the error is returned.
    ///
    /// # Errors
    ///
    /// Returns `EmbeddingError::Disabled` without a provider, or the first
    /// provider error.
    pub fn reindex(&self, force: bool) -> AppResult<ReindexReport> {
        let embedder = self
            .embedder
            .as_deref()
            .ok_or(crate::errors::EmbeddingError::Disabled)?;

        let (report, failure) = self.mutate(|entries| {
            let mut report = ReindexReport::default();
            let mut failure = None;

            for entry in entries.iter_mut() {
                if entry.text.trim().is_empty() {
                    report.skipped_empty += 1;
                    continue;
                }
                if entry.embedding.is_some() && !force {
                    report.up_to_date += 1;
                    continue;
                }
                match embedder.embed(&entry.text) {
                    Ok(vector) => {
                        entry.embedding = Some(vector);
                        report.embedded += 1;
                    }
                    Err(e) => {
                        failure = Some(e);
                        break;
                    }
                }
            }
            Ok((report, failure))
        })?;

        match failure {
            Some(e) => Err(e),
            None => {
                info!(
                    "Reindex complete: {} embedded, {} up to date",
                    report.embedded, report.up_to_date
                );
                Ok(report)
            }
        }
    }

    /// Runs `f` on the loaded table and saves the result, holding both locks.
    ///
    /// Nothing is written if `f` fails.
    fn mutate<T>(&self, f: impl FnOnce(&mut Vec<DiaryEntry>) -> AppResult<T>) -> AppResult<T> {
        let _guard = self.lock_mutations()?;
        let mut entries = table::load(&self.table_path, &self.cache_path)?;
        let result = f(&mut entries)?;
        table::save(&self.table_path, &self.cache_path, &entries)?;
        Ok(result)
    }

    fn lock_mutations(&self) -> AppResult<MutationGuard<'_>> {
        // A panic inside another mutation leaves no partial state on disk
        let local = self
            .mutation
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let file = acquire_table_lock(&self.lock_path, self.lock_timeout)?;
        Ok(MutationGuard {
            _file: TableLock { file },
            _local: local,
        })
    }
}

struct MutationGuard<'a> {
    // Field order matters: the file lock is released before the mutex
    _file: TableLock,
    _local: std::sync::MutexGuard<'a, ()>,
}

struct TableLock {
    file: File,
}

impl Drop for TableLock {
    fn drop(&mut self) {
        if let Err(e) = self.file.unlock() {
            warn!("Failed to release diary lock: {}", e);
        }
    }
}

fn acquire_table_lock(path: &Path, timeout: Duration) -> AppResult<File> {
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .map_err(|source| LockError::AcquisitionFailed {
            path: path.to_path_buf(),
            source,
        })?;

    let started = Instant::now();
    loop {
        match file.try_lock_exclusive() {
            Ok(()) => return Ok(file),
            Err(e) if e.raw_os_error() == fs2::lock_contended_error().raw_os_error() => {
                if started.elapsed() >= timeout {
                    return Err(LockError::FileBusy {
                        path: path.to_path_buf(),
                    }
                    .into());
                }
                thread::sleep(Duration::from_millis(LOCK_RETRY_INTERVAL_MS));
            }
            Err(source) => {
                return Err(LockError::AcquisitionFailed {
                    path: path.to_path_buf(),
                    source,
                }
                .into())
            }
        }
    }
}

/// Ensures a directory exists, creating it with owner-only permissions.
///
/// # Errors
///
/// Returns `AppError::Io` if the directory cannot be created, and
/// `AppError::Config` if the path is relative.
pub fn ensure_directory_exists(dir: &Path) -> AppResult<()> {
    if !dir.is_absolute() {
        return Err(AppError::Config(format!(
            "Directory path must be absolute: {}",
            dir.display()
        )));
    }

    if !dir.exists() {
        fs::create_dir_all(dir).map_err(|e| {
            AppError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to create directory {}: {}", dir.display(), e),
            ))
        })?;

        // Set secure permissions (0o700 - read/write/execute only for owner)
        #[cfg(unix)]
        {
            use crate::constants::DEFAULT_DIR_PERMISSIONS;
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(dir, fs::Permissions::from_mode(DEFAULT_DIR_PERMISSIONS))?;
            debug!("Set 0o700 permissions on {}", dir.display());
        }
    }
    Ok(())
}
