//! Error handling utilities for the daybook application.
//!
//! This module provides the central error type `AppError` which represents all
//! possible error conditions that might occur in the application, as well as the
//! convenience type alias `AppResult` for functions that can return these errors.
//!
//! An empty lookup result is never an error: "no entry for this date" is
//! represented as `None` or an empty `Vec` and handled by the caller.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while interpreting a user-supplied date.
///
/// # Examples
///
/// ```
/// use daybook::errors::DateError;
///
/// let error = DateError::InvalidFormat("32.13.2020".to_string());
/// assert!(format!("{}", error).contains("32.13.2020"));
/// assert!(format!("{}", error).contains("day.month.year"));
/// ```
#[derive(Debug, Error)]
pub enum DateError {
    /// The input is not a valid `day.month.year` date.
    #[error("Invalid date '{0}'. Please use the format day.month.year, e.g. 15.06.2021 or 15.06.21.")]
    InvalidFormat(String),
}

/// Represents failures reading or writing the persisted diary table.
///
/// # Examples
///
/// ```
/// use daybook::errors::StorageError;
/// use std::path::PathBuf;
///
/// let error = StorageError::Corrupt {
///     path: PathBuf::from("/data/diary.jsonl"),
///     line: 3,
///     reason: "images is not a list".to_string(),
/// };
/// let message = format!("{}", error);
/// assert!(message.contains("diary.jsonl"));
/// assert!(message.contains("line 3"));
/// ```
#[derive(Debug, Error)]
pub enum StorageError {
    /// A persisted row or cache record could not be decoded.
    #[error("Diary storage is corrupt at {path} (line {line}): {reason}")]
    Corrupt {
        /// The file that failed to decode
        path: PathBuf,
        /// 1-based line (table) or record (cache) number; 0 for file-level problems
        line: usize,
        /// What was wrong with it
        reason: String,
    },

    /// A row could not be encoded for writing.
    #[error("Failed to encode diary row: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Represents errors that can occur when attempting to lock the diary table.
///
/// # Examples
///
/// ```
/// use daybook::errors::LockError;
/// use std::path::PathBuf;
///
/// let error = LockError::FileBusy {
///     path: PathBuf::from("/data/diary.lock"),
/// };
///
/// assert!(format!("{}", error).contains("another process"));
/// ```
#[derive(Debug, Error)]
pub enum LockError {
    /// The lock is still held by another process after the lock timeout.
    #[error("Diary is currently being modified by another process: {path}. Please retry in a moment.")]
    FileBusy {
        /// The path to the lock file
        path: PathBuf,
    },

    /// Acquiring the lock failed for a technical reason.
    #[error("Failed to acquire lock {path}: {source}. Please check file permissions and ensure the directory is accessible.")]
    AcquisitionFailed {
        /// The path to the lock file
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },
}

/// Represents failures of the external embedding provider.
///
/// # Examples
///
/// ```
/// use daybook::errors::EmbeddingError;
///
/// let error = EmbeddingError::ModelNotFound("nomic-embed-text".to_string());
/// assert!(format!("{}", error).contains("nomic-embed-text"));
/// ```
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// The provider could not be reached (connection refused, timeout, DNS).
    #[error("Embedding provider unreachable: {0}")]
    ProviderUnreachable(#[source] reqwest::Error),

    /// The provider does not know the configured model.
    #[error("Embedding model not found: {0}")]
    ModelNotFound(String),

    /// The provider answered, but not with a usable embedding.
    #[error("Invalid response from embedding provider: {0}")]
    InvalidResponse(String),

    /// Similarity was requested for an entry that has no embedding yet.
    #[error("Entry from {0} has no embedding. Run `daybook reindex` first.")]
    MissingEmbedding(String),

    /// Search was requested but no provider is configured.
    #[error("No embedding provider configured (DAYBOOK_EMBED_PROVIDER=none)")]
    Disabled,
}

#[derive(Debug, Error)]
pub enum AppError {
    /// Errors related to configuration loading or validation.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Input/output errors from filesystem operations.
    ///
    /// This variant automatically converts from `std::io::Error` through the `From` trait.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A fragment or image reference that cannot be stored.
    #[error("Invalid entry: {0}")]
    InvalidEntry(String),

    /// Bad user-supplied date.
    #[error("{0}")]
    Date(#[from] DateError),

    /// Errors decoding or encoding the diary table.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Errors from the embedding provider.
    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    /// Errors related to locking the diary table.
    #[error("File locking error: {0}")]
    Lock(#[from] LockError),
}

/// A type alias for `Result<T, AppError>` to simplify function signatures.
///
/// # Examples
///
/// ```
/// use daybook::errors::{AppResult, AppError};
///
/// fn might_fail() -> AppResult<String> {
///     if false {
///         return Err(AppError::InvalidEntry("empty text".to_string()));
///     }
///     Ok("Operation succeeded".to_string())
/// }
/// ```
pub type AppResult<T> = Result<T, AppError>;
