//! Constants used throughout the application.
//!
//! Centralized so that file names, formats and defaults are referenced
//! consistently by the store, the resolver and the CLI.

// Application Metadata
/// The name of the application.
pub const APP_NAME: &str = "daybook";
/// The description of the application used in CLI help text.
pub const APP_DESCRIPTION: &str = "A personal diary with date lookup and semantic search";

// CLI Arguments & Defaults
/// Log format identifier for plain text.
pub const LOG_FORMAT_TEXT: &str = "text";
/// Log format identifier for JSON.
pub const LOG_FORMAT_JSON: &str = "json";
/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

// Configuration Keys & Environment Variables
pub const ENV_VAR_DAYBOOK_DIR: &str = "DAYBOOK_DIR";
pub const ENV_VAR_DAYBOOK_IMAGE_DIR: &str = "DAYBOOK_IMAGE_DIR";
pub const ENV_VAR_EMBED_PROVIDER: &str = "DAYBOOK_EMBED_PROVIDER";
pub const ENV_VAR_EMBED_URL: &str = "DAYBOOK_EMBED_URL";
pub const ENV_VAR_EMBED_MODEL: &str = "DAYBOOK_EMBED_MODEL";
pub const ENV_VAR_EMBED_API_KEY: &str = "DAYBOOK_EMBED_API_KEY";
/// Fallback for the API key when the daybook-specific variable is unset.
pub const ENV_VAR_OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const ENV_VAR_EMBED_TIMEOUT_SECS: &str = "DAYBOOK_EMBED_TIMEOUT_SECS";
pub const ENV_VAR_MERGE_WINDOW_MINUTES: &str = "DAYBOOK_MERGE_WINDOW_MINUTES";
pub const ENV_VAR_LOCK_TIMEOUT_MS: &str = "DAYBOOK_LOCK_TIMEOUT_MS";
/// Standard environment variable for the user's home directory.
pub const ENV_VAR_HOME: &str = "HOME";
/// Default sub-directory for diary data within the user's home directory.
pub const DEFAULT_DATA_SUBDIR: &str = ".local/share/daybook";

// Embedding providers
pub const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";
pub const DEFAULT_OLLAMA_EMBED_MODEL: &str = "nomic-embed-text";
pub const DEFAULT_OPENAI_URL: &str = "https://api.openai.com";
pub const DEFAULT_OPENAI_EMBED_MODEL: &str = "text-embedding-3-large";
pub const DEFAULT_EMBED_TIMEOUT_SECS: u64 = 30;

// Merge & locking
/// Fragments added within this many minutes of the previous one share its header.
pub const DEFAULT_MERGE_WINDOW_MINUTES: i64 = 5;
pub const DEFAULT_LOCK_TIMEOUT_MS: u64 = 5000;
/// Poll interval while waiting for the table lock.
pub const LOCK_RETRY_INTERVAL_MS: u64 = 50;

// File System Parameters
pub const TABLE_FILE_NAME: &str = "diary.jsonl";
pub const EMBEDDING_CACHE_FILE_NAME: &str = "embeddings.bin";
pub const LOCK_FILE_NAME: &str = "diary.lock";
pub const IMAGE_SUBDIR: &str = "images";
/// Extension given to imported photos.
pub const IMAGE_EXTENSION: &str = "jpeg";
/// Default POSIX permissions for newly created directories (owner read/write/execute).
#[cfg(unix)]
pub const DEFAULT_DIR_PERMISSIONS: u32 = 0o700;
/// Default POSIX permissions for newly created files (owner read/write).
#[cfg(unix)]
pub const DEFAULT_FILE_PERMISSIONS: u32 = 0o600;

// Embedding cache format
pub const EMBEDDING_CACHE_MAGIC: &[u8; 5] = b"DBEMB";
pub const EMBEDDING_CACHE_VERSION: u8 = 1;

// Date/Time Logic
/// Timestamp format used in the persisted table.
pub const TABLE_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";
/// Time format used in fragment headers (`-- HH:MM --`).
pub const FRAGMENT_HEADER_TIME_FORMAT: &str = "%H:%M";
/// Date format of neighbor labels, usable as bot commands (`/15_06_2021`).
pub const NEIGHBOR_LABEL_FORMAT: &str = "%d_%m_%Y";
/// Label used when there is no entry on one side of a date.
pub const NO_ENTRY_LABEL: &str = "No entry";
/// Years written with two digits are offset into this century.
pub const TWO_DIGIT_YEAR_BASE: i32 = 2000;

// Search
pub const DEFAULT_SEARCH_RESULTS: usize = 3;

// Logging Configuration
/// Service name used in tracing spans and structured logs.
pub const TRACING_SERVICE_NAME: &str = "daybook";
/// Name for the root tracing span covering an application invocation.
pub const TRACING_ROOT_SPAN_NAME: &str = "app_invocation";
