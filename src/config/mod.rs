//! Configuration management for the daybook application.
//!
//! This module handles loading and validating configuration settings from environment
//! variables, with sensible defaults. The resulting `Config` is passed by reference
//! to the store and the embedding providers; there is no process-wide instance.
//!
//! # Environment Variables
//!
//! - `DAYBOOK_DIR`: Data directory (defaults to ~/.local/share/daybook)
//! - `DAYBOOK_IMAGE_DIR`: Photo directory (defaults to `<DAYBOOK_DIR>/images`)
//! - `DAYBOOK_EMBED_PROVIDER`: `ollama`, `openai` or `none` (defaults to `ollama`)
//! - `DAYBOOK_EMBED_URL` / `DAYBOOK_EMBED_MODEL`: Provider endpoint and model
//! - `DAYBOOK_EMBED_API_KEY` (or `OPENAI_API_KEY`): Required for `openai`
//! - `DAYBOOK_EMBED_TIMEOUT_SECS`: Timeout for a single embedding request
//! - `DAYBOOK_MERGE_WINDOW_MINUTES`: Merge window for same-day fragments
//! - `DAYBOOK_LOCK_TIMEOUT_MS`: How long a mutation waits for the table lock

use crate::constants::*;
use crate::errors::{AppError, AppResult};
use chrono::Duration as ChronoDuration;
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Which embedding service computes entry and query vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedProvider {
    /// A local Ollama server.
    Ollama,
    /// An OpenAI-compatible `/v1/embeddings` endpoint.
    OpenAi,
    /// No embeddings; search is unavailable.
    None,
}

impl EmbedProvider {
    fn default_url(self) -> &'static str {
        match self {
            EmbedProvider::Ollama => DEFAULT_OLLAMA_URL,
            EmbedProvider::OpenAi => DEFAULT_OPENAI_URL,
            EmbedProvider::None => "",
        }
    }

    fn default_model(self) -> &'static str {
        match self {
            EmbedProvider::Ollama => DEFAULT_OLLAMA_EMBED_MODEL,
            EmbedProvider::OpenAi => DEFAULT_OPENAI_EMBED_MODEL,
            EmbedProvider::None => "",
        }
    }
}

impl FromStr for EmbedProvider {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ollama" => Ok(EmbedProvider::Ollama),
            "openai" => Ok(EmbedProvider::OpenAi),
            "none" | "off" => Ok(EmbedProvider::None),
            other => Err(AppError::Config(format!(
                "Unknown embedding provider '{}'. Expected one of: ollama, openai, none",
                other
            ))),
        }
    }
}

/// Configuration for the daybook application.
///
/// # Examples
///
/// ```
/// use daybook::Config;
/// use std::path::PathBuf;
///
/// let config = Config::with_data_dir(PathBuf::from("/var/lib/daybook"));
/// assert_eq!(config.image_dir, PathBuf::from("/var/lib/daybook/images"));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone)]
pub struct Config {
    /// Directory holding the table, the embedding cache and the lock file.
    pub data_dir: PathBuf,
    /// Directory where photo files are stored by filename.
    pub image_dir: PathBuf,
    pub embed_provider: EmbedProvider,
    pub embed_url: String,
    pub embed_model: String,
    pub embed_api_key: Option<String>,
    /// Upper bound for a single embedding request.
    pub embed_timeout: Duration,
    /// Fragments within this window of the previous one get no new header.
    pub merge_window: ChronoDuration,
    /// How long a mutation waits for the table lock before giving up.
    pub lock_timeout: Duration,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("data_dir", &"[REDACTED_PATH]")
            .field("image_dir", &"[REDACTED_PATH]")
            .field("embed_provider", &self.embed_provider)
            .field("embed_url", &self.embed_url)
            .field("embed_model", &self.embed_model)
            .field(
                "embed_api_key",
                &self.embed_api_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("embed_timeout", &self.embed_timeout)
            .field("merge_window", &self.merge_window)
            .field("lock_timeout", &self.lock_timeout)
            .finish()
    }
}

impl Config {
    /// Builds a configuration with defaults rooted at `data_dir`.
    ///
    /// Embeddings are disabled; callers that need a provider set it explicitly.
    pub fn with_data_dir(data_dir: PathBuf) -> Self {
        Config {
            image_dir: data_dir.join(IMAGE_SUBDIR),
            data_dir,
            embed_provider: EmbedProvider::None,
            embed_url: String::new(),
            embed_model: String::new(),
            embed_api_key: None,
            embed_timeout: Duration::from_secs(DEFAULT_EMBED_TIMEOUT_SECS),
            merge_window: ChronoDuration::minutes(DEFAULT_MERGE_WINDOW_MINUTES),
            lock_timeout: Duration::from_millis(DEFAULT_LOCK_TIMEOUT_MS),
        }
    }

    /// Path of the persisted entry table.
    pub fn table_path(&self) -> PathBuf {
        self.data_dir.join(TABLE_FILE_NAME)
    }

    /// Path of the embedding side file.
    pub fn embedding_cache_path(&self) -> PathBuf {
        self.data_dir.join(EMBEDDING_CACHE_FILE_NAME)
    }

    /// Path of the lock file guarding table mutations.
    pub fn lock_path(&self) -> PathBuf {
        self.data_dir.join(LOCK_FILE_NAME)
    }

    /// Loads configuration from environment variables with sensible defaults.
    ///
    /// Directory values are expanded with `shellexpand`, so `~` and `$VAR`
    /// references work.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if path expansion fails, a numeric variable
    /// is not a number, or the provider name is unknown.
    pub fn load() -> AppResult<Self> {
        let data_dir_str = env::var(ENV_VAR_DAYBOOK_DIR).unwrap_or_else(|_| {
            let home = env::var(ENV_VAR_HOME).unwrap_or_default();
            format!("{}/{}", home, DEFAULT_DATA_SUBDIR)
        });
        let data_dir = expand_path(&data_dir_str)?;

        let image_dir = match env::var(ENV_VAR_DAYBOOK_IMAGE_DIR) {
            Ok(dir) => expand_path(&dir)?,
            Err(_) => data_dir.join(IMAGE_SUBDIR),
        };

        let embed_provider = match env::var(ENV_VAR_EMBED_PROVIDER) {
            Ok(value) => value.parse()?,
            Err(_) => EmbedProvider::Ollama,
        };

        let embed_url = env::var(ENV_VAR_EMBED_URL)
            .unwrap_or_else(|_| embed_provider.default_url().to_string());
        let embed_model = env::var(ENV_VAR_EMBED_MODEL)
            .unwrap_or_else(|_| embed_provider.default_model().to_string());
        let embed_api_key = env::var(ENV_VAR_EMBED_API_KEY)
            .or_else(|_| env::var(ENV_VAR_OPENAI_API_KEY))
            .ok()
            .filter(|key| !key.is_empty());

        let embed_timeout = Duration::from_secs(parse_number_var(
            ENV_VAR_EMBED_TIMEOUT_SECS,
            DEFAULT_EMBED_TIMEOUT_SECS,
        )?);
        let merge_minutes =
            parse_number_var(ENV_VAR_MERGE_WINDOW_MINUTES, DEFAULT_MERGE_WINDOW_MINUTES)?;
        let merge_window = ChronoDuration::try_minutes(merge_minutes).ok_or_else(|| {
            AppError::Config(format!(
                "{} is out of range, got '{}'",
                ENV_VAR_MERGE_WINDOW_MINUTES, merge_minutes
            ))
        })?;
        let lock_timeout =
            Duration::from_millis(parse_number_var(ENV_VAR_LOCK_TIMEOUT_MS, DEFAULT_LOCK_TIMEOUT_MS)?);

        Ok(Config {
            data_dir,
            image_dir,
            embed_provider,
            embed_url,
            embed_model,
            embed_api_key,
            embed_timeout,
            merge_window,
            lock_timeout,
        })
    }

    /// Validates that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a directory is empty or relative, the merge
    /// window is negative, the embedding timeout is zero, or the OpenAI provider
    /// is selected without an API key.
    pub fn validate(&self) -> AppResult<()> {
        validate_dir("Data directory", &self.data_dir)?;
        validate_dir("Image directory", &self.image_dir)?;

        if self.merge_window < ChronoDuration::zero() {
            return Err(AppError::Config(
                "Merge window cannot be negative".to_string(),
            ));
        }

        if self.embed_provider != EmbedProvider::None {
            if self.embed_timeout.is_zero() {
                return Err(AppError::Config(
                    "Embedding timeout must be greater than zero".to_string(),
                ));
            }
            if self.embed_url.is_empty() {
                return Err(AppError::Config("Embedding URL is empty".to_string()));
            }
            if self.embed_model.is_empty() {
                return Err(AppError::Config("Embedding model is empty".to_string()));
            }
        }

        if self.embed_provider == EmbedProvider::OpenAi && self.embed_api_key.is_none() {
            return Err(AppError::Config(format!(
                "The openai provider needs an API key. Set {} or {}",
                ENV_VAR_EMBED_API_KEY, ENV_VAR_OPENAI_API_KEY
            )));
        }

        Ok(())
    }
}

fn expand_path(raw: &str) -> AppResult<PathBuf> {
    let expanded = shellexpand::full(raw)
        .map_err(|e| AppError::Config(format!("Failed to expand path: {}", e)))?;
    Ok(PathBuf::from(expanded.into_owned()))
}

fn parse_number_var<T>(name: &str, default: T) -> AppResult<T>
where
    T: FromStr,
{
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| {
            AppError::Config(format!("{} must be a whole number, got '{}'", name, raw))
        }),
        Err(_) => Ok(default),
    }
}

fn validate_dir(label: &str, dir: &Path) -> AppResult<()> {
    if dir.as_os_str().is_empty() {
        return Err(AppError::Config(format!("{} path is empty", label)));
    }
    if !dir.is_absolute() {
        return Err(AppError::Config(format!(
            "{} must be an absolute path",
            label
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::tempdir;

    const ALL_VARS: &[&str] = &[
        ENV_VAR_DAYBOOK_DIR,
        ENV_VAR_DAYBOOK_IMAGE_DIR,
        ENV_VAR_EMBED_PROVIDER,
        ENV_VAR_EMBED_URL,
        ENV_VAR_EMBED_MODEL,
        ENV_VAR_EMBED_API_KEY,
        ENV_VAR_OPENAI_API_KEY,
        ENV_VAR_EMBED_TIMEOUT_SECS,
        ENV_VAR_MERGE_WINDOW_MINUTES,
        ENV_VAR_LOCK_TIMEOUT_MS,
    ];

    fn setup() {
        // Clear relevant environment variables before each test
        for var in ALL_VARS {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_debug_impl_redacts_sensitive_info() {
        let mut config = Config::with_data_dir(PathBuf::from("/home/username/private/diary"));
        config.embed_api_key = Some("sk-very-secret".to_string());

        let debug_output = format!("{:?}", config);

        assert!(debug_output.contains("[REDACTED_PATH]"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("sk-very-secret"));
        assert!(!debug_output.contains("/home/username/private/diary"));
    }

    #[test]
    #[serial]
    fn test_load_defaults() {
        setup();
        let temp_dir = tempdir().unwrap();
        env::set_var(ENV_VAR_DAYBOOK_DIR, temp_dir.path());

        let config = Config::load().unwrap();
        setup();

        assert_eq!(config.data_dir, temp_dir.path());
        assert_eq!(config.image_dir, temp_dir.path().join("images"));
        assert_eq!(config.embed_provider, EmbedProvider::Ollama);
        assert_eq!(config.embed_url, DEFAULT_OLLAMA_URL);
        assert_eq!(config.embed_model, DEFAULT_OLLAMA_EMBED_MODEL);
        assert_eq!(config.merge_window, ChronoDuration::minutes(5));
        assert_eq!(config.table_path(), temp_dir.path().join("diary.jsonl"));
        assert!(config.validate().is_ok());
    }

    #[test]
    #[serial]
    fn test_load_openai_uses_fallback_key() {
        setup();
        env::set_var(ENV_VAR_DAYBOOK_DIR, "/tmp/daybook-config-test");
        env::set_var(ENV_VAR_EMBED_PROVIDER, "OpenAI");
        env::set_var(ENV_VAR_OPENAI_API_KEY, "sk-test");

        let config = Config::load().unwrap();
        setup();

        assert_eq!(config.embed_provider, EmbedProvider::OpenAi);
        assert_eq!(config.embed_model, DEFAULT_OPENAI_EMBED_MODEL);
        assert_eq!(config.embed_api_key.as_deref(), Some("sk-test"));
        assert!(config.validate().is_ok());
    }

    #[test]
    #[serial]
    fn test_load_custom_image_dir_and_window() {
        setup();
        env::set_var(ENV_VAR_DAYBOOK_DIR, "/tmp/daybook-config-test");
        env::set_var(ENV_VAR_DAYBOOK_IMAGE_DIR, "/tmp/daybook-photos");
        env::set_var(ENV_VAR_MERGE_WINDOW_MINUTES, "10");

        let config = Config::load().unwrap();
        setup();

        assert_eq!(config.image_dir, PathBuf::from("/tmp/daybook-photos"));
        assert_eq!(config.merge_window, ChronoDuration::minutes(10));
    }

    #[test]
    #[serial]
    fn test_load_rejects_non_numeric_timeout() {
        setup();
        env::set_var(ENV_VAR_DAYBOOK_DIR, "/tmp/daybook-config-test");
        env::set_var(ENV_VAR_EMBED_TIMEOUT_SECS, "soon");

        let result = Config::load();
        setup();

        match result {
            Err(AppError::Config(msg)) => assert!(msg.contains(ENV_VAR_EMBED_TIMEOUT_SECS)),
            _ => panic!("Expected Config error for non-numeric timeout"),
        }
    }

    #[test]
    #[serial]
    fn test_load_rejects_out_of_range_merge_window() {
        setup();
        env::set_var(ENV_VAR_DAYBOOK_DIR, "/tmp/daybook-config-test");
        env::set_var(ENV_VAR_MERGE_WINDOW_MINUTES, i64::MAX.to_string());

        let result = Config::load();
        setup();

        match result {
            Err(AppError::Config(msg)) => {
                assert!(msg.contains(ENV_VAR_MERGE_WINDOW_MINUTES));
                assert!(msg.contains("out of range"));
            }
            _ => panic!("Expected Config error for an out-of-range merge window"),
        }
    }

    #[test]
    #[serial]
    fn test_load_rejects_unknown_provider() {
        setup();
        env::set_var(ENV_VAR_EMBED_PROVIDER, "carrier-pigeon");

        let result = Config::load();
        setup();

        match result {
            Err(AppError::Config(msg)) => assert!(msg.contains("carrier-pigeon")),
            _ => panic!("Expected Config error for unknown provider"),
        }
    }

    #[test]
    fn test_validate_relative_data_dir() {
        let config = Config::with_data_dir(PathBuf::from("relative/path"));

        match config.validate() {
            Err(AppError::Config(message)) => {
                assert!(message.contains("must be an absolute path"))
            }
            _ => panic!("Expected Config error about relative path"),
        }
    }

    #[test]
    fn test_validate_empty_data_dir() {
        let config = Config::with_data_dir(PathBuf::from(""));

        match config.validate() {
            Err(AppError::Config(message)) => assert!(message.contains("path is empty")),
            _ => panic!("Expected Config error about empty directory"),
        }
    }

    #[test]
    fn test_validate_openai_without_key() {
        let mut config = Config::with_data_dir(PathBuf::from("/tmp/daybook"));
        config.embed_provider = EmbedProvider::OpenAi;
        config.embed_url = DEFAULT_OPENAI_URL.to_string();
        config.embed_model = DEFAULT_OPENAI_EMBED_MODEL.to_string();

        match config.validate() {
            Err(AppError::Config(message)) => assert!(message.contains("API key")),
            _ => panic!("Expected Config error about missing API key"),
        }
    }

    #[test]
    fn test_validate_zero_timeout() {
        let mut config = Config::with_data_dir(PathBuf::from("/tmp/daybook"));
        config.embed_provider = EmbedProvider::Ollama;
        config.embed_url = DEFAULT_OLLAMA_URL.to_string();
        config.embed_model = DEFAULT_OLLAMA_EMBED_MODEL.to_string();
        config.embed_timeout = Duration::from_secs(0);

        assert!(config.validate().is_err());
    }
}
