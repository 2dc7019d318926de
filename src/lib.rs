/*!
# Daybook

Daybook is a personal diary. Text and photos are appended to one entry per
calendar day, past days can be looked up by date, and entries can be searched
by meaning through text embeddings.

## Core Features

- Append text fragments; fragments a few minutes apart are merged into one block
- Attach photos to the day's entry
- Look up a date, with the closest earlier and later entries as a fallback
- "On this day" entries from earlier years, and random entries
- Semantic search and "similar entries" over cached embeddings
- Counts and weekday/month histograms

## Architecture

- `cli`: command-line interface handling using clap
- `config`: configuration loading and validation
- `constants`: file names, formats and defaults
- `errors`: error handling infrastructure
- `diary`: the entry model and the persisted table
- `resolve`: date parsing and date-based lookup
- `ai`: embedding providers
- `ops`: search, statistics, photo import and rendering

## Usage Example

```rust,no_run
use daybook::{Config, DiaryStore};
use chrono::Local;

fn main() -> daybook::AppResult<()> {
    let config = Config::load()?;
    config.validate()?;

    let embedder = daybook::ai::provider_from_config(&config)?;
    let store = DiaryStore::open(&config, embedder)?;
    store.append_text("Went hiking", Local::now().naive_local())?;
    Ok(())
}
```
*/

/// Embedding providers
pub mod ai;
/// Command-line interface for parsing and handling user arguments
pub mod cli;
/// Configuration loading and management
pub mod config;
/// Application-wide constants
pub mod constants;
/// Diary entries and their storage
pub mod diary;
/// Error types and utilities for error handling
pub mod errors;
/// Search, statistics and other user-facing operations
pub mod ops;
/// Date parsing and date-based lookup
pub mod resolve;

// Re-export important types for convenience
pub use cli::CliArgs;
pub use config::Config;
pub use diary::{DiaryEntry, DiaryStore};
pub use errors::{AppError, AppResult};
