use crate::constants::{
    APP_DESCRIPTION, APP_NAME, DEFAULT_SEARCH_RESULTS, LOG_FORMAT_JSON, LOG_FORMAT_TEXT,
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// A personal diary with date lookup and semantic search
#[derive(Parser, Debug)]
#[clap(name = APP_NAME, about = APP_DESCRIPTION)]
#[clap(author, version, long_about = None)]
pub struct CliArgs {
    #[clap(subcommand)]
    pub command: Command,

    /// Log format for stderr output
    #[clap(long, default_value = LOG_FORMAT_TEXT, value_parser = [LOG_FORMAT_TEXT, LOG_FORMAT_JSON], global = true)]
    pub log_format: String,

    /// Print debug logs
    #[clap(short = 'v', long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Adds text to today's entry
    Add {
        /// Text to write; quote it or pass several words
        #[clap(required = true)]
        text: Vec<String>,
    },

    /// Attaches a photo to today's entry
    Photo {
        /// Image file to copy into the diary
        path: PathBuf,
    },

    /// Shows the entry for a date (e.g. 15.06.2021 or 15_06_21)
    Show { date: String },

    /// Shows entries written on this day in earlier years
    Today,

    /// Shows a random entry
    Random,

    /// Finds entries similar to a text
    Search {
        #[clap(required = true)]
        query: Vec<String>,

        /// Number of results
        #[clap(short = 'n', long, default_value_t = DEFAULT_SEARCH_RESULTS)]
        limit: usize,
    },

    /// Finds entries similar to the entry for a date
    Similar {
        date: String,

        /// Number of results
        #[clap(short = 'n', long, default_value_t = DEFAULT_SEARCH_RESULTS)]
        limit: usize,
    },

    /// Prints counts and weekday/month histograms
    Stats,

    /// Computes missing embeddings
    Reindex {
        /// Recompute every embedding, not only missing ones
        #[clap(long)]
        force: bool,
    },
}

impl CliArgs {
    /// Parse command-line arguments
    pub fn parse() -> Self {
        CliArgs::parse_from(std::env::args())
    }
}

/// Joins words given as separate arguments back into one text.
pub fn join_words(words: &[String]) -> String {
    words.join(" ")
}
