/*!
# Daybook - A Personal Diary

Daybook keeps one entry per calendar day. Text added a few minutes apart is
merged into one block; later additions get a `-- HH:MM --` header. Photos
are copied into the image directory and attached to the day's entry.

## Usage

```
daybook [OPTIONS] <COMMAND>

Commands:
  add      Adds text to today's entry
  photo    Attaches a photo to today's entry
  show     Shows the entry for a date (e.g. 15.06.2021 or 15_06_21)
  today    Shows entries written on this day in earlier years
  random   Shows a random entry
  search   Finds entries similar to a text
  similar  Finds entries similar to the entry for a date
  stats    Prints counts and weekday/month histograms
  reindex  Computes missing embeddings

Options:
      --log-format <LOG_FORMAT>  Log format for stderr output [default: text] [possible values: text, json]
  -v, --verbose                  Print debug logs
  -h, --help                     Print help information
  -V, --version                  Print version information
```

## Configuration

- `DAYBOOK_DIR`: where the table and embeddings live (defaults to `~/.local/share/daybook`)
- `DAYBOOK_IMAGE_DIR`: where photos are stored (defaults to `<DAYBOOK_DIR>/images`)
- `DAYBOOK_EMBED_PROVIDER`: `ollama`, `openai` or `none`
- `DAYBOOK_EMBED_URL`, `DAYBOOK_EMBED_MODEL`, `DAYBOOK_EMBED_API_KEY`
*/

use chrono::Local;
use daybook::ai::provider_from_config;
use daybook::cli::{join_words, CliArgs, Command};
use daybook::config::Config;
use daybook::constants::{
    DEFAULT_LOG_LEVEL, LOG_FORMAT_JSON, TRACING_ROOT_SPAN_NAME, TRACING_SERVICE_NAME,
};
use daybook::diary::DiaryStore;
use daybook::errors::{AppResult, EmbeddingError};
use daybook::ops::{self, show};
use daybook::resolve::{self, Resolution};
use tracing::{debug, error, info, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

fn init_logging(format: &str, verbose: bool) {
    let level = if verbose { "debug" } else { DEFAULT_LOG_LEVEL };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    if format == LOG_FORMAT_JSON {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_current_span(true)
                    .with_span_list(false),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

/// The main entry point for the daybook application.
///
/// Logging is initialized before anything else so that configuration errors
/// are logged inside the root span. Errors are logged once here and printed
/// as a single line; the process then exits with status 1.
fn main() {
    let args = CliArgs::parse();
    init_logging(&args.log_format, args.verbose);

    let correlation_id = Uuid::new_v4();
    let root_span = tracing::span!(
        Level::INFO,
        TRACING_ROOT_SPAN_NAME,
        service_name = TRACING_SERVICE_NAME,
        correlation_id = %correlation_id,
    );
    let _guard = root_span.enter();

    if let Err(e) = run(args.command) {
        error!("{}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(command: Command) -> AppResult<()> {
    // One timestamp for the whole invocation
    let now = Local::now().naive_local();

    let config = Config::load()?;
    config.validate()?;
    debug!("Configuration: {:?}", config);

    let embedder = provider_from_config(&config)?;
    let store = DiaryStore::open(&config, embedder)?;

    match command {
        Command::Add { text } => {
            let entry = store.append_text(&join_words(&text), now)?;
            if entry.embedding.is_none() && store.embedder().is_some() {
                println!(
                    "Saved entry for {}. Embedding failed; run `daybook reindex` later.",
                    entry.day()
                );
            } else {
                println!("Saved entry for {}.", entry.day());
            }
        }
        Command::Photo { path } => {
            let entry = ops::add_photo(&store, &path, now)?;
            println!("Added photo to entry for {}.", entry.day());
        }
        Command::Show { date } => {
            let entries = store.load_all()?;
            let resolution = resolve::lookup(&date, &entries)?;
            println!("{}", show::render_resolution(&resolution, &store));
        }
        Command::Today => {
            let entries = store.load_all()?;
            match resolve::memory_of_the_day(&entries, now.date(), &mut rand::thread_rng()) {
                Some(memory) => println!("{}", show::render_memory(&memory, &store)),
                None => println!("Nothing written on this day in earlier years."),
            }
        }
        Command::Random => {
            let entries = store.load_all()?;
            match resolve::random_entry(&entries, &mut rand::thread_rng()) {
                Some(entry) => println!(
                    "{}",
                    show::render_entry("Here is a random entry from", entry, &store)
                ),
                None => println!("The diary is empty."),
            }
        }
        Command::Search { query, limit } => {
            let embedder = store.embedder().ok_or(EmbeddingError::Disabled)?;
            let entries = store.load_all()?;
            let matches = ops::rank(embedder, &join_words(&query), &entries, limit)?;
            println!("{}", show::render_matches(&matches, &store));
        }
        Command::Similar { date, limit } => {
            let day = resolve::parse_date_query(&date)?;
            let entries = store.load_all()?;
            match resolve::lookup_date(day, &entries) {
                Resolution::Exact { entry, .. } => {
                    let matches = ops::similar_to(entry, &entries, limit)?;
                    println!("{}", show::render_matches(&matches, &store));
                }
                missing => println!("{}", show::render_resolution(&missing, &store)),
            }
        }
        Command::Stats => {
            let entries = store.load_all()?;
            print!("{}", ops::summarize(&entries));
        }
        Command::Reindex { force } => {
            let report = store.reindex(force)?;
            info!("Reindex finished: {:?}", report);
            println!(
                "Embedded {} entries ({} already up to date, {} without text).",
                report.embedded, report.up_to_date, report.skipped_empty
            );
        }
    }

    Ok(())
}
