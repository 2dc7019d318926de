//! Resolution of user-entered dates to diary entries.
//!
//! Users type dates as `day.month.year` (`15.06.2021`, `15.6.21`); the bot
//! command form `/15_06_2021` and ISO `2021-06-15` are accepted too. A lookup
//! that finds nothing is not an error: the caller gets the nearest entries
//! before and after the date instead.
//!
//! All functions here are pure and operate on an already loaded table.

use crate::constants::{NEIGHBOR_LABEL_FORMAT, NO_ENTRY_LABEL, TWO_DIGIT_YEAR_BASE};
use crate::diary::DiaryEntry;
use crate::errors::DateError;
use chrono::{Datelike, NaiveDate};
use rand::seq::SliceRandom;
use rand::Rng;

const SEPARATORS: &[char] = &['.', '_', '/', '-'];

/// Parses a date query such as `15.06.2021`, `15.6.21` or `/15_06_2021`.
///
/// Two-digit years are taken as 20yy; three- and four-digit years literally.
/// A first component of four digits switches to year-month-day order.
///
/// # Errors
///
/// Returns `DateError::InvalidFormat` if the input does not have three numeric
/// components or names a date that does not exist.
///
/// # Examples
///
/// ```
/// use daybook::resolve::parse_date_query;
/// use chrono::NaiveDate;
///
/// let expected = NaiveDate::from_ymd_opt(2021, 6, 15).unwrap();
/// assert_eq!(parse_date_query("15.06.2021").unwrap(), expected);
/// assert_eq!(parse_date_query("15.6.21").unwrap(), expected);
/// assert_eq!(parse_date_query("/15_06_2021").unwrap(), expected);
/// assert!(parse_date_query("31.02.2021").is_err());
/// ```
pub fn parse_date_query(input: &str) -> Result<NaiveDate, DateError> {
    let invalid = || DateError::InvalidFormat(input.to_string());

    let trimmed = input.trim();
    let trimmed = trimmed.strip_prefix('/').unwrap_or(trimmed);
    let parts: Vec<&str> = trimmed.split(SEPARATORS).collect();
    if parts.len() != 3
        || parts
            .iter()
            .any(|part| part.is_empty() || !part.chars().all(|c| c.is_ascii_digit()))
    {
        return Err(invalid());
    }

    let (day_str, month_str, year_str) = if parts[0].len() == 4 {
        (parts[2], parts[1], parts[0])
    } else {
        (parts[0], parts[1], parts[2])
    };

    if day_str.len() > 2 || month_str.len() > 2 || !(2..=4).contains(&year_str.len()) {
        return Err(invalid());
    }

    let day: u32 = day_str.parse().map_err(|_| invalid())?;
    let month: u32 = month_str.parse().map_err(|_| invalid())?;
    let mut year: i32 = year_str.parse().map_err(|_| invalid())?;
    if year_str.len() == 2 {
        year += TWO_DIGIT_YEAR_BASE;
    }

    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(invalid)
}

/// Entries on `day`.`month` of any year except `exclude_year`.
///
/// This is the "on this day in history" lookup.
pub fn by_day_month(
    entries: &[DiaryEntry],
    day: u32,
    month: u32,
    exclude_year: i32,
) -> Vec<&DiaryEntry> {
    entries
        .iter()
        .filter(|entry| {
            let date = entry.day();
            date.day() == day && date.month() == month && date.year() != exclude_year
        })
        .collect()
}

/// The entry for exactly `day`.`month`.`year`, if there is one.
pub fn by_exact_date(
    entries: &[DiaryEntry],
    day: u32,
    month: u32,
    year: i32,
) -> Option<&DiaryEntry> {
    entries.iter().find(|entry| {
        let date = entry.day();
        date.day() == day && date.month() == month && date.year() == year
    })
}

/// Entries "on this day" in earlier (or later) years, for a daily reminder.
pub fn on_this_day(entries: &[DiaryEntry], today: NaiveDate) -> Vec<&DiaryEntry> {
    by_day_month(entries, today.day(), today.month(), today.year())
}

/// One "on this day" reminder: an entry from another year and at most one of
/// its photos.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Memory<'a> {
    pub entry: &'a DiaryEntry,
    pub photo: Option<&'a str>,
}

/// Picks one random entry from [`on_this_day`] and one random photo of it.
pub fn memory_of_the_day<'a, R>(
    entries: &'a [DiaryEntry],
    today: NaiveDate,
    rng: &mut R,
) -> Option<Memory<'a>>
where
    R: Rng + ?Sized,
{
    let entry = on_this_day(entries, today).choose(rng).copied()?;
    let photo = entry.images.choose(rng).map(String::as_str);
    Some(Memory { entry, photo })
}

/// A uniformly chosen entry, or `None` for an empty diary.
pub fn random_entry<'a, R>(entries: &'a [DiaryEntry], rng: &mut R) -> Option<&'a DiaryEntry>
where
    R: Rng + ?Sized,
{
    entries.choose(rng)
}

/// The closest entries strictly before and strictly after a date.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbors<'a> {
    pub past: Option<&'a DiaryEntry>,
    pub future: Option<&'a DiaryEntry>,
}

/// Printable labels for [`Neighbors`]: `dd_mm_yyyy` or `"No entry"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NeighborLabels {
    pub past: String,
    pub future: String,
}

impl Neighbors<'_> {
    pub fn labels(&self) -> NeighborLabels {
        NeighborLabels {
            past: label_for(self.past),
            future: label_for(self.future),
        }
    }
}

/// Formats an entry's day the way neighbor labels do.
pub fn entry_label(entry: &DiaryEntry) -> String {
    entry.day().format(NEIGHBOR_LABEL_FORMAT).to_string()
}

fn label_for(entry: Option<&DiaryEntry>) -> String {
    entry
        .map(entry_label)
        .unwrap_or_else(|| NO_ENTRY_LABEL.to_string())
}

/// Finds the closest entry on each side of `date`, comparing calendar days.
///
/// An entry on `date` itself belongs to neither side.
pub fn nearest_entries(date: NaiveDate, entries: &[DiaryEntry]) -> Neighbors<'_> {
    let mut past: Option<&DiaryEntry> = None;
    let mut future: Option<&DiaryEntry> = None;

    for entry in entries {
        let day = entry.day();
        if day < date {
            if past.map_or(true, |best| day > best.day()) {
                past = Some(entry);
            }
        } else if day > date && future.map_or(true, |best| day < best.day()) {
            future = Some(entry);
        }
    }

    Neighbors { past, future }
}

/// Labels of the closest entries before and after `date`.
pub fn nearest_neighbors(date: NaiveDate, entries: &[DiaryEntry]) -> NeighborLabels {
    nearest_entries(date, entries).labels()
}

/// Result of looking up a single date.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution<'a> {
    /// An entry exists for the date.
    Exact {
        entry: &'a DiaryEntry,
        neighbors: NeighborLabels,
    },
    /// No entry for the date; these are the closest ones instead.
    Missing {
        date: NaiveDate,
        neighbors: NeighborLabels,
    },
}

/// Looks up `date`, falling back to its neighbors when there is no entry.
pub fn lookup_date(date: NaiveDate, entries: &[DiaryEntry]) -> Resolution<'_> {
    let neighbors = nearest_neighbors(date, entries);
    match by_exact_date(entries, date.day(), date.month(), date.year()) {
        Some(entry) => Resolution::Exact { entry, neighbors },
        None => Resolution::Missing { date, neighbors },
    }
}

/// Parses `query` and looks it up.
///
/// # Errors
///
/// Returns `DateError::InvalidFormat` if `query` is not a date.
pub fn lookup<'a>(query: &str, entries: &'a [DiaryEntry]) -> Result<Resolution<'a>, DateError> {
    let date = parse_date_query(query)?;
    Ok(lookup_date(date, entries))
}
