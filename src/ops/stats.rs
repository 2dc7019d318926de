//! Summary statistics over the whole diary.

use crate::diary::DiaryEntry;
use chrono::{Datelike, Month, Weekday};
use std::fmt;

const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

const MONTHS: [Month; 12] = [
    Month::January,
    Month::February,
    Month::March,
    Month::April,
    Month::May,
    Month::June,
    Month::July,
    Month::August,
    Month::September,
    Month::October,
    Month::November,
    Month::December,
];

/// Counts and frequencies derived from the diary.
#[derive(Debug, Clone, PartialEq)]
pub struct DiaryStats {
    pub entries: usize,
    /// Whitespace-separated tokens across all entry texts.
    pub words: usize,
    /// Words per entry, rounded to two decimals; 0.0 for an empty diary.
    pub mean_words: f64,
    /// Entry counts from Monday to Sunday.
    pub by_weekday: Vec<(&'static str, usize)>,
    /// Entry counts from January to December.
    pub by_month: Vec<(&'static str, usize)>,
}

fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// Computes [`DiaryStats`] for a table.
pub fn summarize(entries: &[DiaryEntry]) -> DiaryStats {
    let words: usize = entries.iter().map(DiaryEntry::word_count).sum();
    let mean_words = if entries.is_empty() {
        0.0
    } else {
        (words as f64 / entries.len() as f64 * 100.0).round() / 100.0
    };

    let mut weekday_counts = [0usize; 7];
    let mut month_counts = [0usize; 12];
    for entry in entries {
        let day = entry.day();
        weekday_counts[day.weekday().num_days_from_monday() as usize] += 1;
        month_counts[day.month0() as usize] += 1;
    }

    DiaryStats {
        entries: entries.len(),
        words,
        mean_words,
        by_weekday: WEEKDAYS
            .iter()
            .map(|w| (weekday_name(*w), weekday_counts[w.num_days_from_monday() as usize]))
            .collect(),
        by_month: MONTHS
            .iter()
            .map(|m| (m.name(), month_counts[m.number_from_month() as usize - 1]))
            .collect(),
    }
}

impl fmt::Display for DiaryStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Stats:")?;
        writeln!(f)?;
        writeln!(f, "Number of entries: {}", self.entries)?;
        writeln!(f, "Number of words: {}", self.words)?;
        writeln!(f, "Mean words per entry: {}", self.mean_words)?;
        writeln!(f)?;
        writeln!(f, "Entries per weekday:")?;
        for (name, count) in &self.by_weekday {
            writeln!(f, "  {:<10} {}", name, count)?;
        }
        writeln!(f)?;
        writeln!(f, "Entries per month:")?;
        for (name, count) in &self.by_month {
            writeln!(f, "  {:<10} {}", name, count)?;
        }
        Ok(())
    }
}
