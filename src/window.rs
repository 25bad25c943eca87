//! Inclusive date windows over the GH Archive daily shards.
//!
//! The archive stores one table per day named `YYYYMMDD`. Queries address them
//! through the wildcard `githubarchive.day.20*`, so `_TABLE_SUFFIX` is the
//! remaining six digits `YYMMDD`. Both pipelines derive their shard bounds here.

use std::sync::OnceLock;

use chrono::{Datelike, Days, NaiveDate};
use regex::Regex;

use crate::error::{ExtractError, Result};

/// Century digits baked into the wildcard table name.
pub const SHARD_CENTURY_PREFIX: &str = "20";

/// Pattern every `_TABLE_SUFFIX` must match to be a daily shard.
///
/// The same text is embedded in the generated SQL.
pub const SHARD_SUFFIX_PATTERN: &str = r"^\d{6}$";

/// Years addressable through [`SHARD_CENTURY_PREFIX`].
const CENTURY_YEARS: std::ops::RangeInclusive<i32> = 2000..=2099;

fn shard_suffix_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(SHARD_SUFFIX_PATTERN).expect("shard suffix pattern is valid"))
}

/// Returns true if `suffix` has the shape of a daily shard suffix.
pub fn is_shard_suffix(suffix: &str) -> bool {
    shard_suffix_regex().is_match(suffix)
}

/// Formats `date` as a six-digit shard suffix (`YYMMDD`).
///
/// Returns `None` when the date lies outside the century covered by the
/// wildcard prefix.
pub fn shard_suffix(date: NaiveDate) -> Option<String> {
    if !CENTURY_YEARS.contains(&date.year()) {
        return None;
    }

    let full = date.format("%Y%m%d").to_string();
    full.strip_prefix(SHARD_CENTURY_PREFIX)
        .map(str::to_string)
        .filter(|s| is_shard_suffix(s))
}

/// An inclusive range of calendar days `[end - (days - 1), end]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateWindow {
    start: NaiveDate,
    end: NaiveDate,
    start_suffix: String,
    end_suffix: String,
}

impl DateWindow {
    /// Builds the window of `days` calendar days ending on `end` (inclusive).
    pub fn ending_at(end: NaiveDate, days: u32) -> Result<Self> {
        if days == 0 {
            return Err(ExtractError::config(
                "window length must be at least 1 day, got 0",
            ));
        }

        let start = end
            .checked_sub_days(Days::new(u64::from(days - 1)))
            .ok_or_else(|| {
                ExtractError::config(format!("a {days}-day window ending {end} underflows"))
            })?;

        let start_suffix = shard_suffix(start).ok_or_else(|| out_of_century(start))?;
        let end_suffix = shard_suffix(end).ok_or_else(|| out_of_century(end))?;

        Ok(Self {
            start,
            end,
            start_suffix,
            end_suffix,
        })
    }

    /// First day of the window.
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// Last day of the window (inclusive).
    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Shard suffix of the first day.
    pub fn start_suffix(&self) -> &str {
        &self.start_suffix
    }

    /// Shard suffix of the last day.
    pub fn end_suffix(&self) -> &str {
        &self.end_suffix
    }

    /// Number of calendar days covered.
    pub fn len_days(&self) -> u32 {
        // Bounded by the u32 length the window was built from.
        (self.end - self.start).num_days() as u32 + 1
    }

    /// Iterates the calendar days in the window, oldest first.
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.start.iter_days().take(self.len_days() as usize)
    }
}

fn out_of_century(date: NaiveDate) -> ExtractError {
    ExtractError::config(format!(
        "{date} is outside the {}00s shard range ({}-{})",
        SHARD_CENTURY_PREFIX,
        CENTURY_YEARS.start(),
        CENTURY_YEARS.end()
    ))
}
