//! Weekly report titles.
//!
//! Report pages are titled `"{year} W{week:02} {label} ({MMDD}-{MMDD})"`,
//! e.g. `"2025 W23 技術部 RD4 團隊週報 (0602-0606)"`. The range only carries
//! month and day; its year comes from the leading year token, bumped by one
//! for the end date when the range runs from December into January.

use chrono::{Datelike, Days, NaiveDate, Weekday};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use thiserror::Error;

static RANGE_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\((\d{4})-(\d{4})\)\s*$").expect("valid range regex"));
static LEADING_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})").expect("valid year regex"));

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReportTitleError {
    #[error("no (MMDD-MMDD) date range at the end of report title '{0}'")]
    MissingRange(String),
    #[error("no leading year in report title '{0}'")]
    MissingYear(String),
    #[error("invalid date {year}-{month:02}-{day:02} in report title '{title}'")]
    InvalidDate {
        title: String,
        year: i32,
        month: u32,
        day: u32,
    },
}

/// A Monday-to-Friday reporting period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// The business week starting on `monday`.
    pub fn business_week(monday: NaiveDate) -> Self {
        Self {
            start: monday,
            end: monday + Days::new(4),
        }
    }

    /// Title suffix, e.g. "(1229-0102)".
    pub fn suffix(&self) -> String {
        format!("({}-{})", self.start.format("%m%d"), self.end.format("%m%d"))
    }
}

/// The report that follows a given one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NextReport {
    pub title: String,
    pub range: DateRange,
    /// Calendar year of the new Monday; selects the year folder.
    pub year: i32,
    /// ISO-8601 week of the new Monday.
    pub week: u32,
    /// True when `year` differs from the year the job runs in.
    pub crosses_year: bool,
}

struct ParsedTitle<'a> {
    end: NaiveDate,
    /// Title with the range suffix removed and trimmed.
    remainder: &'a str,
}

fn parse_title(title: &str) -> Result<ParsedTitle<'_>, ReportTitleError> {
    let caps = RANGE_SUFFIX
        .captures(title)
        .ok_or_else(|| ReportTitleError::MissingRange(title.to_string()))?;
    let year: i32 = LEADING_YEAR
        .captures(title)
        .and_then(|c| c[1].parse().ok())
        .ok_or_else(|| ReportTitleError::MissingYear(title.to_string()))?;

    let (start_month, start_day) = split_mmdd(&caps[1]);
    let (end_month, end_day) = split_mmdd(&caps[2]);

    if NaiveDate::from_ymd_opt(year, start_month, start_day).is_none() {
        return Err(ReportTitleError::InvalidDate {
            title: title.to_string(),
            year,
            month: start_month,
            day: start_day,
        });
    }

    let end_year = if end_month == 1 && start_month == 12 {
        year + 1
    } else {
        year
    };
    let end = NaiveDate::from_ymd_opt(end_year, end_month, end_day).ok_or_else(|| {
        ReportTitleError::InvalidDate {
            title: title.to_string(),
            year: end_year,
            month: end_month,
            day: end_day,
        }
    })?;

    let suffix_start = caps.get(0).map_or(title.len(), |m| m.start());
    Ok(ParsedTitle {
        end,
        remainder: title[..suffix_start].trim(),
    })
}

fn split_mmdd(token: &str) -> (u32, u32) {
    // The regex guarantees four ASCII digits.
    let month = token[..2].parse().unwrap_or(0);
    let day = token[2..].parse().unwrap_or(0);
    (month, day)
}

/// End date of the range in a report title.
pub fn report_end_date(title: &str) -> Result<NaiveDate, ReportTitleError> {
    parse_title(title).map(|parsed| parsed.end)
}

/// Compute the title and period of the report after `latest_title`.
pub fn next_report_title(
    latest_title: &str,
    today_year: i32,
) -> Result<NextReport, ReportTitleError> {
    let parsed = parse_title(latest_title)?;

    let mut monday = parsed.end + Days::new(1);
    while monday.weekday() != Weekday::Mon {
        monday = monday + Days::new(1);
    }
    let range = DateRange::business_week(monday);
    let year = monday.year();
    let week = monday.iso_week().week();

    let tokens: Vec<&str> = parsed.remainder.split(' ').collect();
    let prefix = if tokens.len() >= 4 {
        format!("{year} W{week:02} {}", tokens[2..].join(" "))
    } else {
        tracing::warn!(
            title = latest_title,
            "Could not identify year/week/label in report title, keeping it verbatim"
        );
        parsed.remainder.to_string()
    };

    Ok(NextReport {
        title: format!("{prefix} {}", range.suffix()),
        range,
        year,
        week,
        crosses_year: year != today_year,
    })
}
