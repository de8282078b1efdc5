//! Date extraction from file names.

use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use std::ops::Range;

/// Outcome of matching a file name against the date patterns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilenameMatch {
    /// No pattern matched at all
    NoMatch,
    /// A pattern matched and produced a real calendar date
    Valid(NaiveDateTime),
    /// Something date-like matched but none of it was a real date
    Rejected,
}

impl FilenameMatch {
    pub fn date(&self) -> Option<NaiveDateTime> {
        match self {
            FilenameMatch::Valid(date) => Some(*date),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum FieldOrder {
    YearMonthDay,
    DayMonthYear,
    YearMonth,
}

#[derive(Debug)]
struct DatePattern {
    regex: Regex,
    order: FieldOrder,
}

/// Maximum day per month; February allows 29 regardless of year
const DAYS_IN_MONTH: [u32; 12] = [31, 29, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

/// Matches dates embedded in file names.
///
/// Patterns are tried in priority order and only the first occurrence of each
/// is considered. A match that is not a real date marks its byte span as
/// poisoned, so a shorter pattern cannot later salvage part of it: in
/// `2005035416` the invalid `2005-03-54` must not degrade to `2005-03`.
#[derive(Debug)]
pub struct FilenameDateParser {
    patterns: Vec<DatePattern>,
}

impl FilenameDateParser {
    pub fn new() -> Self {
        let specs = [
            (r"(\d{4})-(\d{2})-(\d{2})", FieldOrder::YearMonthDay),
            (r"(\d{4})(\d{2})(\d{2})", FieldOrder::YearMonthDay),
            (r"(\d{2})\.(\d{2})\.(\d{4})", FieldOrder::DayMonthYear),
            (r"(\d{2})-(\d{2})-(\d{4})", FieldOrder::DayMonthYear),
            (r"IMG_(\d{4})(\d{2})(\d{2})", FieldOrder::YearMonthDay),
            (r"(\d{4})-(\d{2})", FieldOrder::YearMonth),
            (r"(\d{4})(\d{2})", FieldOrder::YearMonth),
        ];

        let patterns = specs
            .into_iter()
            .map(|(pattern, order)| DatePattern {
                regex: Regex::new(pattern).expect("date patterns are valid regexes"),
                order,
            })
            .collect();

        Self { patterns }
    }

    /// Look for a date in `name`, which must be a bare file name.
    pub fn parse(&self, name: &str) -> FilenameMatch {
        let mut rejected: Vec<Range<usize>> = Vec::new();

        for pattern in &self.patterns {
            let Some(caps) = pattern.regex.captures(name) else {
                continue;
            };
            let Some(whole) = caps.get(0) else {
                continue;
            };
            let span = whole.range();

            if rejected
                .iter()
                .any(|bad| span.start < bad.end && bad.start < span.end)
            {
                tracing::trace!(name, pattern = pattern.regex.as_str(), "Overlaps a rejected match");
                continue;
            }

            let field = |i: usize| {
                caps.get(i)
                    .and_then(|m| m.as_str().parse::<u32>().ok())
                    .unwrap_or(0)
            };
            let (year, month, day) = match pattern.order {
                FieldOrder::YearMonthDay => (field(1), field(2), field(3)),
                FieldOrder::DayMonthYear => (field(3), field(2), field(1)),
                FieldOrder::YearMonth => (field(1), field(2), 1),
            };

            match build_date(year, month, day) {
                Some(date) => return FilenameMatch::Valid(date),
                None => {
                    tracing::debug!(name, year, month, day, "Rejected date-like file name part");
                    rejected.push(span);
                }
            }
        }

        if rejected.is_empty() {
            FilenameMatch::NoMatch
        } else {
            FilenameMatch::Rejected
        }
    }
}

impl Default for FilenameDateParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Range-check the components, then let chrono decide whether the day exists
fn build_date(year: u32, month: u32, day: u32) -> Option<NaiveDateTime> {
    if !(1900..=2100).contains(&year) || !(1..=12).contains(&month) {
        return None;
    }
    if day < 1 || day > DAYS_IN_MONTH[month as usize - 1] {
        return None;
    }
    NaiveDate::from_ymd_opt(year as i32, month, day)?.and_hms_opt(0, 0, 0)
}
