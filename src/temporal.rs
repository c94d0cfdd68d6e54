//! Weekday × hour-of-day trip counts for the temporal heatmap.

use chrono::Weekday;
use serde::Serialize;

use crate::record::Record;

pub const DAYS: usize = 7;
pub const HOURS: usize = 24;

/// Weekday names as they appear in the cleaned dataset.
static WEEKDAY_NAMES: &[(&str, Weekday)] = &[
    ("Sunday", Weekday::Sun),
    ("Monday", Weekday::Mon),
    ("Tuesday", Weekday::Tue),
    ("Wednesday", Weekday::Wed),
    ("Thursday", Weekday::Thu),
    ("Friday", Weekday::Fri),
    ("Saturday", Weekday::Sat),
];

/// Short row labels in matrix order (Sunday first).
pub static DAY_LABELS: [&str; DAYS] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

/// Which record fields carry the weekday name and hour of day.
#[derive(Debug, Clone, Copy)]
pub struct TemporalFields<'a> {
    pub day: &'a str,
    pub hour: &'a str,
}

impl Default for TemporalFields<'_> {
    fn default() -> Self {
        Self {
            day: "day",
            hour: "start_hour",
        }
    }
}

/// Trip counts indexed by `[weekday][hour]`, weekday 0 = Sunday.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TemporalMatrix {
    counts: [[u64; HOURS]; DAYS],
}

impl TemporalMatrix {
    /// Counts every record with a known weekday name and an hour in `0..=23`.
    /// Anything else is skipped.
    pub fn from_records(records: &[Record], fields: TemporalFields<'_>) -> Self {
        let mut matrix = Self::default();

        for record in records {
            let Some(day) = record.get(fields.day).and_then(weekday_index) else {
                continue;
            };
            let Some(hour) = record.get(fields.hour).and_then(parse_hour) else {
                continue;
            };
            matrix.counts[day][hour] += 1;
        }

        matrix
    }

    pub fn get(&self, weekday: Weekday, hour: usize) -> Option<u64> {
        self.counts
            .get(weekday.num_days_from_sunday() as usize)?
            .get(hour)
            .copied()
    }

    pub fn rows(&self) -> &[[u64; HOURS]; DAYS] {
        &self.counts
    }

    /// Sum of all cells, i.e. the number of records that were counted.
    pub fn total(&self) -> u64 {
        self.counts.iter().flatten().sum()
    }
}

/// Resolves an exact weekday name to its Sunday-based index.
pub fn weekday_index(name: &str) -> Option<usize> {
    WEEKDAY_NAMES
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, d)| d.num_days_from_sunday() as usize)
}

/// Parses an hour-of-day. Accepts integral numeric text such as `"5"`,
/// `" 5 "` or `"5.0"`; rejects blanks, fractions and anything outside 0..=23.
/// A blank cell is a missing hour, not hour 0, so those rows are not counted.
pub fn parse_hour(raw: &str) -> Option<usize> {
    let value: f64 = raw.trim().parse().ok()?;
    if !value.is_finite() || value.fract() != 0.0 || !(0.0..=23.0).contains(&value) {
        return None;
    }
    Some(value as usize)
}

/// Column labels `"0:00"` through `"23:00"`.
pub fn hour_labels() -> Vec<String> {
    (0..HOURS).map(|h| format!("{h}:00")).collect()
}
