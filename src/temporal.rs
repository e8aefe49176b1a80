// Monthly and hour-of-day crash counts.

use crate::error::ParseError;
use crate::types::{CrashRecord, Dataset, HourlyCountRow, MonthlyCountRow};
use crate::util::{parse_crash_date, parse_crash_time};
use chrono::{Datelike, Months, NaiveDate, Timelike};
use std::collections::BTreeMap;

/// What to do with a date or time cell that does not parse.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ParsePolicy {
    /// Stop the run with a `ParseError`.
    #[default]
    Abort,
    /// Drop the row, log a warning and keep going.
    Skip,
}

/// Ordered `(bucket, count)` points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemporalSeries<B> {
    pub points: Vec<(B, usize)>,
    /// Rows dropped under `ParsePolicy::Skip`.
    pub skipped: usize,
}

impl TemporalSeries<NaiveDate> {
    pub fn rows(&self) -> Vec<MonthlyCountRow> {
        self.points
            .iter()
            .map(|(month, crashes)| MonthlyCountRow {
                month: month.format("%Y-%m").to_string(),
                crashes: *crashes,
            })
            .collect()
    }
}

impl TemporalSeries<u32> {
    pub fn rows(&self) -> Vec<HourlyCountRow> {
        self.points
            .iter()
            .map(|(hour, crashes)| HourlyCountRow {
                hour: hour_label(*hour),
                crashes: *crashes,
            })
            .collect()
    }

    /// Busiest hour, earliest on ties.
    pub fn peak(&self) -> Option<u32> {
        self.points
            .iter()
            .filter(|(_, count)| *count > 0)
            .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(&a.0)))
            .map(|(hour, _)| *hour)
    }
}

pub fn hour_label(hour: u32) -> String {
    format!("{hour}:00")
}

/// Crashes per calendar month, keyed by the first day of the month.
///
/// Months between the first and last observed month are always present (zero
/// when nothing happened). The last month is dropped unless the latest crash
/// date is that month's final day, since the export stops mid-month.
pub fn monthly_counts(
    data: &Dataset,
    policy: ParsePolicy,
) -> Result<TemporalSeries<NaiveDate>, ParseError> {
    let (dates, skipped) = parse_column(
        data,
        policy,
        |r| r.crash_date.as_deref(),
        parse_crash_date,
        |id, value| ParseError::Date { id, value },
    )?;

    let mut buckets: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    for date in &dates {
        *buckets.entry(month_start(*date)).or_insert(0) += 1;
    }
    let (Some(&first), Some(&last), Some(&max_date)) =
        (buckets.keys().next(), buckets.keys().next_back(), dates.iter().max())
    else {
        return Ok(TemporalSeries {
            points: Vec::new(),
            skipped,
        });
    };

    let mut points = Vec::new();
    let mut month = Some(first);
    while let Some(current) = month.filter(|m| *m <= last) {
        points.push((current, buckets.get(&current).copied().unwrap_or(0)));
        month = current.checked_add_months(Months::new(1));
    }
    if !is_month_end(max_date) {
        if let Some((dropped, count)) = points.pop() {
            log::debug!("dropping incomplete month {dropped} ({count} crashes)");
        }
    }

    Ok(TemporalSeries { points, skipped })
}

/// Crashes per hour of day over the whole dataset; always 24 points.
pub fn hourly_counts(
    data: &Dataset,
    policy: ParsePolicy,
) -> Result<TemporalSeries<u32>, ParseError> {
    let (times, skipped) = parse_column(
        data,
        policy,
        |r| r.crash_time.as_deref(),
        parse_crash_time,
        |id, value| ParseError::Time { id, value },
    )?;

    let mut buckets = [0usize; 24];
    for time in times {
        buckets[time.hour() as usize] += 1;
    }
    let points = (0u32..24).zip(buckets).collect();
    Ok(TemporalSeries { points, skipped })
}

/// Parse one text column of every identified record. Blank cells are
/// ignored; unparseable cells follow `policy`.
fn parse_column<'a, T>(
    data: &'a Dataset,
    policy: ParsePolicy,
    field: impl Fn(&'a CrashRecord) -> Option<&'a str>,
    parse: impl Fn(&str) -> Option<T>,
    error: impl Fn(String, String) -> ParseError,
) -> Result<(Vec<T>, usize), ParseError> {
    let mut values = Vec::with_capacity(data.len());
    let mut skipped = 0usize;
    for (id, record) in data.identified() {
        let Some(raw) = field(record) else {
            continue;
        };
        match parse(raw) {
            Some(value) => values.push(value),
            None => {
                let err = error(id.to_string(), raw.to_string());
                match policy {
                    ParsePolicy::Abort => return Err(err),
                    ParsePolicy::Skip => {
                        log::warn!("skipping row: {err}");
                        skipped += 1;
                    }
                }
            }
        }
    }
    Ok((values, skipped))
}

fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

fn is_month_end(date: NaiveDate) -> bool {
    date.succ_opt().map_or(true, |next| next.day() == 1)
}
