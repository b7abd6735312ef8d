//! Five-field cron expressions.
//!
//! The `cron` crate works on seven fields with a leading seconds column and
//! numbers weekdays 1-7 from Sunday. Definitions use classic five-field crontab
//! syntax with Sunday as 0 or 7, so expressions are translated before parsing:
//! a `0` seconds column is prepended and numeric weekdays become names.
//!
//! Expressions are read as local wall-clock time, like crontab: `0 3 * * *`
//! fires at 03:00 in the host's timezone.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Local, TimeZone, Utc};
use cron::Schedule as CronSchedule;

use crate::error::CronError;

const DAY_NAMES: [&str; 7] = ["SUN", "MON", "TUE", "WED", "THU", "FRI", "SAT"];

/// A validated cron trigger.
#[derive(Clone)]
pub struct CronExpr {
    source: String,
    schedule: CronSchedule,
}

impl CronExpr {
    /// Parse a five-field expression (`min hour dom month dow`) or an
    /// `@hourly`-style shorthand.
    pub fn parse(expression: &str) -> Result<Self, CronError> {
        let source = expression.trim();
        if source.is_empty() {
            return Err(CronError::Empty);
        }

        let translated = if source.starts_with('@') {
            source.to_string()
        } else {
            to_cron_crate_syntax(source)?
        };

        let schedule =
            CronSchedule::from_str(&translated).map_err(|e| CronError::Parse(e.to_string()))?;

        Ok(Self {
            source: source.to_string(),
            schedule,
        })
    }

    /// The expression as written in the definition.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// First fire instant strictly after `after`, reading the expression in
    /// the host's local timezone.
    pub fn next_after(&self, after: &DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.next_after_in(after, &Local)
    }

    /// First fire instant strictly after `after`, reading the expression as
    /// wall-clock time in `zone`.
    pub fn next_after_in<Tz: TimeZone>(&self, after: &DateTime<Utc>, zone: &Tz) -> Option<DateTime<Utc>> {
        self.schedule
            .after(&after.with_timezone(zone))
            .next()
            .map(|next| next.with_timezone(&Utc))
    }
}

impl fmt::Debug for CronExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CronExpr").field(&self.source).finish()
    }
}

impl fmt::Display for CronExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl FromStr for CronExpr {
    type Err = CronError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn to_cron_crate_syntax(expression: &str) -> Result<String, CronError> {
    let fields: Vec<&str> = expression.split_whitespace().collect();
    let [minute, hour, day_of_month, month, day_of_week] = fields.as_slice() else {
        return Err(CronError::FieldCount(fields.len()));
    };

    Ok(format!(
        "0 {minute} {hour} {day_of_month} {month} {}",
        normalize_day_of_week(day_of_week)
    ))
}

/// Rewrite numeric weekday items as day names, leaving `*` steps and names alone.
pub(crate) fn normalize_day_of_week(field: &str) -> String {
    field
        .split(',')
        .map(normalize_day_item)
        .collect::<Vec<_>>()
        .join(",")
}

fn normalize_day_item(item: &str) -> String {
    let (range, step) = match item.split_once('/') {
        Some((range, step)) => (range, Some(step)),
        None => (item, None),
    };

    // `*/n` lines up on both numberings
    if range == "*" {
        return item.to_string();
    }

    let bounds = match range.split_once('-') {
        Some((lo, hi)) => (lo.parse::<usize>().ok(), hi.parse::<usize>().ok()),
        None => {
            // `n/step` runs to the end of the week, and 7 is Sunday again
            let start = range.parse::<usize>().ok();
            (start, if step.is_some() { Some(7) } else { start })
        }
    };
    let step = match step.map(str::parse::<usize>) {
        None => 1,
        Some(Ok(step)) if step > 0 => step,
        // malformed step: leave it for the cron parser to reject
        Some(_) => return item.to_string(),
    };

    match bounds {
        (Some(lo), Some(hi)) if lo <= hi && hi <= 7 => {
            let days: BTreeSet<usize> = (lo..=hi).step_by(step).map(|day| day % 7).collect();
            days.into_iter()
                .map(|day| DAY_NAMES[day])
                .collect::<Vec<_>>()
                .join(",")
        }
        _ => item.to_string(),
    }
}

#[cfg(test)]
#[path = "cron_expr_tests.rs"]
mod tests;
