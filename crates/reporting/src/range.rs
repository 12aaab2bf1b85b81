//! Inclusive calendar date ranges.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ReportError, Result};

/// A range of calendar days in UTC. Both ends are inclusive and optional.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl DateRange {
    /// A range covering every order.
    pub fn all() -> Self {
        Self::default()
    }

    /// Builds a range, rejecting an end before the start.
    pub fn new(start_date: Option<NaiveDate>, end_date: Option<NaiveDate>) -> Result<Self> {
        if let (Some(start), Some(end)) = (start_date, end_date) {
            if end < start {
                return Err(ReportError::InvalidRange(format!(
                    "end_date {end} is before start_date {start}"
                )));
            }
        }
        Ok(Self {
            start_date,
            end_date,
        })
    }

    /// Parses ISO dates (`YYYY-MM-DD`).
    pub fn parse(start_date: Option<&str>, end_date: Option<&str>) -> Result<Self> {
        Self::new(parse_date(start_date)?, parse_date(end_date)?)
    }

    /// Returns true if the instant falls on a day inside the range.
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        let day = instant.date_naive();
        self.start_date.is_none_or(|start| day >= start)
            && self.end_date.is_none_or(|end| day <= end)
    }
}

fn parse_date(value: Option<&str>) -> Result<Option<NaiveDate>> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) => NaiveDate::parse_from_str(v, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| ReportError::InvalidRange(format!("{v:?} is not a YYYY-MM-DD date"))),
    }
}
