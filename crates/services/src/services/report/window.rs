use chrono::{DateTime, Datelike, Days, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::services::error::{DomainError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Timeframe {
    /// `[start, start + 6 days]`.
    Week,
    /// The whole calendar month containing `start`.
    Month,
}

/// Inclusive range of calendar days, evaluated in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if end < start {
            return Err(DomainError::validation("end date must not be before start date"));
        }
        Ok(Self { start, end })
    }

    pub fn for_timeframe(timeframe: Timeframe, start: NaiveDate) -> Result<Self> {
        match timeframe {
            Timeframe::Week => {
                let end = start
                    .checked_add_days(Days::new(6))
                    .ok_or_else(|| DomainError::validation("start date is out of range"))?;
                Self::new(start, end)
            }
            Timeframe::Month => {
                let first = start.with_day(1).unwrap_or(start);
                let next_month = if first.month() == 12 {
                    NaiveDate::from_ymd_opt(first.year() + 1, 1, 1)
                } else {
                    NaiveDate::from_ymd_opt(first.year(), first.month() + 1, 1)
                };
                let last = next_month
                    .and_then(|date| date.pred_opt())
                    .ok_or_else(|| DomainError::validation("start date is out of range"))?;
                Self::new(first, last)
            }
        }
    }

    /// A timeframe wins over an explicit end date; without one both bounds are
    /// required.
    pub fn resolve(
        timeframe: Option<Timeframe>,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Self> {
        let start = start.ok_or_else(|| DomainError::validation("start date is required"))?;
        match (timeframe, end) {
            (Some(timeframe), _) => Self::for_timeframe(timeframe, start),
            (None, Some(end)) => Self::new(start, end),
            (None, None) => Err(DomainError::validation(
                "either an end date or a timeframe is required",
            )),
        }
    }

    pub fn start_instant(&self) -> DateTime<Utc> {
        self.start.and_time(NaiveTime::default()).and_utc()
    }

    /// Last representable instant of the end day.
    pub fn end_instant(&self) -> DateTime<Utc> {
        let end_of_day =
            NaiveTime::from_hms_nano_opt(23, 59, 59, 999_999_999).unwrap_or_default();
        self.end.and_time(end_of_day).and_utc()
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start_instant() && instant <= self.end_instant()
    }
}
