//! Month-name date parsing and year resolution for sources that omit the year.
//!
//! Month names come from an explicit [`MonthNames`] table handed to the parser,
//! never from a process-wide locale.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::RecordError;

/// Full and abbreviated month names, January first, lower case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthNames {
    pub full: [String; 12],
    pub abbreviated: [String; 12],
}

impl MonthNames {
    pub fn dutch() -> Self {
        Self::from_tables(
            [
                "januari", "februari", "maart", "april", "mei", "juni", "juli", "augustus",
                "september", "oktober", "november", "december",
            ],
            [
                "jan", "feb", "mrt", "apr", "mei", "jun", "jul", "aug", "sep", "okt", "nov", "dec",
            ],
        )
    }

    fn from_tables(full: [&str; 12], abbreviated: [&str; 12]) -> Self {
        MonthNames {
            full: full.map(str::to_string),
            abbreviated: abbreviated.map(str::to_string),
        }
    }

    /// Month number (1-based) for a full or abbreviated name, case-insensitive.
    pub fn month(&self, name: &str) -> Option<u32> {
        let name = name.to_lowercase();
        self.full
            .iter()
            .position(|m| *m == name)
            .or_else(|| self.abbreviated.iter().position(|m| *m == name))
            .map(|i| i as u32 + 1)
    }

    /// Parses `17 september 2019`.
    pub fn parse_long_date(&self, s: &str) -> Result<NaiveDate, RecordError> {
        let bad = || RecordError::Date(s.to_string());
        let mut parts = s.split_whitespace();
        let (Some(day), Some(month), Some(year), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(bad());
        };
        let day: u32 = day.parse().map_err(|_| bad())?;
        let month = self.month(month).ok_or_else(bad)?;
        let year: i32 = year.parse().map_err(|_| bad())?;
        NaiveDate::from_ymd_opt(year, month, day).ok_or_else(bad)
    }

    /// Parses `05 mei` into (day, month) without a year.
    pub fn parse_day_month(&self, s: &str) -> Result<(u32, u32), RecordError> {
        let bad = || RecordError::Date(s.to_string());
        let mut parts = s.split_whitespace();
        let (Some(day), Some(month), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(bad());
        };
        let day: u32 = day.parse().map_err(|_| bad())?;
        let month = self.month(month).ok_or_else(bad)?;
        // 2000 is a leap year, so this accepts 29 feb
        NaiveDate::from_ymd_opt(2000, month, day).ok_or_else(bad)?;
        Ok((day, month))
    }
}

impl Default for MonthNames {
    fn default() -> Self {
        Self::dutch()
    }
}

/// The given day and month in `year`; 29 February becomes 1 March when `year` has none.
pub fn in_year(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day).or_else(|| {
        if month == 2 && day == 29 {
            NaiveDate::from_ymd_opt(year, 3, 1)
        } else {
            None
        }
    })
}

/// The latest occurrence of day/month that is not after `anchor`.
pub fn on_or_before(anchor: NaiveDate, month: u32, day: u32) -> Result<NaiveDate, RecordError> {
    let bad = || RecordError::Date(format!("{day:02}-{month:02}"));
    let mut year = anchor.year();
    let mut guess = in_year(year, month, day).ok_or_else(bad)?;
    while guess > anchor {
        year -= 1;
        guess = in_year(year, month, day).ok_or_else(bad)?;
    }
    Ok(guess)
}

/// `MMDD` placed in the year that brings it closest to `near` (booking dates around a value date).
pub fn month_day_near(near: NaiveDate, mmdd: &str) -> Result<NaiveDate, RecordError> {
    let bad = || RecordError::Date(mmdd.to_string());
    if mmdd.len() != 4 || !mmdd.bytes().all(|b| b.is_ascii_digit()) {
        return Err(bad());
    }
    let month: u32 = mmdd[0..2].parse().map_err(|_| bad())?;
    let day: u32 = mmdd[2..4].parse().map_err(|_| bad())?;
    (near.year() - 1..=near.year() + 1)
        .filter_map(|y| in_year(y, month, day))
        .min_by_key(|d| (*d - near).num_days().abs())
        .ok_or_else(bad)
}
