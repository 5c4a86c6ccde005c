//! Date-part predicates and value normalization.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

use crate::error::{Error, Result};
use crate::value::{Operand, SqlValue};

/// The component of a date/time column a date predicate compares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatePart {
    /// `YYYY-MM-DD`
    Date,
    /// `HH:MM:SS`
    Time,
    /// Day of month, zero-padded.
    Day,
    /// Month of year, zero-padded.
    Month,
    /// Four digit year.
    Year,
}

impl DatePart {
    /// Lowercase name, used for function names and error messages.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Date => "date",
            Self::Time => "time",
            Self::Day => "day",
            Self::Month => "month",
            Self::Year => "year",
        }
    }

    /// Normalizes a comparison value into the canonical form for this part.
    ///
    /// Raw expressions pass through untouched.
    pub(crate) fn normalize(self, value: Operand) -> Result<Operand> {
        let Operand::Value(value) = value else {
            return Ok(value);
        };
        let normalized = match self {
            Self::Date => SqlValue::Text(self.date(&value)?.format("%Y-%m-%d").to_string()),
            Self::Time => SqlValue::Text(self.time(&value)?.format("%H:%M:%S").to_string()),
            Self::Day => {
                let day = match &value {
                    SqlValue::Date(_) | SqlValue::DateTime(_) => i64::from(self.date(&value)?.day()),
                    other => self.number(other)?,
                };
                SqlValue::Text(format!("{:02}", self.in_range(day, 1, 31)?))
            }
            Self::Month => {
                let month = match &value {
                    SqlValue::Date(_) | SqlValue::DateTime(_) => {
                        i64::from(self.date(&value)?.month())
                    }
                    other => self.number(other)?,
                };
                SqlValue::Text(format!("{:02}", self.in_range(month, 1, 12)?))
            }
            Self::Year => match &value {
                SqlValue::Date(_) | SqlValue::DateTime(_) => {
                    SqlValue::Int(i64::from(self.date(&value)?.year()))
                }
                other => SqlValue::Int(self.number(other)?),
            },
        };
        Ok(Operand::Value(normalized))
    }

    fn date(self, value: &SqlValue) -> Result<NaiveDate> {
        match value {
            SqlValue::Date(d) => Ok(*d),
            SqlValue::DateTime(dt) => Ok(dt.date()),
            SqlValue::Text(s) => parse_date_time(s)
                .map(|dt| dt.date())
                .or_else(|| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok())
                .ok_or_else(|| self.invalid(value)),
            _ => Err(self.invalid(value)),
        }
    }

    fn time(self, value: &SqlValue) -> Result<NaiveTime> {
        match value {
            SqlValue::DateTime(dt) => Ok(dt.time()),
            SqlValue::Text(s) => {
                let s = s.trim();
                NaiveTime::parse_from_str(s, "%H:%M:%S")
                    .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
                    .ok()
                    .or_else(|| parse_date_time(s).map(|dt| dt.time()))
                    .map(|t| t.with_nanosecond(0).unwrap_or(t))
                    .ok_or_else(|| self.invalid(value))
            }
            _ => Err(self.invalid(value)),
        }
    }

    fn number(self, value: &SqlValue) -> Result<i64> {
        match value {
            SqlValue::Int(n) => Ok(*n),
            SqlValue::Text(s) => s.trim().parse().map_err(|_| self.invalid(value)),
            _ => Err(self.invalid(value)),
        }
    }

    fn in_range(self, n: i64, low: i64, high: i64) -> Result<i64> {
        if (low..=high).contains(&n) {
            Ok(n)
        } else {
            Err(Error::construction(
                "date predicate",
                format!("{n} is not a valid {}", self.name()),
            ))
        }
    }

    fn invalid(self, value: &SqlValue) -> Error {
        Error::construction(
            "date predicate",
            format!("cannot read a {} from {value:?}", self.name()),
        )
    }
}

fn parse_date_time(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S"))
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.naive_local()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(part: DatePart, value: impl Into<Operand>) -> SqlValue {
        match part.normalize(value.into()).unwrap() {
            Operand::Value(v) => v,
            Operand::Raw(_) => panic!("expected a value"),
        }
    }

    #[test]
    fn test_date_is_normalized_from_datetime_text() {
        assert_eq!(
            text(DatePart::Date, "2024-03-07 10:11:12"),
            SqlValue::Text("2024-03-07".into())
        );
        assert_eq!(
            text(DatePart::Date, NaiveDate::from_ymd_opt(2024, 1, 5).unwrap()),
            SqlValue::Text("2024-01-05".into())
        );
    }

    #[test]
    fn test_day_and_month_are_zero_padded() {
        assert_eq!(text(DatePart::Day, 5), SqlValue::Text("05".into()));
        assert_eq!(text(DatePart::Month, "3"), SqlValue::Text("03".into()));
        assert_eq!(text(DatePart::Year, "2021"), SqlValue::Int(2021));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(DatePart::Month.normalize(13.into()).is_err());
        assert!(DatePart::Date.normalize("yesterday".into()).is_err());
        assert!(DatePart::Time.normalize(true.into()).is_err());
    }
}
