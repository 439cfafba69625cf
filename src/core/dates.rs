//! Single-date checks and the year correction rule.
//!
//! Every function here takes a `dd/mm/yyyy` string. A string that does not
//! split into exactly three numeric `/`-separated tokens is a
//! [`EtlError::DateFormatError`]; nothing in this module substitutes a default.

use crate::domain::model::{Record, END_DATE, START_DATE};
use crate::utils::error::{EtlError, Result};
use chrono::NaiveDate;

pub const DEFAULT_CUTOFF_YEAR: i32 = 2023;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateParts<'a> {
    pub day: i64,
    pub month: i64,
    pub year: i64,
    day_token: &'a str,
    month_token: &'a str,
}

impl<'a> DateParts<'a> {
    pub fn parse(date: &'a str) -> Result<Self> {
        let tokens: Vec<&str> = date.split('/').collect();
        let &[day_token, month_token, year_token] = tokens.as_slice() else {
            return Err(EtlError::date_format(
                date,
                format!("expected 3 '/'-separated parts, found {}", tokens.len()),
            ));
        };

        let number = |token: &str, part: &str| {
            parse_integer(token)
                .ok_or_else(|| EtlError::date_format(date, format!("{} '{}' is not a number", part, token)))
        };

        Ok(Self {
            day: number(day_token, "day")?,
            month: number(month_token, "month")?,
            year: number(year_token, "year")?,
            day_token,
            month_token,
        })
    }

    pub fn to_calendar_date(&self) -> Option<NaiveDate> {
        let year = i32::try_from(self.year).ok()?;
        let month = u32::try_from(self.month).ok()?;
        let day = u32::try_from(self.day).ok()?;
        NaiveDate::from_ymd_opt(year, month, day)
    }
}

/// An optionally signed run of ASCII digits. Values past the `i64` range
/// saturate, so an oversized token is still a number, just never a valid one.
fn parse_integer(token: &str) -> Option<i64> {
    let token = token.trim();
    let (negative, digits) = match token.as_bytes().first()? {
        b'-' => (true, &token[1..]),
        b'+' => (false, &token[1..]),
        _ => (false, token),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(match digits.parse::<i64>() {
        Ok(n) if negative => -n,
        Ok(n) => n,
        Err(_) if negative => i64::MIN,
        Err(_) => i64::MAX,
    })
}

/// Applies the year correction rule against a configurable cutoff.
///
/// Historical mis-entries are assumed to belong to the current cleaning cycle,
/// so any year before the cutoff is rewritten to the cutoff year itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateNormalizer {
    cutoff_year: i32,
}

impl Default for DateNormalizer {
    fn default() -> Self {
        Self::new(DEFAULT_CUTOFF_YEAR)
    }
}

impl DateNormalizer {
    pub fn new(cutoff_year: i32) -> Self {
        Self { cutoff_year }
    }

    pub fn cutoff_year(&self) -> i32 {
        self.cutoff_year
    }

    pub fn is_before_cutoff(&self, date: &str) -> Result<bool> {
        Ok(DateParts::parse(date)?.year < i64::from(self.cutoff_year))
    }

    /// Day and month tokens are kept exactly as written.
    pub fn correct_year(&self, date: &str) -> Result<String> {
        let parts = DateParts::parse(date)?;
        if parts.year < i64::from(self.cutoff_year) {
            Ok(format!("{}/{}/{}", parts.day_token, parts.month_token, self.cutoff_year))
        } else {
            Ok(date.to_string())
        }
    }
}

pub fn is_pre_2023(date: &str) -> Result<bool> {
    DateNormalizer::default().is_before_cutoff(date)
}

pub fn correct_year(date: &str) -> Result<String> {
    DateNormalizer::default().correct_year(date)
}

/// Range check only: `31/02/2023` passes.
pub fn is_valid_day_month(date: &str) -> Result<bool> {
    let parts = DateParts::parse(date)?;
    Ok((1..=31).contains(&parts.day) && (1..=12).contains(&parts.month))
}

/// Parses a `dd/mm/yyyy` string into a calendar date.
///
/// `Ok(None)` means the tokens are numeric but name no real day.
pub fn parse_calendar_date(date: &str) -> Result<Option<NaiveDate>> {
    Ok(DateParts::parse(date)?.to_calendar_date())
}

/// True when `End_Date` is on or after `Start_Date`.
pub fn is_end_after_start(record: &Record) -> Result<bool> {
    let start = required_calendar_date(record, START_DATE)?;
    let end = required_calendar_date(record, END_DATE)?;
    Ok(end >= start)
}

fn required_calendar_date(record: &Record, column: &str) -> Result<NaiveDate> {
    let value = record.get(column).ok_or_else(|| EtlError::MissingColumnError {
        column: column.to_string(),
    })?;
    parse_calendar_date(value)?
        .ok_or_else(|| EtlError::date_format(value, "not a calendar date"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashMap;

    fn rental(start: &str, end: &str) -> Record {
        let mut data = HashMap::new();
        data.insert(START_DATE.to_string(), start.to_string());
        data.insert(END_DATE.to_string(), end.to_string());
        Record::new(2, data)
    }

    #[test]
    fn test_is_pre_2023() {
        assert!(is_pre_2023("15/03/2022").unwrap());
        assert!(!is_pre_2023("15/03/2023").unwrap());
        assert!(!is_pre_2023("01/01/2024").unwrap());
    }

    #[test]
    fn test_malformed_dates_are_errors() {
        for bad in ["2023-03-15", "15/03", "15/03/2023/1", "aa/03/2023", "15/03/", ""] {
            let err = is_pre_2023(bad).unwrap_err();
            assert!(
                matches!(err, EtlError::DateFormatError { .. }),
                "{} gave {:?}",
                bad,
                err
            );
        }
    }

    #[test]
    fn test_correct_year_keeps_day_and_month_tokens() {
        assert_eq!(correct_year("15/03/2022").unwrap(), "15/03/2023");
        assert_eq!(correct_year("5/3/1999").unwrap(), "5/3/2023");
        assert_eq!(correct_year("15/03/2024").unwrap(), "15/03/2024");
    }

    #[test]
    fn test_custom_cutoff() {
        let normalizer = DateNormalizer::new(2025);
        assert!(normalizer.is_before_cutoff("01/01/2024").unwrap());
        assert_eq!(normalizer.correct_year("01/01/2024").unwrap(), "01/01/2025");
    }

    #[test]
    fn test_day_month_boundaries() {
        assert!(is_valid_day_month("01/01/2023").unwrap());
        assert!(is_valid_day_month("31/12/2023").unwrap());
        assert!(!is_valid_day_month("00/01/2023").unwrap());
        assert!(!is_valid_day_month("32/01/2023").unwrap());
        assert!(!is_valid_day_month("10/00/2023").unwrap());
        assert!(!is_valid_day_month("10/13/2023").unwrap());
        assert!(!is_valid_day_month("-1/05/2023").unwrap());
    }

    #[test]
    fn test_oversized_numbers_are_out_of_range_not_malformed() {
        assert!(!is_valid_day_month("99999999999/01/2024").unwrap());
        assert!(!is_valid_day_month("15/99999999999999999999999/2024").unwrap());
        assert!(!is_valid_day_month("-99999999999999999999999/01/2024").unwrap());
        assert!(!is_pre_2023("15/01/99999999999").unwrap());
        assert_eq!(parse_calendar_date("15/01/99999999999").unwrap(), None);
        assert!(matches!(
            is_valid_day_month("1e5/01/2024"),
            Err(EtlError::DateFormatError { .. })
        ));
        assert!(matches!(
            is_valid_day_month("-/01/2024"),
            Err(EtlError::DateFormatError { .. })
        ));
    }

    #[test]
    fn test_day_month_check_ignores_month_length() {
        assert!(is_valid_day_month("31/02/2023").unwrap());
        assert_eq!(parse_calendar_date("31/02/2023").unwrap(), None);
        assert_eq!(
            parse_calendar_date("29/02/2024").unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 29)
        );
    }

    #[test]
    fn test_end_after_start() {
        assert!(is_end_after_start(&rental("10/05/2024", "10/05/2024")).unwrap());
        assert!(is_end_after_start(&rental("10/05/2024", "11/05/2024")).unwrap());
        assert!(is_end_after_start(&rental("31/12/2023", "01/01/2024")).unwrap());
        assert!(!is_end_after_start(&rental("10/05/2024", "05/05/2024")).unwrap());
    }

    #[test]
    fn test_end_after_start_needs_both_columns() {
        let mut record = rental("10/05/2024", "11/05/2024");
        record.data.remove(END_DATE);
        assert!(matches!(
            is_end_after_start(&record),
            Err(EtlError::MissingColumnError { .. })
        ));
    }

    proptest! {
        #[test]
        fn prop_correct_year_forces_cutoff(day in 1u32..=31, month in 1u32..=12, year in 1900i32..2023) {
            let date = format!("{:02}/{:02}/{}", day, month, year);
            let corrected = correct_year(&date).unwrap();
            prop_assert_eq!(corrected, format!("{:02}/{:02}/2023", day, month));
        }

        #[test]
        fn prop_correct_year_is_identity_from_cutoff(day in 1u32..=31, month in 1u32..=12, year in 2023i32..3000) {
            let date = format!("{:02}/{:02}/{}", day, month, year);
            prop_assert_eq!(correct_year(&date).unwrap(), date);
        }

        #[test]
        fn prop_correct_year_is_idempotent(day in 0u32..40, month in 0u32..15, year in 1900i32..3000) {
            let date = format!("{}/{}/{}", day, month, year);
            let once = correct_year(&date).unwrap();
            prop_assert_eq!(correct_year(&once).unwrap(), once);
        }

        #[test]
        fn prop_out_of_range_day_or_month_is_invalid(day in 32i32..100, month in 13i32..100, year in 2000i32..2100) {
            let bad_day = format!("{}/06/{}", day, year);
            let bad_month = format!("15/{}/{}", month, year);
            prop_assert_eq!(is_valid_day_month(&bad_day).unwrap(), false);
            prop_assert_eq!(is_valid_day_month(&bad_month).unwrap(), false);
        }
    }
}
