use crate::core::dates::{self, DateNormalizer};
use crate::domain::model::{
    CleanRecord, Record, Rejection, RejectionReason, ValidationOutcome, ValidationReport, END_DATE,
    START_DATE,
};
use crate::utils::error::{EtlError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// What to do with a date that is not `dd/mm/yyyy` at all.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MalformedDatePolicy {
    /// Drop the record and keep going.
    #[default]
    Reject,
    /// Fail the whole batch.
    Abort,
}

/// Cleans the rental window of every record in a batch.
///
/// Stages run in order and each only sees the survivors of the previous one:
/// year correction, day/month range check, calendar parse, end-after-start.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordValidator {
    normalizer: DateNormalizer,
    policy: MalformedDatePolicy,
}

/// A record after year correction. `as_read` holds the date values the
/// correction replaced, so a rejection can hand back the row as it was read.
struct Corrected {
    record: Record,
    as_read: Vec<(&'static str, String)>,
}

impl Corrected {
    fn into_original(self) -> Record {
        let mut record = self.record;
        for (column, value) in self.as_read {
            record.data.insert(column.to_string(), value);
        }
        record
    }
}

impl RecordValidator {
    pub fn new(normalizer: DateNormalizer, policy: MalformedDatePolicy) -> Self {
        Self { normalizer, policy }
    }

    pub fn validate(&self, records: Vec<Record>) -> Result<ValidationReport> {
        let mut outcome = ValidationOutcome::default();
        let mut rejected = Vec::new();

        let corrected = self.correct_years(records, &mut outcome, &mut rejected)?;
        tracing::info!("Corrected year for {} rows.", outcome.year_corrected);
        if outcome.malformed > 0 {
            tracing::warn!("Removing {} rows due to malformed dates.", outcome.malformed);
        }

        let in_range = self.check_day_month(corrected, &mut outcome, &mut rejected)?;
        tracing::info!(
            "Removing {} rows due to invalid dates.",
            outcome.invalid_day_month
        );

        let parsed = self.parse_dates(in_range, &mut outcome, &mut rejected)?;
        if outcome.not_a_calendar_date > 0 {
            tracing::info!(
                "Removing {} rows with dates that do not exist.",
                outcome.not_a_calendar_date
            );
        }

        let accepted = self.check_ordering(parsed, &mut outcome, &mut rejected)?;
        tracing::info!(
            "Removing {} rows ending before they start.",
            outcome.end_before_start
        );

        for rejection in &rejected {
            tracing::debug!("line {}: {}", rejection.record.line, rejection.reason);
        }

        Ok(ValidationReport {
            accepted,
            rejected,
            outcome,
        })
    }

    /// Both columns are checked before either is rewritten.
    fn correct_years(
        &self,
        records: Vec<Record>,
        outcome: &mut ValidationOutcome,
        rejected: &mut Vec<Rejection>,
    ) -> Result<Vec<Corrected>> {
        let mut survivors = Vec::with_capacity(records.len());

        'records: for mut record in records {
            let mut fixes = Vec::new();
            for column in [START_DATE, END_DATE] {
                let original = required(&record, column)?.to_string();
                match self.normalizer.correct_year(&original) {
                    Ok(fixed) => {
                        if fixed != original {
                            fixes.push((column, fixed));
                        }
                    }
                    Err(err @ EtlError::DateFormatError { .. }) => {
                        if self.policy == MalformedDatePolicy::Abort {
                            return Err(err);
                        }
                        outcome.malformed += 1;
                        rejected.push(Rejection {
                            record,
                            reason: RejectionReason::MalformedDate {
                                column: column.to_string(),
                                value: original,
                            },
                        });
                        continue 'records;
                    }
                    Err(err) => return Err(err),
                }
            }

            if !fixes.is_empty() {
                outcome.year_corrected += 1;
            }
            let mut as_read = Vec::with_capacity(fixes.len());
            for (column, fixed) in fixes {
                if let Some(previous) = record.data.insert(column.to_string(), fixed) {
                    as_read.push((column, previous));
                }
            }
            survivors.push(Corrected { record, as_read });
        }

        Ok(survivors)
    }

    fn check_day_month(
        &self,
        records: Vec<Corrected>,
        outcome: &mut ValidationOutcome,
        rejected: &mut Vec<Rejection>,
    ) -> Result<Vec<Corrected>> {
        let mut survivors = Vec::with_capacity(records.len());

        for candidate in records {
            let mut failing = None;
            for column in [START_DATE, END_DATE] {
                let value = required(&candidate.record, column)?;
                if !dates::is_valid_day_month(value)? {
                    failing = Some((column.to_string(), value.to_string()));
                    break;
                }
            }

            match failing {
                Some((column, value)) => {
                    outcome.invalid_day_month += 1;
                    rejected.push(Rejection {
                        record: candidate.into_original(),
                        reason: RejectionReason::InvalidDayMonth { column, value },
                    });
                }
                None => survivors.push(candidate),
            }
        }

        Ok(survivors)
    }

    fn parse_dates(
        &self,
        records: Vec<Corrected>,
        outcome: &mut ValidationOutcome,
        rejected: &mut Vec<Rejection>,
    ) -> Result<Vec<(Corrected, NaiveDate, NaiveDate)>> {
        let mut survivors = Vec::with_capacity(records.len());

        for candidate in records {
            let start_value = required(&candidate.record, START_DATE)?.to_string();
            let end_value = required(&candidate.record, END_DATE)?.to_string();
            let start = dates::parse_calendar_date(&start_value)?;
            let end = dates::parse_calendar_date(&end_value)?;

            match (start, end) {
                (Some(start), Some(end)) => survivors.push((candidate, start, end)),
                (None, _) => reject_calendar(candidate, START_DATE, start_value, outcome, rejected),
                (_, None) => reject_calendar(candidate, END_DATE, end_value, outcome, rejected),
            }
        }

        Ok(survivors)
    }

    fn check_ordering(
        &self,
        records: Vec<(Corrected, NaiveDate, NaiveDate)>,
        outcome: &mut ValidationOutcome,
        rejected: &mut Vec<Rejection>,
    ) -> Result<Vec<CleanRecord>> {
        let mut accepted = Vec::with_capacity(records.len());

        for (candidate, start_date, end_date) in records {
            if dates::is_end_after_start(&candidate.record)? {
                accepted.push(CleanRecord {
                    line: candidate.record.line,
                    data: candidate.record.data,
                    start_date,
                    end_date,
                });
            } else {
                outcome.end_before_start += 1;
                rejected.push(Rejection {
                    record: candidate.into_original(),
                    reason: RejectionReason::EndBeforeStart {
                        start: start_date,
                        end: end_date,
                    },
                });
            }
        }

        Ok(accepted)
    }
}

fn required<'r>(record: &'r Record, column: &str) -> Result<&'r str> {
    record.get(column).ok_or_else(|| EtlError::MissingColumnError {
        column: column.to_string(),
    })
}

fn reject_calendar(
    candidate: Corrected,
    column: &str,
    value: String,
    outcome: &mut ValidationOutcome,
    rejected: &mut Vec<Rejection>,
) {
    outcome.not_a_calendar_date += 1;
    rejected.push(Rejection {
        record: candidate.into_original(),
        reason: RejectionReason::NotACalendarDate {
            column: column.to_string(),
            value,
        },
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn rental(line: usize, id: &str, start: &str, end: &str) -> Record {
        let mut data = HashMap::new();
        data.insert("Rental_ID".to_string(), id.to_string());
        data.insert(START_DATE.to_string(), start.to_string());
        data.insert(END_DATE.to_string(), end.to_string());
        Record::new(line, data)
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_historic_rental_is_moved_to_2023_and_accepted() {
        let report = RecordValidator::default()
            .validate(vec![rental(2, "A", "15/03/2022", "20/03/2022")])
            .unwrap();

        assert_eq!(report.outcome.year_corrected, 1);
        assert!(report.rejected.is_empty());
        assert_eq!(report.accepted.len(), 1);
        assert_eq!(report.accepted[0].start_date, ymd(2023, 3, 15));
        assert_eq!(report.accepted[0].end_date, ymd(2023, 3, 20));
        assert_eq!(report.accepted[0].data["Rental_ID"], "A");
    }

    #[test]
    fn test_rejections_carry_their_stage() {
        let report = RecordValidator::default()
            .validate(vec![
                rental(2, "A", "15/03/2022", "20/03/2022"),
                rental(3, "B", "32/01/2024", "01/02/2024"),
                rental(4, "C", "10/05/2024", "05/05/2024"),
                rental(5, "D", "30/02/2024", "02/03/2024"),
                rental(6, "E", "2024-05-01", "02/05/2024"),
                rental(7, "F", "10/05/2024", "10/05/2024"),
            ])
            .unwrap();

        let accepted: Vec<&str> = report
            .accepted
            .iter()
            .map(|r| r.data["Rental_ID"].as_str())
            .collect();
        assert_eq!(accepted, vec!["A", "F"]);

        assert_eq!(
            report.outcome,
            ValidationOutcome {
                year_corrected: 1,
                malformed: 1,
                invalid_day_month: 1,
                not_a_calendar_date: 1,
                end_before_start: 1,
            }
        );
        assert_eq!(report.outcome.rejected(), report.rejected.len());

        let reason_for = |id: &str| {
            report
                .rejected
                .iter()
                .find(|r| r.record.data["Rental_ID"] == id)
                .map(|r| r.reason.clone())
                .unwrap()
        };
        assert!(matches!(reason_for("B"), RejectionReason::InvalidDayMonth { column, .. } if column == START_DATE));
        assert_eq!(
            reason_for("C"),
            RejectionReason::EndBeforeStart {
                start: ymd(2024, 5, 10),
                end: ymd(2024, 5, 5),
            }
        );
        assert!(matches!(reason_for("D"), RejectionReason::NotACalendarDate { .. }));
        assert!(matches!(reason_for("E"), RejectionReason::MalformedDate { .. }));
    }

    #[test]
    fn test_invalid_start_rejects_regardless_of_end() {
        let report = RecordValidator::default()
            .validate(vec![rental(2, "B", "32/01/2024", "99/99/2024")])
            .unwrap();
        assert!(report.accepted.is_empty());
        assert_eq!(report.outcome.invalid_day_month, 1);
        assert_eq!(
            report.rejected[0].reason,
            RejectionReason::InvalidDayMonth {
                column: START_DATE.to_string(),
                value: "32/01/2024".to_string(),
            }
        );
    }

    #[test]
    fn test_year_count_includes_end_only_corrections() {
        let report = RecordValidator::default()
            .validate(vec![rental(2, "A", "28/12/2023", "02/01/2022")])
            .unwrap();
        assert_eq!(report.outcome.year_corrected, 1);
        // 02/01/2023 is before 28/12/2023 once corrected
        assert_eq!(report.outcome.end_before_start, 1);
    }

    #[test]
    fn test_rejected_records_keep_the_values_that_were_read() {
        let report = RecordValidator::default()
            .validate(vec![
                rental(2, "A", "15/03/2022", "bad"),
                rental(3, "B", "15/03/2022", "32/03/2022"),
                rental(4, "C", "15/03/2022", "10/03/2022"),
            ])
            .unwrap();

        assert!(report.accepted.is_empty());
        assert_eq!(report.outcome.year_corrected, 2);
        for rejection in &report.rejected {
            assert_eq!(rejection.record.data[START_DATE], "15/03/2022");
        }
        let end_for = |id: &str| {
            report
                .rejected
                .iter()
                .find(|r| r.record.data["Rental_ID"] == id)
                .map(|r| r.record.data[END_DATE].clone())
                .unwrap()
        };
        assert_eq!(end_for("A"), "bad");
        assert_eq!(end_for("B"), "32/03/2022");
        assert_eq!(end_for("C"), "10/03/2022");
        // the reason still names the value that failed the check
        assert_eq!(
            report.rejected[1].reason,
            RejectionReason::InvalidDayMonth {
                column: END_DATE.to_string(),
                value: "32/03/2023".to_string(),
            }
        );
    }

    #[test]
    fn test_oversized_day_is_out_of_range_under_abort_policy() {
        let validator = RecordValidator::new(DateNormalizer::default(), MalformedDatePolicy::Abort);
        let report = validator
            .validate(vec![
                rental(2, "A", "99999999999/01/2024", "02/01/2024"),
                rental(3, "B", "01/01/2024", "02/01/2024"),
            ])
            .unwrap();

        assert_eq!(report.accepted.len(), 1);
        assert_eq!(report.outcome.invalid_day_month, 1);
        assert_eq!(report.outcome.malformed, 0);
    }

    #[test]
    fn test_abort_policy_propagates_format_error() {
        let validator = RecordValidator::new(DateNormalizer::default(), MalformedDatePolicy::Abort);
        let err = validator
            .validate(vec![
                rental(2, "A", "15/03/2023", "20/03/2023"),
                rental(3, "B", "15-03-2023", "20/03/2023"),
            ])
            .unwrap_err();
        assert!(matches!(err, EtlError::DateFormatError { .. }));
    }

    #[test]
    fn test_missing_date_column_fails_batch() {
        let mut record = rental(2, "A", "15/03/2023", "20/03/2023");
        record.data.remove(START_DATE);
        let err = RecordValidator::default().validate(vec![record]).unwrap_err();
        assert!(matches!(err, EtlError::MissingColumnError { column } if column == START_DATE));
    }
}
