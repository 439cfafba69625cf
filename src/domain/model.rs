use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

pub const START_DATE: &str = "Start_Date";
pub const END_DATE: &str = "End_Date";

/// One parsed input row, keyed by header name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// 1-based line in the source file, header included.
    pub line: usize,
    pub data: HashMap<String, String>,
}

impl Record {
    pub fn new(line: usize, data: HashMap<String, String>) -> Self {
        Self { line, data }
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.data.get(column).map(String::as_str)
    }
}

/// The whole content of one source file, read into memory before anything is written.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub headers: Vec<String>,
    pub records: Vec<Record>,
}

/// A value bound to an insert parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Date(NaiveDate),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

/// A record that survived cleaning, with its rental window parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanRecord {
    pub line: usize,
    pub data: HashMap<String, String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl CleanRecord {
    pub fn value(&self, column: &str) -> FieldValue {
        match column {
            START_DATE => FieldValue::Date(self.start_date),
            END_DATE => FieldValue::Date(self.end_date),
            other => FieldValue::Text(self.data.get(other).cloned().unwrap_or_default()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RejectionReason {
    /// A date did not split into three numeric `/`-separated tokens.
    MalformedDate { column: String, value: String },
    InvalidDayMonth { column: String, value: String },
    /// Day and month are in range but the date does not exist (e.g. 30/02).
    NotACalendarDate { column: String, value: String },
    EndBeforeStart { start: NaiveDate, end: NaiveDate },
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectionReason::MalformedDate { column, value } => {
                write!(f, "{} '{}' is not a dd/mm/yyyy date", column, value)
            }
            RejectionReason::InvalidDayMonth { column, value } => {
                write!(f, "{} '{}' has day or month out of range", column, value)
            }
            RejectionReason::NotACalendarDate { column, value } => {
                write!(f, "{} '{}' does not exist in the calendar", column, value)
            }
            RejectionReason::EndBeforeStart { start, end } => {
                write!(f, "End_Date {} is before Start_Date {}", end, start)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rejection {
    pub record: Record,
    pub reason: RejectionReason,
}

/// Per-batch counters; only ever logged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ValidationOutcome {
    pub year_corrected: usize,
    pub malformed: usize,
    pub invalid_day_month: usize,
    pub not_a_calendar_date: usize,
    pub end_before_start: usize,
}

impl ValidationOutcome {
    pub fn rejected(&self) -> usize {
        self.malformed + self.invalid_day_month + self.not_a_calendar_date + self.end_before_start
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidationReport {
    pub accepted: Vec<CleanRecord>,
    pub rejected: Vec<Rejection>,
    pub outcome: ValidationOutcome,
}

/// Where a file goes and what has to happen to it on the way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDescriptor {
    pub path: PathBuf,
    pub table: String,
    /// `None` falls back to sniffing the file name.
    pub delimiter: Option<u8>,
    pub capability: SourceCapability,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceCapability {
    /// Fact data: rental windows are corrected and validated before insert.
    RequiresDateCleaning,
    /// Dimension data: loaded verbatim.
    Verbatim,
}

impl SourceDescriptor {
    pub fn fact(path: impl Into<PathBuf>, table: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            table: table.into(),
            delimiter: None,
            capability: SourceCapability::RequiresDateCleaning,
        }
    }

    pub fn dimension(path: impl Into<PathBuf>, table: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            table: table.into(),
            delimiter: None,
            capability: SourceCapability::Verbatim,
        }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = Some(delimiter);
        self
    }

    pub fn requires_date_cleaning(&self) -> bool {
        self.capability == SourceCapability::RequiresDateCleaning
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    pub table: String,
    pub column: String,
}

/// Rows ready for the sink, in header order.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<FieldValue>>,
    pub rejected: Vec<Rejection>,
    pub outcome: Option<ValidationOutcome>,
    pub rows_read: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadSummary {
    pub table: String,
    pub rows_read: usize,
    pub rows_accepted: usize,
    pub rows_rejected: usize,
    /// Accepted rows the store actually kept; the rest were duplicates.
    pub rows_inserted: usize,
}
