use crate::core::validator::RecordValidator;
use crate::domain::model::{
    Batch, FieldValue, LoadSummary, Record, SourceDescriptor, TransformResult, END_DATE, START_DATE,
};
use crate::domain::ports::{Pipeline, Sink};
use crate::utils::error::{EtlError, Result};
use std::collections::HashMap;
use std::path::Path;

/// Semicolon for anything named like the locations extract, comma otherwise.
pub fn detect_delimiter(source_name: &str) -> u8 {
    if source_name.contains("Locations") {
        b';'
    } else {
        b','
    }
}

/// Loads one delimited file into one table.
pub struct BatchLoader {
    source: SourceDescriptor,
    validator: RecordValidator,
}

impl BatchLoader {
    pub fn new(source: SourceDescriptor, validator: RecordValidator) -> Self {
        Self { source, validator }
    }

    pub fn source(&self) -> &SourceDescriptor {
        &self.source
    }

    pub fn delimiter(&self) -> u8 {
        self.source
            .delimiter
            .unwrap_or_else(|| detect_delimiter(&self.source.path.to_string_lossy()))
    }

    /// Extracts, transforms and loads the source. Any failure is reported as
    /// an ingestion error naming the file; nothing from a failed file is kept.
    pub fn run<S: Sink>(&self, sink: &mut S) -> Result<(LoadSummary, TransformResult)> {
        self.stage(sink)
            .map_err(|e| EtlError::ingestion(&self.source.path, e))
    }

    /// Extract and transform only.
    pub fn dry_run(&self) -> Result<TransformResult> {
        self.extract()
            .and_then(|batch| self.transform(batch))
            .map_err(|e| EtlError::ingestion(&self.source.path, e))
    }

    fn stage<S: Sink>(&self, sink: &mut S) -> Result<(LoadSummary, TransformResult)> {
        let batch = self.extract()?;
        let result = self.transform(batch)?;
        let summary = self.load(sink, &result)?;
        Ok((summary, result))
    }

    fn read_batch(path: &Path, delimiter: u8) -> Result<Batch> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .from_path(path)?;

        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let mut records = Vec::new();

        for row in reader.records() {
            let row = row?;
            let line = row.position().map(|p| p.line() as usize).unwrap_or(0);
            let data: HashMap<String, String> = headers
                .iter()
                .cloned()
                .zip(row.iter().map(str::to_string))
                .collect();
            records.push(Record::new(line, data));
        }

        Ok(Batch { headers, records })
    }
}

impl Pipeline for BatchLoader {
    fn extract(&self) -> Result<Batch> {
        let delimiter = self.delimiter();
        tracing::debug!(
            "Reading {} with delimiter '{}'",
            self.source.path.display(),
            delimiter as char
        );
        let batch = Self::read_batch(&self.source.path, delimiter)?;
        tracing::info!(
            "Read {} rows from {}",
            batch.records.len(),
            self.source.path.display()
        );
        Ok(batch)
    }

    fn transform(&self, batch: Batch) -> Result<TransformResult> {
        let rows_read = batch.records.len();
        let columns = batch.headers;

        if !self.source.requires_date_cleaning() {
            let rows: Vec<Vec<FieldValue>> = batch
                .records
                .into_iter()
                .map(|record| {
                    columns
                        .iter()
                        .map(|c| FieldValue::Text(record.get(c).unwrap_or_default().to_string()))
                        .collect::<Vec<_>>()
                })
                .collect();
            return Ok(TransformResult {
                columns,
                rows,
                rejected: Vec::new(),
                outcome: None,
                rows_read,
            });
        }

        for required in [START_DATE, END_DATE] {
            if !columns.iter().any(|c| c == required) {
                return Err(EtlError::MissingColumnError {
                    column: required.to_string(),
                });
            }
        }

        let report = self.validator.validate(batch.records)?;
        let rows: Vec<Vec<FieldValue>> = report
            .accepted
            .iter()
            .map(|record| columns.iter().map(|c| record.value(c)).collect::<Vec<_>>())
            .collect();

        Ok(TransformResult {
            columns,
            rows,
            rejected: report.rejected,
            outcome: Some(report.outcome),
            rows_read,
        })
    }

    fn load<S: Sink>(&self, sink: &mut S, result: &TransformResult) -> Result<LoadSummary> {
        let inserted = sink.insert_many(&self.source.table, &result.columns, &result.rows)?;
        tracing::info!(
            "Inserted {} of {} rows into {} ({} already present)",
            inserted,
            result.rows.len(),
            self.source.table,
            result.rows.len().saturating_sub(inserted)
        );

        Ok(LoadSummary {
            table: self.source.table.clone(),
            rows_read: result.rows_read,
            rows_accepted: result.rows.len(),
            rows_rejected: result.rejected.len(),
            rows_inserted: inserted,
        })
    }
}
