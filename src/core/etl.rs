use crate::adapters::SqliteStore;
use crate::core::loader::BatchLoader;
use crate::core::validator::RecordValidator;
use crate::domain::model::{LoadSummary, Rejection, SourceDescriptor};
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{EtlError, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize)]
pub struct SourceOutcome {
    pub path: PathBuf,
    /// Empty when the source entry itself could not be read from the config.
    pub table: String,
    /// `None` when the source failed; see `error`.
    pub summary: Option<LoadSummary>,
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
struct RejectionEntry<'a> {
    source: &'a Path,
    line: usize,
    message: String,
    #[serde(flatten)]
    rejection: &'a Rejection,
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub sources: Vec<SourceOutcome>,
    pub rejections: Vec<(PathBuf, Rejection)>,
}

impl RunSummary {
    pub fn failed_sources(&self) -> usize {
        self.sources.iter().filter(|s| s.error.is_some()).count()
    }

    pub fn write_rejections<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let entries: Vec<RejectionEntry<'_>> = self
            .rejections
            .iter()
            .map(|(source, rejection)| RejectionEntry {
                source,
                line: rejection.record.line,
                message: rejection.reason.to_string(),
                rejection,
            })
            .collect();
        let json = serde_json::to_string_pretty(&entries)?;
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, json)?;
        Ok(())
    }

    fn record_invalid(&mut self, error: EtlError) {
        let path = match &error {
            EtlError::IngestionError { path, .. } => path.clone(),
            _ => PathBuf::new(),
        };
        tracing::error!("{}", error);
        tracing::error!("Suggestion: {}", error.recovery_suggestion());
        self.sources.push(SourceOutcome {
            path,
            table: String::new(),
            summary: None,
            error: Some(error.to_string()),
        });
    }

    fn record(&mut self, source: &SourceDescriptor, outcome: Result<(LoadSummary, Vec<Rejection>)>) {
        match outcome {
            Ok((summary, rejected)) => {
                self.rejections
                    .extend(rejected.into_iter().map(|r| (source.path.clone(), r)));
                self.sources.push(SourceOutcome {
                    path: source.path.clone(),
                    table: source.table.clone(),
                    summary: Some(summary),
                    error: None,
                });
            }
            Err(e) => {
                tracing::error!("{}", e);
                tracing::error!("Suggestion: {}", e.recovery_suggestion());
                self.sources.push(SourceOutcome {
                    path: source.path.clone(),
                    table: source.table.clone(),
                    summary: None,
                    error: Some(e.to_string()),
                });
            }
        }
    }
}

/// Runs schema setup, every configured source and the index pass against one store.
pub struct EtlEngine<C: ConfigProvider> {
    config: C,
    validator: RecordValidator,
}

impl<C: ConfigProvider> EtlEngine<C> {
    pub fn new(config: C, validator: RecordValidator) -> Self {
        Self { config, validator }
    }

    pub fn open_store(&self) -> Result<SqliteStore> {
        SqliteStore::open(self.config.database_path())
    }

    /// Schema failures are returned; per-source failures are logged and recorded
    /// in the summary so the remaining sources still load.
    pub fn run(&self, store: &mut SqliteStore) -> Result<RunSummary> {
        tracing::info!("Starting database setup.");
        store.setup_database(self.config.sql_files())?;
        tracing::info!("Database setup completed.");

        let mut summary = RunSummary::default();
        for source in self.config.sources() {
            let source = match source {
                Ok(source) => source,
                Err(e) => {
                    summary.record_invalid(e);
                    continue;
                }
            };
            let loader = BatchLoader::new(source.clone(), self.validator);
            let outcome = loader
                .run(store)
                .map(|(load, result)| (load, result.rejected));
            summary.record(&source, outcome);
        }

        for index in self.config.indexes() {
            if let Err(e) = store.create_index(&index.table, &index.column) {
                tracing::error!(
                    "Could not index {}.{}: {}",
                    index.table,
                    index.column,
                    e
                );
            }
        }

        for outcome in summary.sources.iter().filter(|s| s.summary.is_some()) {
            match store.count_rows(&outcome.table) {
                Ok(count) => tracing::info!("{} now holds {} rows", outcome.table, count),
                Err(e) => tracing::warn!("Could not count rows in {}: {}", outcome.table, e),
            }
        }

        if summary.failed_sources() == 0 {
            tracing::info!("Initialization and data ingestion were successful!");
        } else {
            tracing::warn!(
                "{} of {} sources failed to load",
                summary.failed_sources(),
                summary.sources.len()
            );
        }

        Ok(summary)
    }

    /// Extracts and cleans every source without opening the store.
    pub fn dry_run(&self) -> RunSummary {
        let mut summary = RunSummary::default();
        for source in self.config.sources() {
            let source = match source {
                Ok(source) => source,
                Err(e) => {
                    summary.record_invalid(e);
                    continue;
                }
            };
            let loader = BatchLoader::new(source.clone(), self.validator);
            let outcome = loader.dry_run().map(|result| {
                let load = LoadSummary {
                    table: source.table.clone(),
                    rows_read: result.rows_read,
                    rows_accepted: result.rows.len(),
                    rows_rejected: result.rejected.len(),
                    rows_inserted: 0,
                };
                (load, result.rejected)
            });
            summary.record(&source, outcome);
        }
        summary
    }
}
