use crate::domain::model::{Batch, FieldValue, IndexSpec, LoadSummary, SourceDescriptor, TransformResult};
use crate::utils::error::Result;
use std::path::{Path, PathBuf};

/// Destination for cleaned rows.
pub trait Sink {
    /// Runs DDL or index statements.
    fn execute(&self, sql: &str) -> Result<()>;

    /// Inserts every row with insert-or-ignore semantics and returns how many
    /// rows were actually written. All rows land or none do.
    fn insert_many(
        &mut self,
        table: &str,
        columns: &[String],
        rows: &[Vec<FieldValue>],
    ) -> Result<usize>;
}

pub trait ConfigProvider {
    fn database_path(&self) -> &Path;
    fn sql_files(&self) -> &[PathBuf];
    /// One entry per configured source, in order. A source whose settings
    /// cannot be turned into a descriptor comes back as an ingestion error.
    fn sources(&self) -> Vec<Result<SourceDescriptor>>;
    fn indexes(&self) -> Vec<IndexSpec>;
}

/// One source file, extracted, transformed and loaded in that order.
pub trait Pipeline {
    fn extract(&self) -> Result<Batch>;
    fn transform(&self, batch: Batch) -> Result<TransformResult>;
    fn load<S: Sink>(&self, sink: &mut S, result: &TransformResult) -> Result<LoadSummary>;
}
