pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::TomlConfig;

pub use adapters::SqliteStore;
pub use core::{
    dates::DateNormalizer,
    etl::{EtlEngine, RunSummary},
    loader::BatchLoader,
    validator::{MalformedDatePolicy, RecordValidator},
};
pub use domain::model::SourceDescriptor;
pub use utils::error::{EtlError, Result};
