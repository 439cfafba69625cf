use crate::core::dates::DEFAULT_CUTOFF_YEAR;
use crate::core::validator::MalformedDatePolicy;
use crate::domain::model::{IndexSpec, SourceCapability, SourceDescriptor};
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub cleaning: CleaningConfig,
    pub sources: Vec<SourceConfig>,
    #[serde(default)]
    pub indexes: Vec<IndexConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    #[serde(default)]
    pub sql_files: Vec<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleaningConfig {
    #[serde(default)]
    pub on_malformed_date: MalformedDatePolicy,
    #[serde(default = "default_cutoff_year")]
    pub cutoff_year: i32,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            on_malformed_date: MalformedDatePolicy::default(),
            cutoff_year: DEFAULT_CUTOFF_YEAR,
        }
    }
}

fn default_cutoff_year() -> i32 {
    DEFAULT_CUTOFF_YEAR
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub path: PathBuf,
    pub table: String,
    #[serde(default)]
    pub clean_dates: bool,
    pub delimiter: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexConfig {
    pub table: String,
    pub column: String,
}

impl Default for TomlConfig {
    /// The rental and locations extracts under `data/`.
    fn default() -> Self {
        let index = |table: &str, column: &str| IndexConfig {
            table: table.to_string(),
            column: column.to_string(),
        };
        Self {
            database: DatabaseConfig {
                path: PathBuf::from("data/rentals.db"),
                sql_files: vec![PathBuf::from("sql/schema.sql")],
            },
            cleaning: CleaningConfig::default(),
            sources: vec![
                SourceConfig {
                    path: PathBuf::from("data/Vehicle_Rentals.csv"),
                    table: "ft_vehicle_Rentals".to_string(),
                    clean_dates: true,
                    delimiter: None,
                },
                SourceConfig {
                    path: PathBuf::from("data/Locations.csv"),
                    table: "dm_locations".to_string(),
                    clean_dates: false,
                    delimiter: None,
                },
            ],
            indexes: vec![
                index("ft_vehicle_Rentals", "Location_ID"),
                index("ft_vehicle_Rentals", "Rental_ID"),
                index("dm_locations", "Location_ID"),
            ],
        }
    }
}

impl TomlConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(EtlError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| EtlError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the variable's value; unknown variables stay as written.
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = regex::Regex::new(r"\$\{([^}]+)\}").map_err(|e| EtlError::ConfigError {
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.into_owned())
    }

    fn source_descriptor(index: usize, source: &SourceConfig) -> Result<SourceDescriptor> {
        let delimiter = source
            .delimiter
            .as_deref()
            .map(|d| validation::validate_delimiter(&format!("sources[{}].delimiter", index), d))
            .transpose()?;
        Ok(SourceDescriptor {
            path: source.path.clone(),
            table: source.table.clone(),
            delimiter,
            capability: if source.clean_dates {
                SourceCapability::RequiresDateCleaning
            } else {
                SourceCapability::Verbatim
            },
        })
    }
}

impl ConfigProvider for TomlConfig {
    fn database_path(&self) -> &Path {
        &self.database.path
    }

    fn sql_files(&self) -> &[PathBuf] {
        &self.database.sql_files
    }

    fn sources(&self) -> Vec<Result<SourceDescriptor>> {
        self.sources
            .iter()
            .enumerate()
            .map(|(i, s)| {
                Self::source_descriptor(i, s).map_err(|e| EtlError::ingestion(&s.path, e))
            })
            .collect()
    }

    fn indexes(&self) -> Vec<IndexSpec> {
        self.indexes
            .iter()
            .map(|i| IndexSpec {
                table: i.table.clone(),
                column: i.column.clone(),
            })
            .collect()
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_path("database.path", &self.database.path)?;
        for (i, file) in self.database.sql_files.iter().enumerate() {
            validation::validate_file_extension(&format!("database.sql_files[{}]", i), file, &["sql"])?;
        }

        if self.sources.is_empty() {
            return Err(EtlError::ConfigError {
                message: "at least one [[sources]] entry is required".to_string(),
            });
        }
        for (i, source) in self.sources.iter().enumerate() {
            validation::validate_file_extension(
                &format!("sources[{}].path", i),
                &source.path,
                &["csv", "txt"],
            )?;
            validation::validate_non_empty_string(&format!("sources[{}].table", i), &source.table)?;
            Self::source_descriptor(i, source)?;
        }

        for (i, index) in self.indexes.iter().enumerate() {
            validation::validate_non_empty_string(&format!("indexes[{}].table", i), &index.table)?;
            validation::validate_non_empty_string(&format!("indexes[{}].column", i), &index.column)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const BASIC: &str = r#"
[database]
path = "data/rentals.db"
sql_files = ["sql/schema.sql"]

[cleaning]
on_malformed_date = "abort"

[[sources]]
path = "data/Vehicle_Rentals.csv"
table = "ft_vehicle_Rentals"
clean_dates = true

[[sources]]
path = "data/Locations.csv"
table = "dm_locations"
delimiter = ";"

[[indexes]]
table = "ft_vehicle_Rentals"
column = "Location_ID"
"#;

    #[test]
    fn test_parse_basic_toml_config() {
        let config = TomlConfig::from_toml_str(BASIC).unwrap();

        assert_eq!(config.database.path, PathBuf::from("data/rentals.db"));
        assert_eq!(config.cleaning.on_malformed_date, MalformedDatePolicy::Abort);
        assert_eq!(config.cleaning.cutoff_year, 2023);
        assert!(config.validate().is_ok());

        let sources: Vec<SourceDescriptor> =
            config.sources().into_iter().collect::<Result<_>>().unwrap();
        assert_eq!(sources.len(), 2);
        assert!(sources[0].requires_date_cleaning());
        assert_eq!(sources[0].delimiter, None);
        assert!(!sources[1].requires_date_cleaning());
        assert_eq!(sources[1].delimiter, Some(b';'));
        assert_eq!(config.indexes().len(), 1);
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("RENTAL_ETL_TEST_DB", "/tmp/from-env.db");

        let config = TomlConfig::from_toml_str(
            r#"
[database]
path = "${RENTAL_ETL_TEST_DB}"

[[sources]]
path = "Locations.csv"
table = "dm_locations"
"#,
        )
        .unwrap();
        assert_eq!(config.database.path, PathBuf::from("/tmp/from-env.db"));

        std::env::remove_var("RENTAL_ETL_TEST_DB");
    }

    #[test]
    fn test_config_validation() {
        let mut config = TomlConfig::from_toml_str(BASIC).unwrap();
        config.sources[1].delimiter = Some("||".to_string());
        assert!(config.validate().is_err());

        let mut config = TomlConfig::from_toml_str(BASIC).unwrap();
        config.sources[0].path = PathBuf::from("rentals.xlsx");
        assert!(config.validate().is_err());

        let mut config = TomlConfig::from_toml_str(BASIC).unwrap();
        config.sources.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bad_delimiter_surfaces_as_failed_source() {
        let mut config = TomlConfig::from_toml_str(BASIC).unwrap();
        config.sources[1].delimiter = Some(";;".to_string());

        let sources = config.sources();
        assert_eq!(sources.len(), 2);
        assert!(sources[0].is_ok());
        match &sources[1] {
            Err(EtlError::IngestionError { path, source }) => {
                assert_eq!(path, &PathBuf::from("data/Locations.csv"));
                assert!(matches!(**source, EtlError::InvalidConfigValueError { .. }));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_default_matches_shipped_layout() {
        let config = TomlConfig::default();
        assert!(config.validate().is_ok());
        let sources: Vec<SourceDescriptor> =
            config.sources().into_iter().collect::<Result<_>>().unwrap();
        assert_eq!(sources[0].table, "ft_vehicle_Rentals");
        assert!(sources[0].requires_date_cleaning());
        assert_eq!(sources[1].table, "dm_locations");
        assert_eq!(config.indexes().len(), 3);
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(BASIC.as_bytes()).unwrap();

        let config = TomlConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.sources.len(), 2);
    }

    #[test]
    fn test_unknown_policy_is_rejected() {
        let broken = BASIC.replace("\"abort\"", "\"explode\"");
        assert!(matches!(
            TomlConfig::from_toml_str(&broken),
            Err(EtlError::ConfigError { .. })
        ));
    }
}
