use crate::domain::model::FieldValue;
use crate::domain::ports::Sink;
use crate::utils::error::Result;
use rusqlite::types::{ToSqlOutput, Value};
use rusqlite::{params_from_iter, Connection, ToSql};
use std::path::{Path, PathBuf};

impl ToSql for FieldValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self {
            FieldValue::Text(s) => Ok(ToSqlOutput::from(s.as_str())),
            FieldValue::Date(d) => Ok(ToSqlOutput::Owned(Value::Text(
                d.format("%Y-%m-%d").to_string(),
            ))),
        }
    }
}

/// Double-quotes an identifier for interpolation into SQL text.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

pub fn insert_or_ignore_statement(table: &str, columns: &[String]) -> String {
    let column_list = columns
        .iter()
        .map(|c| quote_identifier(c))
        .collect::<Vec<_>>()
        .join(",");
    let placeholders = vec!["?"; columns.len()].join(",");
    format!(
        "INSERT OR IGNORE INTO {} ({}) VALUES ({})",
        quote_identifier(table),
        column_list,
        placeholders
    )
}

pub fn load_sql_from_file<P: AsRef<Path>>(path: P) -> Result<String> {
    Ok(std::fs::read_to_string(path)?)
}

/// The rental store on a single SQLite connection.
pub struct SqliteStore {
    conn: Connection,
    path: Option<PathBuf>,
}

impl SqliteStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        tracing::debug!("Opened SQLite database at {}", path.display());
        Ok(Self {
            conn,
            path: Some(path.to_path_buf()),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
            path: None,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Runs each schema script in order.
    pub fn setup_database<P: AsRef<Path>>(&self, sql_files: &[P]) -> Result<()> {
        for file in sql_files {
            let sql = load_sql_from_file(file)?;
            tracing::debug!("Running schema script {}", file.as_ref().display());
            self.execute(&sql)?;
        }
        Ok(())
    }

    pub fn create_index(&self, table: &str, column: &str) -> Result<()> {
        let sql = format!(
            "CREATE INDEX IF NOT EXISTS {} ON {}({})",
            quote_identifier(&format!("idx_{}_{}", table, column)),
            quote_identifier(table),
            quote_identifier(column)
        );
        self.execute(&sql)
    }

    pub fn count_rows(&self, table: &str) -> Result<u64> {
        let sql = format!("SELECT COUNT(*) FROM {}", quote_identifier(table));
        let count: i64 = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Every row of a table rendered as text, in rowid order.
    pub fn fetch_all(&self, table: &str) -> Result<Vec<Vec<String>>> {
        let sql = format!("SELECT * FROM {} ORDER BY rowid", quote_identifier(table));
        let mut stmt = self.conn.prepare(&sql)?;
        let width = stmt.column_count();
        let rows = stmt.query_map([], |row| {
            (0..width)
                .map(|i| {
                    row.get::<_, Value>(i).map(|v| match v {
                        Value::Null => String::new(),
                        Value::Integer(n) => n.to_string(),
                        Value::Real(x) => x.to_string(),
                        Value::Text(s) => s,
                        Value::Blob(b) => String::from_utf8_lossy(&b).into_owned(),
                    })
                })
                .collect::<rusqlite::Result<Vec<String>>>()
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}

impl Sink for SqliteStore {
    fn execute(&self, sql: &str) -> Result<()> {
        self.conn.execute_batch(sql)?;
        Ok(())
    }

    fn insert_many(
        &mut self,
        table: &str,
        columns: &[String],
        rows: &[Vec<FieldValue>],
    ) -> Result<usize> {
        let sql = insert_or_ignore_statement(table, columns);
        let tx = self.conn.transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(&sql)?;
            for row in rows {
                inserted += stmt.execute(params_from_iter(row.iter()))?;
            }
        }
        tx.commit()?;
        Ok(inserted)
    }
}
