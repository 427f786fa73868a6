//! Row-by-row "insert, ignore on conflict" loading of JSON records.
//!
//! A record is a flat JSON object. Within one table the first record's keys
//! fix the column list and the bind order for every row; keys missing from a
//! later record bind as NULL and extra keys are ignored.
use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::{Map, Value};
use sqlx::any::AnyArguments;
use sqlx::query::Query;
use sqlx::{Any, AnyConnection, Connection};
use std::path::Path;
use tracing::{debug, warn};

use crate::util::db::Dialect;

pub type Record = Map<String, Value>;

/// Error messages kept per table; the rest are only logged.
const MAX_REPORTED_ERRORS: usize = 20;

/// Per-table tally of one load.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadOutcome {
    pub records: usize,
    pub inserted: u64,
    /// Rows absorbed by a uniqueness constraint.
    pub skipped: u64,
    pub failed: u64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl LoadOutcome {
    fn record_failure(&mut self, message: String) {
        self.failed += 1;
        if self.errors.len() < MAX_REPORTED_ERRORS {
            self.errors.push(message);
        }
    }
}

/// A prepared "insert if absent" statement for one table and column list.
#[derive(Debug, Clone)]
pub struct InsertStatement {
    dialect: Dialect,
    columns: Vec<String>,
    sql: String,
}

impl InsertStatement {
    pub fn new(dialect: Dialect, table: &str, columns: &[String]) -> Self {
        let table_q = dialect.quote_ident(table);
        let cols_q = columns
            .iter()
            .map(|c| dialect.quote_ident(c))
            .collect::<Vec<_>>()
            .join(", ");

        let sql = match dialect {
            // Postgres coerces each JSON field to the column type, so text,
            // numbers and timestamps all land without client-side typing.
            Dialect::Postgres => format!(
                "INSERT INTO {table_q} ({cols_q}) SELECT {cols_q} \
                 FROM json_populate_record(NULL::{table_q}, $1::json) \
                 ON CONFLICT DO NOTHING"
            ),
            Dialect::Sqlite => format!(
                "INSERT INTO {table_q} ({cols_q}) VALUES ({}) ON CONFLICT DO NOTHING",
                placeholders(columns.len())
            ),
            Dialect::MySql => format!(
                "INSERT IGNORE INTO {table_q} ({cols_q}) VALUES ({})",
                placeholders(columns.len())
            ),
        };

        Self {
            dialect,
            columns: columns.to_vec(),
            sql,
        }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    fn bind<'q>(&'q self, record: &Record) -> Result<Query<'q, Any, AnyArguments<'q>>> {
        let mut query = sqlx::query(&self.sql);
        match self.dialect {
            Dialect::Postgres => {
                let row: Record = self
                    .columns
                    .iter()
                    .map(|c| (c.clone(), record.get(c).cloned().unwrap_or(Value::Null)))
                    .collect();
                query = query.bind(serde_json::to_string(&row)?);
            }
            Dialect::Sqlite | Dialect::MySql => {
                for column in &self.columns {
                    query = bind_value(query, record.get(column).unwrap_or(&Value::Null));
                }
            }
        }
        Ok(query)
    }
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

fn bind_value<'q>(
    query: Query<'q, Any, AnyArguments<'q>>,
    value: &Value,
) -> Query<'q, Any, AnyArguments<'q>> {
    match value {
        Value::Null => query.bind(Option::<String>::None),
        Value::Bool(b) => query.bind(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => query.bind(i),
            None => match n.as_f64() {
                Some(f) => query.bind(f),
                None => query.bind(n.to_string()),
            },
        },
        Value::String(s) => query.bind(s.clone()),
        // Nested values are stored as their JSON text.
        other => query.bind(other.to_string()),
    }
}

/// Read a JSON array of flat objects. `Ok(None)` when the file does not exist.
pub fn read_records(path: &Path) -> Result<Option<Vec<Record>>> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(e).with_context(|| format!("failed to read {}", path.display()));
        }
    };
    let records: Vec<Record> = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a JSON array of objects", path.display()))?;
    Ok(Some(records))
}

/// Insert every record into `table`, skipping rows that hit a uniqueness
/// constraint.
///
/// With `isolate_rows` each insert runs inside its own savepoint so that a
/// failing row inside a surrounding transaction rolls back alone. A row that
/// fails with a database error is counted and the load continues; any other
/// error (I/O, protocol, pool) aborts the load.
pub async fn load_records(
    conn: &mut AnyConnection,
    dialect: Dialect,
    table: &str,
    records: &[Record],
    isolate_rows: bool,
) -> Result<LoadOutcome> {
    let mut outcome = LoadOutcome {
        records: records.len(),
        ..LoadOutcome::default()
    };
    let Some(first) = records.first() else {
        debug!(target = "bulk_load", table, "no records; nothing to do");
        return Ok(outcome);
    };

    let columns: Vec<String> = first.keys().cloned().collect();
    if columns.is_empty() {
        warn!(target = "bulk_load", table, "first record has no keys; skipping table");
        for _ in records {
            outcome.record_failure("record has no columns".to_string());
        }
        return Ok(outcome);
    }

    let stmt = InsertStatement::new(dialect, table, &columns);
    debug!(target = "bulk_load", table, sql = stmt.sql(), "prepared insert");

    for (idx, record) in records.iter().enumerate() {
        let query = stmt.bind(record)?;
        let result = if isolate_rows {
            let mut savepoint = conn.begin().await?;
            match query.execute(&mut *savepoint).await {
                Ok(done) => {
                    savepoint.commit().await?;
                    Ok(done)
                }
                Err(e) => {
                    savepoint.rollback().await?;
                    Err(e)
                }
            }
        } else {
            query.execute(&mut *conn).await
        };

        match result {
            Ok(done) if done.rows_affected() > 0 => outcome.inserted += done.rows_affected(),
            Ok(_) => outcome.skipped += 1,
            Err(sqlx::Error::Database(db_err)) => {
                warn!(
                    target = "bulk_load",
                    table,
                    row = idx,
                    error = %db_err,
                    "row rejected; continuing"
                );
                outcome.record_failure(format!("row {idx}: {db_err}"));
            }
            Err(e) => {
                return Err(e).with_context(|| format!("insert into {table} failed at row {idx}"));
            }
        }
    }

    Ok(outcome)
}
