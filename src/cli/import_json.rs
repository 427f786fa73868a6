use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::database_ops::bulk_load::{load_records, read_records, LoadOutcome};
use crate::util::db::Db;
use crate::util::env::{self as env_util, DsnDefaults};

/// Tables imported when no file list is given, in load order.
pub const DEFAULT_FILES: [&str; 4] = [
    "artwork_types.json",
    "techniques.json",
    "locations.json",
    "artists.json",
];

/// Transaction scope for an import run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum CommitMode {
    /// One transaction for the whole run with a savepoint per row.
    #[default]
    SingleTransaction,
    /// Every row commits on its own.
    PerRow,
}

#[derive(Debug, Clone)]
pub struct ImportConfig {
    /// Destination database URL; falls back to DATABASE_URL / DB_* env.
    pub database_url: Option<String>,
    pub data_dir: PathBuf,
    /// JSON file names under `data_dir`; each file stem names its table.
    pub files: Vec<String>,
    pub commit_mode: CommitMode,
    /// Where to write the JSON run report, if anywhere.
    pub report_path: Option<PathBuf>,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            data_dir: PathBuf::from("./data"),
            files: DEFAULT_FILES.iter().map(|f| f.to_string()).collect(),
            commit_mode: CommitMode::default(),
            report_path: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TableStatus {
    Loaded,
    Missing,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableReport {
    pub table: String,
    pub file: PathBuf,
    pub status: TableStatus,
    #[serde(flatten)]
    pub outcome: LoadOutcome,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportTotals {
    pub tables: usize,
    pub missing: usize,
    pub inserted: u64,
    pub skipped: u64,
    pub failed: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub commit_mode: CommitMode,
    pub tables: Vec<TableReport>,
    pub totals: ImportTotals,
}

impl ImportReport {
    fn new(commit_mode: CommitMode) -> Self {
        let now = Utc::now();
        Self {
            started_at: now,
            finished_at: now,
            commit_mode,
            tables: Vec::new(),
            totals: ImportTotals::default(),
        }
    }

    fn push(&mut self, table: TableReport) {
        self.totals.tables += 1;
        if table.status == TableStatus::Missing {
            self.totals.missing += 1;
        }
        self.totals.inserted += table.outcome.inserted;
        self.totals.skipped += table.outcome.skipped;
        self.totals.failed += table.outcome.failed;
        self.tables.push(table);
    }
}

/// Table name for an input file: the file name without its extension.
pub fn table_name(file: &str) -> Result<String> {
    Path::new(file)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .with_context(|| format!("cannot derive a table name from {file:?}"))
}

/// Connect, import every configured file, then close the connection whether
/// or not the import succeeded.
pub async fn run(cfg: ImportConfig) -> Result<ImportReport> {
    env_util::init_env();
    let database_url = env_util::db_url(cfg.database_url.as_deref(), "", DsnDefaults::POSTGRES)?;
    env_util::log_snapshot(
        "import_json",
        &[
            ("DATABASE_URL", database_url.clone()),
            ("DATA_DIR", cfg.data_dir.display().to_string()),
            ("FILES", cfg.files.join(",")),
        ],
    );

    let db = Db::connect(&database_url, 1).await?;
    let result = import_with(&db, &cfg).await;
    db.close().await;
    let report = result?;

    if let Some(path) = &cfg.report_path {
        write_report(path, &report)?;
        info!(target = "import_json", path = %path.display(), "report written");
    }
    Ok(report)
}

/// Import every configured file through an already open connection.
pub async fn import_with(db: &Db, cfg: &ImportConfig) -> Result<ImportReport> {
    let mut report = ImportReport::new(cfg.commit_mode);
    let mut conn = db.pool.acquire().await.context("failed to acquire connection")?;

    match cfg.commit_mode {
        CommitMode::SingleTransaction => {
            let mut tx = sqlx::Connection::begin(&mut *conn).await?;
            for file in &cfg.files {
                report.push(import_file(&mut tx, db, &cfg.data_dir, file, true).await?);
            }
            tx.commit().await.context("commit failed")?;
            info!(target = "import_json", "transaction committed");
        }
        CommitMode::PerRow => {
            for file in &cfg.files {
                report.push(import_file(&mut conn, db, &cfg.data_dir, file, false).await?);
            }
        }
    }

    report.finished_at = Utc::now();
    info!(
        target = "import_json",
        tables = report.totals.tables,
        missing = report.totals.missing,
        inserted = report.totals.inserted,
        skipped = report.totals.skipped,
        failed = report.totals.failed,
        "import finished"
    );
    Ok(report)
}

async fn import_file(
    conn: &mut sqlx::AnyConnection,
    db: &Db,
    data_dir: &Path,
    file: &str,
    isolate_rows: bool,
) -> Result<TableReport> {
    let table = table_name(file)?;
    let path = data_dir.join(file);

    let Some(records) = read_records(&path)? else {
        warn!(
            target = "import_json",
            table = %table,
            path = %path.display(),
            "input file not found; skipping table"
        );
        return Ok(TableReport {
            table,
            file: path,
            status: TableStatus::Missing,
            outcome: LoadOutcome::default(),
        });
    };

    info!(target = "import_json", table = %table, records = records.len(), "loading");
    let outcome = load_records(conn, db.dialect, &table, &records, isolate_rows).await?;
    info!(
        target = "import_json",
        table = %table,
        inserted = outcome.inserted,
        skipped = outcome.skipped,
        failed = outcome.failed,
        "table done"
    );

    Ok(TableReport {
        table,
        file: path,
        status: TableStatus::Loaded,
        outcome,
    })
}

fn write_report(path: &Path, report: &ImportReport) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))
}

/// Human-readable summary for stdout.
pub fn print_summary(report: &ImportReport) {
    println!("Import summary:");
    for t in &report.tables {
        match t.status {
            TableStatus::Missing => println!("  - {}: file missing ({})", t.table, t.file.display()),
            TableStatus::Loaded => println!(
                "  - {}: {} records, {} inserted, {} already present, {} failed",
                t.table, t.outcome.records, t.outcome.inserted, t.outcome.skipped, t.outcome.failed
            ),
        }
    }
    println!(
        "  total inserted: {} (tables: {}, missing files: {})",
        report.totals.inserted, report.totals.tables, report.totals.missing
    );
}
