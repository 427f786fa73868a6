use anyhow::{Context, Result};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::database_ops::legacy_users::fetch_legacy_users;
use crate::normalization::user::{ExportStats, ProcessedUser};
use crate::util::db::Db;
use crate::util::env::{self as env_util, DsnDefaults};

pub const DEFAULT_OUTPUT: &str = "./usuarios_woocommerce.json";

#[derive(Debug, Clone)]
pub struct ExportConfig {
    /// Legacy store URL; falls back to LEGACY_DATABASE_URL / LEGACY_DB_* env.
    pub database_url: Option<String>,
    pub output_path: PathBuf,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            output_path: PathBuf::from(DEFAULT_OUTPUT),
        }
    }
}

/// Export every active legacy account to `cfg.output_path`.
///
/// The connection is closed before any error is returned, and the output
/// file is only replaced once the whole document has been written.
pub async fn run(cfg: ExportConfig) -> Result<ExportStats> {
    env_util::init_env();
    let database_url =
        env_util::db_url(cfg.database_url.as_deref(), "LEGACY_", DsnDefaults::MYSQL)?;
    env_util::log_snapshot(
        "export_users",
        &[
            ("LEGACY_DATABASE_URL", database_url.clone()),
            ("OUTPUT_PATH", cfg.output_path.display().to_string()),
        ],
    );

    let db = Db::connect(&database_url, 1).await?;
    let result = export_with(&db, &cfg.output_path).await;
    db.close().await;
    result
}

pub async fn export_with(db: &Db, output_path: &Path) -> Result<ExportStats> {
    let mut conn = db.pool.acquire().await.context("failed to acquire connection")?;
    let rows = fetch_legacy_users(&mut conn).await?;
    drop(conn);

    let total_rows = rows.len();
    let users: Vec<ProcessedUser> = rows.into_iter().map(ProcessedUser::from_legacy).collect();

    info!(
        target = "export_users",
        users = users.len(),
        path = %output_path.display(),
        "writing export"
    );
    write_json_atomic(output_path, &users)?;

    Ok(ExportStats::collect(total_rows, &users))
}

/// Pretty-print `value` into a temporary file beside `path`, then rename it
/// into place.
fn write_json_atomic<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let tmp = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("failed to create temp file in {}", dir.display()))?;

    let mut writer = BufWriter::new(tmp.as_file());
    serde_json::to_writer_pretty(&mut writer, value).context("failed to serialize export")?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    drop(writer);

    tmp.persist(path)
        .with_context(|| format!("failed to move export into {}", path.display()))?;
    Ok(())
}

pub fn print_summary(stats: &ExportStats, output_path: &Path) {
    println!("Export complete:");
    println!("  - rows processed: {}", stats.total_rows);
    println!("  - users exported: {}", stats.exported);
    println!("  - file: {}", output_path.display());
    println!();
    println!("Statistics:");
    println!("  - users with profile image: {}", stats.with_avatar);
    println!("  - users with social links: {}", stats.with_links);
    println!("  - administrators: {}", stats.admins);
}
