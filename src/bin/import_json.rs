//! Load JSON record files into like-named tables, skipping rows that already
//! exist.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use store_migrate::cli::import_json::{self, CommitMode, ImportConfig, DEFAULT_FILES};
use store_migrate::util::env;

#[derive(Parser, Debug)]
#[command(name = "import_json", version, about = "Import JSON record files into database tables")]
struct Args {
    /// Destination database URL (default: DATABASE_URL or DB_* parts)
    #[arg(long)]
    db_url: Option<String>,
    /// Directory holding the JSON files
    #[arg(long, env = "IMPORT_DATA_DIR", default_value = "./data")]
    data_dir: PathBuf,
    /// Comma-separated file names, imported in order; each file stem is the table name
    #[arg(long, env = "IMPORT_FILES", value_delimiter = ',')]
    files: Option<Vec<String>>,
    /// Transaction scope for the run
    #[arg(long, value_enum, default_value_t = CommitMode::SingleTransaction)]
    commit_mode: CommitMode,
    /// Optional path for a JSON run report
    #[arg(long)]
    report: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env::init_env();
    store_migrate::tracing::init_tracing("info,sqlx=warn")?;
    env::bootstrap_cli("import_json", "");
    let args = Args::parse();

    let cfg = ImportConfig {
        database_url: args.db_url,
        data_dir: args.data_dir,
        files: args
            .files
            .unwrap_or_else(|| DEFAULT_FILES.iter().map(|f| f.to_string()).collect()),
        commit_mode: args.commit_mode,
        report_path: args.report,
    };

    let report = import_json::run(cfg).await?;
    import_json::print_summary(&report);
    Ok(())
}
