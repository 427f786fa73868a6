//! Export active legacy storefront accounts as normalized user records.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use store_migrate::cli::export_users::{self, ExportConfig, DEFAULT_OUTPUT};
use store_migrate::util::env;
use tracing::error;

#[derive(Parser, Debug)]
#[command(name = "export_users", version, about = "Export legacy storefront users to JSON")]
struct Args {
    /// Legacy database URL (default: LEGACY_DATABASE_URL or LEGACY_DB_* parts)
    #[arg(long)]
    db_url: Option<String>,
    /// Output JSON file
    #[arg(long, env = "EXPORT_OUTPUT", default_value = DEFAULT_OUTPUT)]
    output: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    env::init_env();
    store_migrate::tracing::init_tracing("info,sqlx=warn")?;
    env::bootstrap_cli("export_users", "LEGACY_");
    let args = Args::parse();

    let cfg = ExportConfig {
        database_url: args.db_url,
        output_path: args.output,
    };
    let output_path = cfg.output_path.clone();

    match export_users::run(cfg).await {
        Ok(stats) => {
            export_users::print_summary(&stats, &output_path);
            Ok(())
        }
        Err(e) => {
            error!(target = "export_users", error = %format!("{e:#}"), "export failed");
            Err(e)
        }
    }
}
