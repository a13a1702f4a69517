//! Creates the prodev database and user_data table, then loads users from CSV.
//!
//! Run with:
//! ```
//! cargo run -p seed --bin seed
//! ```

use std::path::PathBuf;

use clap::Parser;
use prodev::config::{DEFAULT_DATABASE, DEFAULT_SERVER_URL, DbConfig};
use seed::config::{DEFAULT_CSV_PATH, MalformedRowPolicy, SeedConfig};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "seed", about = "Create user_data and load it from CSV")]
struct Args {
    /// Server URL; any database in it is ignored.
    #[arg(long, env = "DATABASE_URL", default_value = DEFAULT_SERVER_URL)]
    database_url: String,

    /// Database to create and seed.
    #[arg(long, env = "PRODEV_DATABASE", default_value = DEFAULT_DATABASE)]
    database: String,

    #[arg(long, env = "SEED_CSV", default_value = DEFAULT_CSV_PATH)]
    csv: PathBuf,

    #[arg(long, env = "SEED_ON_MALFORMED", value_enum, default_value = "skip")]
    on_malformed: MalformedRowPolicy,

    #[arg(long, env = "SEED_CONNECT_ATTEMPTS", default_value_t = 3)]
    connect_attempts: u32,
}

impl Args {
    fn into_config(self) -> SeedConfig {
        let db = DbConfig {
            server_url: self.database_url,
            ..DbConfig::default()
        }
        .with_database(self.database)
        .with_connect_attempts(self.connect_attempts);

        SeedConfig {
            db,
            ..SeedConfig::default()
        }
        .with_csv_path(self.csv)
        .with_policy(self.on_malformed)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Args::parse().into_config();
    let summary = seed::db::run(&config).await?;

    // Summary output
    tracing::info!("Seed completed!");
    tracing::info!("  Database {}: {}", config.db.database, summary.database.as_str());
    tracing::info!("  Table user_data: {}", summary.table.as_str());
    tracing::info!("  Inserted: {}", summary.report.inserted);
    tracing::info!("  Duplicates skipped: {}", summary.report.duplicates);
    tracing::info!("  Malformed rows skipped: {}", summary.report.malformed);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_arguments_uses_defaults() {
        let args = Args::try_parse_from(["seed"]).unwrap();
        let config = args.into_config();
        assert_eq!(config.csv_path, PathBuf::from(DEFAULT_CSV_PATH));
        assert_eq!(config.on_malformed, MalformedRowPolicy::Skip);
    }

    #[test]
    fn test_flags_override() {
        let args = Args::try_parse_from([
            "seed",
            "--database",
            "scratch",
            "--csv",
            "/data/users.csv",
            "--on-malformed",
            "abort",
            "--connect-attempts",
            "5",
        ])
        .unwrap();
        let config = args.into_config();
        assert_eq!(config.db.database, "scratch");
        assert_eq!(config.db.connect_attempts, 5);
        assert_eq!(config.csv_path, PathBuf::from("/data/users.csv"));
        assert_eq!(config.on_malformed, MalformedRowPolicy::Abort);
    }
}
