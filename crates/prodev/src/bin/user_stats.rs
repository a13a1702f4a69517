//! Prints summary statistics for the seeded users.
//!
//! Run with:
//! ```
//! cargo run -p prodev --bin user-stats -- --older-than 25
//! ```

use clap::Parser;
use prodev::prelude::*;
use rust_decimal::Decimal;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "user-stats", about = "Summarize the users in user_data")]
struct Args {
    #[arg(long, env = "DATABASE_URL", default_value = DEFAULT_SERVER_URL)]
    database_url: String,

    #[arg(long, env = "PRODEV_DATABASE", default_value = DEFAULT_DATABASE)]
    database: String,

    /// Also list users strictly older than this age.
    #[arg(long)]
    older_than: Option<Decimal>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = DbConfig {
        server_url: args.database_url,
        database: args.database,
        ..DbConfig::default()
    };

    let mut conn = connect_to_prodev(&config).await?;
    let summary = summarize(&mut conn).await;
    close_quietly(conn).await;
    summary?;

    if let Some(min_age) = args.older_than {
        let (all, older) = fetch_concurrently(&config, min_age).await?;

        tracing::info!("Users older than {min_age}: {} of {}", older.len(), all.len());
        for user in &older {
            tracing::info!("  {} <{}> age {} ({})", user.name, user.email, user.age, user.user_id);
        }
    }

    Ok(())
}

async fn summarize(conn: &mut sqlx::PgConnection) -> anyhow::Result<()> {
    let count = count_users(conn).await?;
    let average = compute_average_age(conn).await?;

    tracing::info!("Users: {count}");
    tracing::info!("Average age: {}", average.round_dp(2));
    Ok(())
}
