//! Loading users into `user_data`.

use std::path::Path;

use prodev::database::{
    close_quietly, connect_db, connect_to_prodev, create_database, create_table,
};
use prodev::models::{Provisioned, UserRecord};
use sqlx::{Connection, PgConnection};
use tracing::{info, warn};

use crate::config::{MalformedRowPolicy, SeedConfig};
use crate::errors::SeedError;
use crate::sources::CsvUserSource;

/// Outcome of one load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    /// Rows written.
    pub inserted: usize,
    /// Rows whose `user_id` was already present.
    pub duplicates: usize,
    /// Rows skipped as malformed.
    pub malformed: usize,
}

impl SeedReport {
    pub fn rows_read(&self) -> usize {
        self.inserted + self.duplicates + self.malformed
    }
}

/// Outcome of a full [`run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedSummary {
    pub database: Provisioned,
    pub table: Provisioned,
    pub report: SeedReport,
}

/// Inserts user records, skipping any whose primary key already exists.
pub struct Seeder {
    policy: MalformedRowPolicy,
    progress_interval: usize,
}

impl Seeder {
    /// Creates a seeder that skips malformed rows.
    pub fn new() -> Self {
        Self {
            policy: MalformedRowPolicy::Skip,
            progress_interval: 1000,
        }
    }

    pub fn from_config(config: &SeedConfig) -> Self {
        Self::new()
            .with_policy(config.on_malformed)
            .with_progress_interval(config.progress_interval)
    }

    pub fn with_policy(mut self, policy: MalformedRowPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_progress_interval(mut self, rows: usize) -> Self {
        self.progress_interval = rows.max(1);
        self
    }

    /// Loads every row of the CSV file at `csv_path`.
    pub async fn insert_data(
        &self,
        conn: &mut PgConnection,
        csv_path: impl AsRef<Path>,
    ) -> Result<SeedReport, SeedError> {
        let csv_path = csv_path.as_ref();
        info!("Seeding users from {}...", csv_path.display());

        let source = CsvUserSource::open(csv_path)?;
        let report = self.insert_records(conn, source).await?;

        info!(
            "Seeded users from {}: {} inserted, {} duplicates, {} malformed",
            csv_path.display(),
            report.inserted,
            report.duplicates,
            report.malformed
        );
        Ok(report)
    }

    /// Inserts records in a single transaction, committed once all rows are done.
    ///
    /// Under [`MalformedRowPolicy::Abort`] the first malformed or rejected row rolls back
    /// the whole load; other errors always do.
    pub async fn insert_records<I>(
        &self,
        conn: &mut PgConnection,
        records: I,
    ) -> Result<SeedReport, SeedError>
    where
        I: IntoIterator<Item = Result<UserRecord, SeedError>>,
    {
        let mut tx = conn.begin().await?;
        let mut report = SeedReport::default();

        for item in records {
            let outcome = match item {
                Ok(user) => insert_user(&mut *tx, &user).await,
                Err(e) => Err(e),
            };

            match outcome {
                Ok(true) => report.inserted += 1,
                Ok(false) => report.duplicates += 1,
                Err(e) if e.is_row_error() && self.policy == MalformedRowPolicy::Skip => {
                    warn!("Skipping row: {e}");
                    report.malformed += 1;
                }
                Err(e) => return Err(e),
            }

            let read = report.rows_read();
            if read % self.progress_interval == 0 {
                info!("  Processed {read} rows");
            }
        }

        tx.commit().await?;
        Ok(report)
    }
}

impl Default for Seeder {
    fn default() -> Self {
        Self::new()
    }
}

/// SQLSTATE class for values the column types refuse (too long, bad encoding, ...).
const DATA_EXCEPTION_CLASS: &str = "22";

/// Inserts one user under a savepoint. Returns `false` if the `user_id` was already taken.
///
/// A value the database refuses only rolls back its savepoint, leaving the surrounding
/// transaction usable, and is reported as [`SeedError::Rejected`].
async fn insert_user(conn: &mut PgConnection, user: &UserRecord) -> Result<bool, SeedError> {
    let mut savepoint = conn.begin().await?;

    let result = sqlx::query(
        r#"
        INSERT INTO user_data (user_id, name, email, age)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (user_id) DO NOTHING
        "#,
    )
    .bind(user.user_id)
    .bind(&user.name)
    .bind(&user.email)
    .bind(user.age)
    .execute(&mut *savepoint)
    .await;

    match result {
        Ok(done) => {
            savepoint.commit().await?;
            Ok(done.rows_affected() == 1)
        }
        Err(sqlx::Error::Database(db_err))
            if db_err
                .code()
                .is_some_and(|code| code.starts_with(DATA_EXCEPTION_CLASS)) =>
        {
            savepoint.rollback().await?;
            Err(SeedError::Rejected {
                user_id: user.user_id,
                reason: db_err.message().to_string(),
            })
        }
        Err(e) => Err(e.into()),
    }
}

/// Loads the CSV at `csv_path` with the default [`Seeder`].
pub async fn insert_data(
    conn: &mut PgConnection,
    csv_path: impl AsRef<Path>,
) -> Result<SeedReport, SeedError> {
    Seeder::new().insert_data(conn, csv_path).await
}

/// Creates the database and table if needed, then loads the configured CSV.
///
/// Each phase opens its own connection and closes it on the way out, whether or not
/// the phase succeeded.
pub async fn run(config: &SeedConfig) -> Result<SeedSummary, SeedError> {
    let mut server = connect_db(&config.db).await?;
    let database = create_database(&mut server, &config.db.database).await;
    close_quietly(server).await;
    let database = database?;

    let mut conn = connect_to_prodev(&config.db).await?;
    let loaded = create_and_load(&mut conn, config).await;
    close_quietly(conn).await;
    let (table, report) = loaded?;

    Ok(SeedSummary {
        database,
        table,
        report,
    })
}

async fn create_and_load(
    conn: &mut PgConnection,
    config: &SeedConfig,
) -> Result<(Provisioned, SeedReport), SeedError> {
    let table = create_table(conn).await?;
    let report = Seeder::from_config(config)
        .insert_data(conn, &config.csv_path)
        .await?;
    Ok((table, report))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_read() {
        let report = SeedReport {
            inserted: 3,
            duplicates: 2,
            malformed: 1,
        };
        assert_eq!(report.rows_read(), 6);
        assert_eq!(SeedReport::default().rows_read(), 0);
    }

    #[test]
    fn test_progress_interval_at_least_one() {
        let seeder = Seeder::new().with_progress_interval(0);
        assert_eq!(seeder.progress_interval, 1);
    }

    #[test]
    fn test_from_config() {
        let config = SeedConfig {
            on_malformed: MalformedRowPolicy::Abort,
            progress_interval: 10,
            ..SeedConfig::default()
        };
        let seeder = Seeder::from_config(&config);
        assert_eq!(seeder.policy, MalformedRowPolicy::Abort);
        assert_eq!(seeder.progress_interval, 10);
    }
}
