//! Connections and schema provisioning for the prodev database.
//!
//! Every helper takes a plain [`PgConnection`]: callers open one per phase and
//! close it when the phase ends, see [`close_quietly`].

use sqlx::postgres::PgConnectOptions;
use sqlx::{Connection, PgConnection};
use tracing::{debug, info, warn};

use crate::config::{DbConfig, validate_database_name};
use crate::errors::ProdevError;
use crate::models::{Provisioned, USER_TABLE};

const CREATE_USER_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS user_data (
        user_id UUID PRIMARY KEY,
        name VARCHAR(255) NOT NULL,
        email VARCHAR(255) NOT NULL,
        age DECIMAL NOT NULL
    )
"#;

const CREATE_USER_ID_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS user_data_user_id_idx ON user_data (user_id)";

const DATABASE_EXISTS: &str = "SELECT EXISTS (SELECT 1 FROM pg_database WHERE datname = $1)";

const TABLE_EXISTS: &str = "SELECT to_regclass($1) IS NOT NULL";

/// SQLSTATE codes a racing `CREATE DATABASE` can fail with.
const DUPLICATE_DATABASE: &str = "42P04";
const UNIQUE_VIOLATION: &str = "23505";

/// Connects to the server without selecting the target database.
pub async fn connect_db(config: &DbConfig) -> Result<PgConnection, ProdevError> {
    let options = config.server_options()?;
    connect_with_retry(&options, config).await
}

/// Connects to the target database. Fails if it does not exist.
pub async fn connect_to_prodev(config: &DbConfig) -> Result<PgConnection, ProdevError> {
    let options = config.database_options()?;
    connect_with_retry(&options, config).await
}

async fn connect_with_retry(
    options: &PgConnectOptions,
    config: &DbConfig,
) -> Result<PgConnection, ProdevError> {
    let target = format!(
        "{}:{}/{}",
        options.get_host(),
        options.get_port(),
        options.get_database().unwrap_or_default()
    );
    let attempts = config.connect_attempts.max(1);
    let mut attempt = 1;

    loop {
        match PgConnection::connect_with(options).await {
            Ok(conn) => {
                debug!("Connected to {target}");
                return Ok(conn);
            }
            Err(e) if attempt < attempts && is_transient(&e) => {
                warn!("Connection to {target} failed (attempt {attempt}/{attempts}): {e}");
                tokio::time::sleep(config.retry_delay).await;
                attempt += 1;
            }
            Err(source) => return Err(ProdevError::Connection { target, source }),
        }
    }
}

/// I/O-level failures may clear up; rejected credentials and missing databases won't.
fn is_transient(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut)
}

/// Logs a statement about to run, on one line.
pub(crate) fn log_statement(sql: &str) {
    debug!(
        "Executing SQL query: {}",
        sql.split_whitespace().collect::<Vec<_>>().join(" ")
    );
}

/// Closes a connection, logging instead of failing if the server went away.
pub async fn close_quietly(conn: PgConnection) {
    if let Err(e) = conn.close().await {
        warn!("Error closing connection: {e}");
    }
}

/// Creates the database `name` unless it already exists.
pub async fn create_database(
    conn: &mut PgConnection,
    name: &str,
) -> Result<Provisioned, ProdevError> {
    validate_database_name(name)?;
    let schema_error = |source| ProdevError::Schema {
        object: format!("database {name}"),
        source,
    };

    log_statement(DATABASE_EXISTS);
    let exists: bool = sqlx::query_scalar(DATABASE_EXISTS)
        .bind(name)
        .fetch_one(&mut *conn)
        .await
        .map_err(schema_error)?;

    if exists {
        info!("Database {name} already exists");
        return Ok(Provisioned::AlreadyExists);
    }

    // Identifiers cannot be bound; the name was validated above.
    let statement = format!(r#"CREATE DATABASE "{name}""#);
    log_statement(&statement);
    match sqlx::query(&statement).execute(&mut *conn).await {
        Ok(_) => {
            info!("Database {name} created");
            Ok(Provisioned::Created)
        }
        Err(sqlx::Error::Database(db_err))
            if matches!(
                db_err.code().as_deref(),
                Some(DUPLICATE_DATABASE | UNIQUE_VIOLATION)
            ) =>
        {
            info!("Database {name} already exists");
            Ok(Provisioned::AlreadyExists)
        }
        Err(e) => Err(schema_error(e)),
    }
}

/// Creates `user_data` and its `user_id` index unless they already exist.
pub async fn create_table(conn: &mut PgConnection) -> Result<Provisioned, ProdevError> {
    let schema_error = |source| ProdevError::Schema {
        object: format!("table {USER_TABLE}"),
        source,
    };

    log_statement(TABLE_EXISTS);
    let existed: bool = sqlx::query_scalar(TABLE_EXISTS)
        .bind(USER_TABLE)
        .fetch_one(&mut *conn)
        .await
        .map_err(schema_error)?;

    log_statement(CREATE_USER_TABLE);
    sqlx::query(CREATE_USER_TABLE)
        .execute(&mut *conn)
        .await
        .map_err(schema_error)?;
    log_statement(CREATE_USER_ID_INDEX);
    sqlx::query(CREATE_USER_ID_INDEX)
        .execute(&mut *conn)
        .await
        .map_err(schema_error)?;

    if existed {
        info!("Table {USER_TABLE} already exists");
        Ok(Provisioned::AlreadyExists)
    } else {
        info!("Table {USER_TABLE} created");
        Ok(Provisioned::Created)
    }
}
