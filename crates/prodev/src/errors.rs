use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProdevError {
    /// Server or database unreachable, or credentials rejected.
    #[error("Failed to connect to {target}")]
    Connection {
        target: String,
        #[source]
        source: sqlx::Error,
    },

    /// A create-database or create-table statement failed.
    #[error("Failed to create {object}")]
    Schema {
        object: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Invalid database name: {0:?}")]
    InvalidDatabaseName(String),

    #[error("Invalid database URL")]
    InvalidUrl(#[source] sqlx::Error),

    #[error("Page of {page_size} rows at offset {offset} is out of range")]
    PageOutOfRange { page_size: usize, offset: usize },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl ProdevError {
    pub fn is_connection(&self) -> bool {
        matches!(self, ProdevError::Connection { .. })
    }

    pub fn is_schema(&self) -> bool {
        matches!(self, ProdevError::Schema { .. })
    }
}
