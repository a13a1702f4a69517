use std::path::PathBuf;

use prodev::ProdevError;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum SeedError {
    /// Connection and schema failures from the storage layer.
    #[error(transparent)]
    Prodev(#[from] ProdevError),

    /// A CSV row (or the header) lacks a required field or holds an unparsable value.
    #[error("Malformed CSV at line {line}: {reason}")]
    DataFormat { line: u64, reason: String },

    /// A well-formed record the database refused to store.
    #[error("Row for user {user_id} rejected by the database: {reason}")]
    Rejected { user_id: Uuid, reason: String },

    #[error("Failed to open CSV file {}", path.display())]
    OpenCsv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl SeedError {
    pub(crate) fn data_format(line: u64, reason: impl Into<String>) -> Self {
        SeedError::DataFormat {
            line,
            reason: reason.into(),
        }
    }

    pub fn is_data_format(&self) -> bool {
        matches!(self, SeedError::DataFormat { .. })
    }

    /// Errors confined to a single row, which the skip policy tolerates.
    pub fn is_row_error(&self) -> bool {
        matches!(
            self,
            SeedError::DataFormat { .. } | SeedError::Rejected { .. }
        )
    }
}
