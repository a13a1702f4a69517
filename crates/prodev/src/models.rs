use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Table holding the seeded users.
pub const USER_TABLE: &str = "user_data";

/// Character limit of the `name` and `email` columns (`VARCHAR(255)`).
pub const TEXT_COLUMN_MAX_CHARS: usize = 255;

/// One row of `user_data`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserRecord {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub age: Decimal,
}

/// Whether a create-if-not-exists call did any work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provisioned {
    Created,
    AlreadyExists,
}

impl Provisioned {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provisioned::Created => "created",
            Provisioned::AlreadyExists => "already exists",
        }
    }
}
