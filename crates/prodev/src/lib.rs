//! Storage layer for the prodev `user_data` table.
//!
//! Provides connection configuration, connection and schema helpers used by the
//! seeder, and lazy read-side queries over the seeded users.
//!
//! ```rust,ignore
//! use prodev::prelude::*;
//!
//! let config = DbConfig::from_env();
//! let mut server = connect_db(&config).await?;
//! create_database(&mut server, &config.database).await?;
//! close_quietly(server).await;
//!
//! let mut conn = connect_to_prodev(&config).await?;
//! create_table(&mut conn).await?;
//! let average = compute_average_age(&mut conn).await?;
//! ```

pub mod config;
pub mod database;
pub mod errors;
pub mod models;
pub mod users;

pub use errors::ProdevError;

pub mod prelude {
    //! Convenient re-exports for common usage.

    pub use crate::config::{DEFAULT_DATABASE, DEFAULT_SERVER_URL, DbConfig};
    pub use crate::database::{
        close_quietly, connect_db, connect_to_prodev, create_database, create_table,
    };
    pub use crate::errors::ProdevError;
    pub use crate::models::{Provisioned, TEXT_COLUMN_MAX_CHARS, USER_TABLE, UserRecord};
    pub use crate::users::{
        batch_processing, compute_average_age, count_users, fetch_all_users, fetch_concurrently,
        fetch_users_older_than, paginate_users, stream_user_ages, stream_users,
        stream_users_in_batches,
    };
}
