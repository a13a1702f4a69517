//! Seeding for the prodev `user_data` table.
//!
//! Creates the target database and table if they are missing, then loads users
//! from a CSV file. Every step is idempotent: rows whose `user_id` already exists
//! are skipped, and rows without a `user_id` get one derived from their contents.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use seed::prelude::*;
//!
//! let config = SeedConfig::from_env().with_csv_path("user_data.csv");
//! let summary = run(&config).await?;
//! println!("{} users inserted", summary.report.inserted);
//! ```

pub mod config;
pub mod db;
pub mod errors;
pub mod sources;

pub use errors::SeedError;

pub mod prelude {
    //! Convenient re-exports for common usage.

    pub use crate::config::{MalformedRowPolicy, SeedConfig};
    pub use crate::db::{SeedReport, SeedSummary, Seeder, insert_data, run};
    pub use crate::errors::SeedError;
    pub use crate::sources::CsvUserSource;
    pub use prodev::prelude::*;
}
