//! Input sources for seed data.
//!
//! - [`CsvUserSource`]: stream users from a CSV file or any reader

mod csv_file;

pub use csv_file::{CsvUserSource, derive_user_id};
