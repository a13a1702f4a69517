//! Database integration for seeding.
//!
//! The [`Seeder`] loads user records into `user_data` inside one transaction;
//! [`run`] wraps it with database and table provisioning.

mod seeder;

pub use seeder::{SeedReport, SeedSummary, Seeder, insert_data, run};
