//! Configuration for seeding runs.

use std::path::PathBuf;

use prodev::config::DbConfig;

/// CSV file loaded when none is given.
pub const DEFAULT_CSV_PATH: &str = "user_data.csv";

/// What to do with a CSV row that cannot become a user record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum MalformedRowPolicy {
    /// Log the row, count it and keep loading.
    #[default]
    Skip,
    /// Fail the load and roll back everything inserted so far.
    Abort,
}

/// Configuration for a full create-and-seed run.
#[derive(Debug, Clone)]
pub struct SeedConfig {
    /// Server and target database.
    pub db: DbConfig,

    /// CSV file to load.
    pub csv_path: PathBuf,

    /// Handling of malformed rows.
    pub on_malformed: MalformedRowPolicy,

    /// Log progress every this many rows.
    pub progress_interval: usize,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            db: DbConfig::default(),
            csv_path: PathBuf::from(DEFAULT_CSV_PATH),
            on_malformed: MalformedRowPolicy::Skip,
            progress_interval: 1000,
        }
    }
}

impl SeedConfig {
    /// Database settings from the environment, everything else default.
    pub fn from_env() -> Self {
        Self {
            db: DbConfig::from_env(),
            ..Self::default()
        }
    }

    pub fn with_csv_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.csv_path = path.into();
        self
    }

    pub fn with_policy(mut self, policy: MalformedRowPolicy) -> Self {
        self.on_malformed = policy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SeedConfig::default();
        assert_eq!(config.csv_path, PathBuf::from("user_data.csv"));
        assert_eq!(config.on_malformed, MalformedRowPolicy::Skip);
        assert_eq!(config.db.database, prodev::config::DEFAULT_DATABASE);
    }

    #[test]
    fn test_builders() {
        let config = SeedConfig::default()
            .with_csv_path("/tmp/users.csv")
            .with_policy(MalformedRowPolicy::Abort);
        assert_eq!(config.csv_path, PathBuf::from("/tmp/users.csv"));
        assert_eq!(config.on_malformed, MalformedRowPolicy::Abort);
    }
}
