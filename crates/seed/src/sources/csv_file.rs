//! CSV user source.

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use csv::{ReaderBuilder, StringRecord, Trim};
use prodev::models::{TEXT_COLUMN_MAX_CHARS, UserRecord};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::errors::SeedError;

/// Namespace for ids derived from row contents.
const USER_ID_NAMESPACE: Uuid = Uuid::from_u128(0x6f1c_2a57_93d4_4e0b_a8f2_51c7_0e3b_9d14);

/// Positions of the known columns in the header row.
#[derive(Debug, Clone, Copy)]
struct Columns {
    user_id: Option<usize>,
    name: usize,
    email: usize,
    age: usize,
}

impl Columns {
    fn from_headers(headers: &StringRecord) -> Result<Self, SeedError> {
        let find = |column: &str| {
            headers
                .iter()
                .position(|h| h.eq_ignore_ascii_case(column))
        };
        let require = |column: &str| {
            find(column).ok_or_else(|| {
                SeedError::data_format(1, format!("missing required column `{column}`"))
            })
        };

        Ok(Self {
            user_id: find("user_id"),
            name: require("name")?,
            email: require("email")?,
            age: require("age")?,
        })
    }
}

/// Lazily reads [`UserRecord`]s from CSV, one row per `next()`.
///
/// Expects a header row naming `name`, `email`, `age` and optionally `user_id`, in any
/// order. Rows that cannot become a record are yielded as [`SeedError::DataFormat`] and
/// reading continues with the next row; any other error ends the iteration.
pub struct CsvUserSource<R> {
    reader: csv::Reader<R>,
    columns: Columns,
    record: StringRecord,
    finished: bool,
}

impl CsvUserSource<File> {
    /// Opens a CSV file and reads its header row.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SeedError> {
        let path = path.as_ref();
        let reader = Self::builder()
            .from_path(path)
            .map_err(|source| SeedError::OpenCsv {
                path: path.to_path_buf(),
                source,
            })?;

        Self::with_reader(reader)
    }
}

impl<R: Read> CsvUserSource<R> {
    /// Reads CSV from any reader, e.g. in-memory bytes.
    pub fn from_reader(reader: R) -> Result<Self, SeedError> {
        Self::with_reader(Self::builder().from_reader(reader))
    }

    fn builder() -> ReaderBuilder {
        let mut builder = ReaderBuilder::new();
        // Short rows are reported as malformed records rather than reader errors.
        builder.has_headers(true).flexible(true).trim(Trim::All);
        builder
    }

    fn with_reader(mut reader: csv::Reader<R>) -> Result<Self, SeedError> {
        let columns = Columns::from_headers(reader.headers()?)?;

        Ok(Self {
            reader,
            columns,
            record: StringRecord::new(),
            finished: false,
        })
    }

    fn parse_record(&self, line: u64) -> Result<UserRecord, SeedError> {
        let field = |index: usize| self.record.get(index).filter(|value| !value.is_empty());
        let required = |index: usize, column: &str| {
            field(index).ok_or_else(|| {
                SeedError::data_format(line, format!("missing required field `{column}`"))
            })
        };

        let name = required(self.columns.name, "name")?;
        let email = required(self.columns.email, "email")?;
        check_text(line, "name", name)?;
        check_text(line, "email", email)?;
        let age_raw = required(self.columns.age, "age")?;
        let age = Decimal::from_str(age_raw).map_err(|e| {
            SeedError::data_format(line, format!("invalid age `{age_raw}`: {e}"))
        })?;

        let user_id = match self.columns.user_id.and_then(field) {
            Some(raw) => Uuid::parse_str(raw).map_err(|e| {
                SeedError::data_format(line, format!("invalid user_id `{raw}`: {e}"))
            })?,
            None => derive_user_id(name, email, age),
        };

        Ok(UserRecord {
            user_id,
            name: name.to_string(),
            email: email.to_string(),
            age,
        })
    }
}

impl<R: Read> Iterator for CsvUserSource<R> {
    type Item = Result<UserRecord, SeedError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        match self.reader.read_record(&mut self.record) {
            Ok(true) => {
                let line = self.record.position().map_or(0, |p| p.line());
                Some(self.parse_record(line))
            }
            Ok(false) => {
                self.finished = true;
                None
            }
            Err(e) => {
                // Bad encoding spoils one record; anything else spoils the reader.
                if let csv::ErrorKind::Utf8 { pos, err } = e.kind() {
                    let line = pos.as_ref().map_or(0, |p| p.line());
                    return Some(Err(SeedError::data_format(line, err.to_string())));
                }
                self.finished = true;
                Some(Err(e.into()))
            }
        }
    }
}

/// Rejects text the `VARCHAR` columns would refuse.
fn check_text(line: u64, column: &str, value: &str) -> Result<(), SeedError> {
    if value.contains('\0') {
        return Err(SeedError::data_format(
            line,
            format!("field `{column}` contains a NUL character"),
        ));
    }
    if value.chars().count() > TEXT_COLUMN_MAX_CHARS {
        return Err(SeedError::data_format(
            line,
            format!("field `{column}` is longer than {TEXT_COLUMN_MAX_CHARS} characters"),
        ));
    }
    Ok(())
}

/// Derives a stable id for a row that has none, so reloading the same file
/// produces the same keys.
pub fn derive_user_id(name: &str, email: &str, age: Decimal) -> Uuid {
    let key = format!("{name}\u{1f}{email}\u{1f}{}", age.normalize());
    Uuid::new_v5(&USER_ID_NAMESPACE, key.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_all(data: &str) -> Vec<Result<UserRecord, SeedError>> {
        CsvUserSource::from_reader(data.as_bytes())
            .expect("valid header")
            .collect()
    }

    #[test]
    fn test_single_row_gets_generated_id() {
        let rows = read_all("name,email,age\nAlice,alice@example.com,30\n");
        assert_eq!(rows.len(), 1);

        let user = rows[0].as_ref().unwrap();
        assert_eq!(user.name, "Alice");
        assert_eq!(user.email, "alice@example.com");
        assert_eq!(user.age, Decimal::from(30));
        assert_eq!(
            user.user_id,
            derive_user_id("Alice", "alice@example.com", Decimal::from(30))
        );
    }

    #[test]
    fn test_explicit_user_id_is_kept() {
        let id = Uuid::new_v4();
        let data = format!("user_id,name,email,age\n{id},Bob,bob@example.com,41.5\n");
        let rows = read_all(&data);

        let user = rows[0].as_ref().unwrap();
        assert_eq!(user.user_id, id);
        assert_eq!(user.age, Decimal::from_str("41.5").unwrap());
    }

    #[test]
    fn test_empty_user_id_falls_back_to_derived() {
        let rows = read_all("user_id,name,email,age\n,Carol,carol@example.com,22\n");
        let user = rows[0].as_ref().unwrap();
        assert_eq!(
            user.user_id,
            derive_user_id("Carol", "carol@example.com", Decimal::from(22))
        );
    }

    #[test]
    fn test_column_order_and_whitespace() {
        let rows = read_all(" age , Email , name \n 30 , dave@example.com , Dave \n");
        let user = rows[0].as_ref().unwrap();
        assert_eq!(user.name, "Dave");
        assert_eq!(user.email, "dave@example.com");
        assert_eq!(user.age, Decimal::from(30));
    }

    #[test]
    fn test_malformed_rows_are_reported_and_skipped() {
        let data = "name,email,age\n\
                    Alice,alice@example.com,30\n\
                    ,nobody@example.com,40\n\
                    Bob,,50\n\
                    Carol,carol@example.com\n\
                    Dan,dan@example.com,old\n\
                    Eve,eve@example.com,28\n";
        let rows = read_all(data);
        assert_eq!(rows.len(), 6);

        let ok: Vec<_> = rows.iter().filter_map(|r| r.as_ref().ok()).collect();
        assert_eq!(ok.len(), 2);
        assert_eq!(ok[0].name, "Alice");
        assert_eq!(ok[1].name, "Eve");

        let lines: Vec<u64> = rows
            .iter()
            .filter_map(|r| match r {
                Err(SeedError::DataFormat { line, .. }) => Some(*line),
                _ => None,
            })
            .collect();
        assert_eq!(lines, vec![3, 4, 5, 6]);
    }

    #[test]
    fn test_text_the_table_would_refuse_is_malformed() {
        let long_name = "x".repeat(300);
        let long_email = format!("{}@example.com", "y".repeat(250));
        let data = format!(
            "name,email,age\n\
             Alice,alice@example.com,30\n\
             {long_name},long@example.com,40\n\
             Long Email,{long_email},41\n\
             B\0b,bob@example.com,35\n\
             Carol,car\0ol@example.com,36\n\
             Dave,dave@example.com,37\n"
        );
        let rows = read_all(&data);
        assert_eq!(rows.len(), 6);

        let names: Vec<&str> = rows
            .iter()
            .filter_map(|r| r.as_ref().ok())
            .map(|u| u.name.as_str())
            .collect();
        assert_eq!(names, vec!["Alice", "Dave"]);

        let lines: Vec<u64> = rows
            .iter()
            .filter_map(|r| match r {
                Err(SeedError::DataFormat { line, .. }) => Some(*line),
                _ => None,
            })
            .collect();
        assert_eq!(lines, vec![3, 4, 5, 6]);
    }

    #[test]
    fn test_name_at_column_limit_is_accepted() {
        // Multi-byte characters count once each.
        let name = "é".repeat(TEXT_COLUMN_MAX_CHARS);
        let rows = read_all(&format!("name,email,age\n{name},e@example.com,30\n"));
        assert_eq!(rows[0].as_ref().unwrap().name, name);
    }

    #[test]
    fn test_invalid_user_id_is_malformed() {
        let rows = read_all("user_id,name,email,age\nnot-a-uuid,Frank,frank@example.com,33\n");
        assert!(rows[0].as_ref().unwrap_err().is_data_format());
    }

    #[test]
    fn test_missing_header_column_fails_open() {
        let result = CsvUserSource::from_reader("name,email\nAlice,alice@example.com\n".as_bytes());
        match result {
            Err(SeedError::DataFormat { line, reason }) => {
                assert_eq!(line, 1);
                assert!(reason.contains("age"));
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("expected missing column error"),
        }
    }

    #[test]
    fn test_derived_id_is_stable_and_distinct() {
        let a = derive_user_id("Alice", "alice@example.com", Decimal::from(30));
        let b = derive_user_id("Alice", "alice@example.com", Decimal::from_str("30.0").unwrap());
        let c = derive_user_id("Alice", "alice@example.org", Decimal::from(30));

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_source_is_restartable() {
        let data = "name,email,age\nAlice,alice@example.com,30\nBob,bob@example.com,35\n";
        let first: Vec<Uuid> = read_all(data)
            .into_iter()
            .map(|r| r.unwrap().user_id)
            .collect();
        let second: Vec<Uuid> = read_all(data)
            .into_iter()
            .map(|r| r.unwrap().user_id)
            .collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_open_missing_file() {
        let result = CsvUserSource::open("/nonexistent/user_data.csv");
        assert!(matches!(result, Err(SeedError::OpenCsv { .. })));
    }
}
