use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static SCHEMA_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-z0-9_]+$").unwrap());

pub const MIN_LEN: usize = 3;
pub const MAX_LEN: usize = 30;

/// A validated PostgreSQL schema identifier.
///
/// Schema names are interpolated into `SET search_path` and DDL statements,
/// so the only way to get one is through [`SchemaName::parse`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SchemaName(String);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaNameError {
    Length(usize),
    Charset,
    Reserved,
}

impl fmt::Display for SchemaNameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaNameError::Length(len) => write!(
                f,
                "Schema name must be between {MIN_LEN} and {MAX_LEN} characters (got {len})"
            ),
            SchemaNameError::Charset => write!(
                f,
                "Schema name can only contain lowercase letters, numbers and underscores"
            ),
            SchemaNameError::Reserved => {
                write!(f, "Schema names starting with 'pg_' are reserved")
            }
        }
    }
}

impl std::error::Error for SchemaNameError {}

impl SchemaName {
    pub fn parse(raw: &str) -> Result<Self, SchemaNameError> {
        let len = raw.chars().count();
        if !(MIN_LEN..=MAX_LEN).contains(&len) {
            return Err(SchemaNameError::Length(len));
        }
        if !SCHEMA_RE.is_match(raw) {
            return Err(SchemaNameError::Charset);
        }
        if raw.starts_with("pg_") {
            return Err(SchemaNameError::Reserved);
        }
        Ok(SchemaName(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Double-quoted identifier, ready for interpolation into SQL.
    pub fn quoted(&self) -> String {
        format!("\"{}\"", self.0)
    }
}

impl fmt::Display for SchemaName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SchemaName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for SchemaName {
    type Error = SchemaNameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        SchemaName::parse(&value)
    }
}

impl From<SchemaName> for String {
    fn from(value: SchemaName) -> Self {
        value.0
    }
}
