//! Conversion between record batches and their CSV / JSON text encodings.
//!
//! Everything here is a pure function of its input: no I/O and no store
//! access. [`crate::transfer`] wires these into export and import.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::record::{Batch, Record};

mod delimited;
mod json;

pub use delimited::{parse_csv, to_csv};
pub use json::{parse_json, to_json};

#[derive(Debug, Error)]
pub enum TranscodeError {
    #[error("unsupported file format: {0}")]
    UnsupportedFormat(String),
    #[error("no data to encode")]
    NoData,
    #[error("input contains no header row")]
    Empty,
    #[error("expected records, found {0}")]
    NotRecords(String),
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("input is not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    Csv,
    Json,
}

impl FileFormat {
    pub const ALL: [FileFormat; 2] = [FileFormat::Csv, FileFormat::Json];

    /// Picks the format from a file name's extension (case-insensitive).
    pub fn from_file_name(name: &str) -> Result<Self, TranscodeError> {
        let lower = name.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|format| lower.ends_with(&format!(".{}", format.extension())))
            .ok_or_else(|| TranscodeError::UnsupportedFormat(name.to_string()))
    }

    pub fn extension(self) -> &'static str {
        match self {
            FileFormat::Csv => "csv",
            FileFormat::Json => "json",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            FileFormat::Csv => "text/csv",
            FileFormat::Json => "application/json",
        }
    }

    pub fn encode(self, batch: &[Record]) -> Result<String, TranscodeError> {
        match self {
            FileFormat::Csv => to_csv(batch),
            FileFormat::Json => to_json(batch),
        }
    }

    pub fn decode(self, text: &str) -> Result<Batch, TranscodeError> {
        match self {
            FileFormat::Csv => parse_csv(text),
            FileFormat::Json => parse_json(text),
        }
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for FileFormat {
    type Err = TranscodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().trim_start_matches('.');
        Self::ALL
            .into_iter()
            .find(|format| format.extension().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| TranscodeError::UnsupportedFormat(s.to_string()))
    }
}

/// Drops a leading UTF-8 byte order mark, as written by spreadsheet tools.
fn strip_bom(text: &str) -> &str {
    text.strip_prefix('\u{feff}').unwrap_or(text)
}
