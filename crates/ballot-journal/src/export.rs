//! Export rendering shared by both ledgers.

use ballot_core::{Timestamp, ValidationError};
use chrono::{SecondsFormat, TimeZone, Utc};
use std::fmt;
use std::str::FromStr;

/// Output format for ledger exports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExportFormat {
    /// Pretty-printed JSON array
    #[default]
    Json,
    /// RFC 4180 CSV with a header row
    Csv,
}

impl FromStr for ExportFormat {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            other => Err(ValidationError::Malformed {
                field: "format".to_string(),
                reason: format!("unknown export format '{other}' (expected json or csv)"),
            }),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => f.write_str("json"),
            Self::Csv => f.write_str("csv"),
        }
    }
}

/// RFC 3339 UTC rendering with millisecond precision.
///
/// Falls back to raw milliseconds for instants chrono cannot represent.
pub fn rfc3339(timestamp: Timestamp) -> String {
    i64::try_from(timestamp.as_millis())
        .ok()
        .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_else(|| timestamp.as_millis().to_string())
}

/// Quote a CSV field when it contains a delimiter, quote or line break.
pub fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Join already-rendered fields into one CSV record (with trailing newline).
pub fn csv_record<I, S>(fields: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut line = fields
        .into_iter()
        .map(|field| csv_field(field.as_ref()))
        .collect::<Vec<_>>()
        .join(",");
    line.push('\n');
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_parses_case_insensitively() {
        assert_eq!("CSV".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert_eq!(" json ".parse::<ExportFormat>().unwrap(), ExportFormat::Json);
        assert!("xml".parse::<ExportFormat>().is_err());
    }

    #[test]
    fn fields_with_delimiters_are_quoted() {
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("Doe, Jane"), "\"Doe, Jane\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(csv_record(["a", "b,c"]), "a,\"b,c\"\n");
    }

    #[test]
    fn timestamps_render_as_utc() {
        assert_eq!(rfc3339(Timestamp::from_millis(1_000)), "1970-01-01T00:00:01.000Z");
        assert_eq!(rfc3339(Timestamp::from_millis(u64::MAX)), u64::MAX.to_string());
    }
}
