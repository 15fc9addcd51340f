//! Spreadsheet row records and row sources.
//!
//! Rows arrive already converted from the uploaded workbook. Cells may be
//! text, numbers or booleans; all are read as text.

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// One uploaded row.
///
/// The title may arrive under `title` or the secondary `event` column, and
/// the unit token under `unit` or `school`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RowRecord {
    #[serde(default, deserialize_with = "cell_text")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "cell_text")]
    pub event: Option<String>,
    #[serde(default, deserialize_with = "cell_text")]
    pub date: Option<String>,
    #[serde(default, alias = "school", deserialize_with = "cell_text")]
    pub unit: Option<String>,
}

impl RowRecord {
    pub fn new(title: impl Into<String>, date: impl Into<String>, unit: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            event: None,
            date: Some(date.into()),
            unit: Some(unit.into()),
        }
    }

    /// Title text, preferring `title` and falling back to `event` when the
    /// primary column is absent or blank.
    pub fn title_text(&self) -> Option<&str> {
        non_blank(self.title.as_deref()).or_else(|| non_blank(self.event.as_deref()))
    }

    pub fn date_text(&self) -> Option<&str> {
        non_blank(self.date.as_deref())
    }

    pub fn unit_token(&self) -> Option<&str> {
        non_blank(self.unit.as_deref())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|text| !text.trim().is_empty())
}

fn cell_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) => Ok(Some(text)),
        Some(Value::Number(number)) => Ok(Some(number.to_string())),
        Some(Value::Bool(flag)) => Ok(Some(flag.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "unsupported cell value: {other}"
        ))),
    }
}

/// Failure to produce rows from an upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowSourceError(pub String);

impl Display for RowSourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "uploaded file is not valid: {}", self.0)
    }
}

impl Error for RowSourceError {}

/// Supplier of ordered rows for one batch.
pub trait RowSource {
    fn rows(&self) -> Result<Vec<RowRecord>, RowSourceError>;
}

impl RowSource for [RowRecord] {
    fn rows(&self) -> Result<Vec<RowRecord>, RowSourceError> {
        Ok(self.to_vec())
    }
}

impl RowSource for Vec<RowRecord> {
    fn rows(&self) -> Result<Vec<RowRecord>, RowSourceError> {
        Ok(self.clone())
    }
}

/// Rows from a JSON array of objects, as produced by the sheet converter.
pub struct JsonRowSource {
    payload: String,
}

impl JsonRowSource {
    pub fn new(payload: impl Into<String>) -> Self {
        Self {
            payload: payload.into(),
        }
    }
}

impl RowSource for JsonRowSource {
    fn rows(&self) -> Result<Vec<RowRecord>, RowSourceError> {
        let value: Value = serde_json::from_str(&self.payload)
            .map_err(|err| RowSourceError(format!("malformed json: {err}")))?;
        if !value.is_array() {
            return Err(RowSourceError("expected an array of rows".to_string()));
        }
        serde_json::from_value(value).map_err(|err| RowSourceError(format!("invalid row: {err}")))
    }
}
