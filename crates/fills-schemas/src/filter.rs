use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use serde_json::Value;

/// Caller-supplied mapping of column -> permitted values.
///
/// Absent columns and empty lists are unrestricted. Iteration order is by
/// column name so the rendered condition is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FilterSpec {
    columns: BTreeMap<String, Vec<String>>,
}

/// The filter payload is not a JSON object of string -> [string].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterSpecError {
    InvalidJson { reason: String },
    NotAnObject,
    NotAList { column: String },
    NotAString { column: String, index: usize },
}

impl fmt::Display for FilterSpecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidJson { reason } => write!(f, "filters are not valid JSON: {reason}"),
            Self::NotAnObject => write!(f, "filters must be a JSON object"),
            Self::NotAList { column } => {
                write!(f, "filter '{column}' must be a list of strings")
            }
            Self::NotAString { column, index } => {
                write!(f, "filter '{column}' value #{index} is not a string")
            }
        }
    }
}

impl std::error::Error for FilterSpecError {}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert; replaces any previous list for `column`.
    pub fn with<I, S>(mut self, column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns
            .insert(column.into(), values.into_iter().map(Into::into).collect());
        self
    }

    /// Parse the JSON-encoded string carried in request bodies.
    pub fn from_json_str(raw: &str) -> Result<Self, FilterSpecError> {
        let v: Value = serde_json::from_str(raw).map_err(|e| FilterSpecError::InvalidJson {
            reason: e.to_string(),
        })?;
        Self::from_value(&v)
    }

    pub fn from_value(v: &Value) -> Result<Self, FilterSpecError> {
        let obj = v.as_object().ok_or(FilterSpecError::NotAnObject)?;

        let mut columns = BTreeMap::new();
        for (column, vals) in obj {
            let arr = vals.as_array().ok_or_else(|| FilterSpecError::NotAList {
                column: column.clone(),
            })?;
            let mut out = Vec::with_capacity(arr.len());
            for (index, item) in arr.iter().enumerate() {
                let s = item.as_str().ok_or_else(|| FilterSpecError::NotAString {
                    column: column.clone(),
                    index,
                })?;
                out.push(s.to_string());
            }
            columns.insert(column.clone(), out);
        }
        Ok(Self { columns })
    }

    /// Columns with at least one permitted value, in column-name order.
    pub fn active(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.columns
            .iter()
            .filter(|(_, v)| !v.is_empty())
            .map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// True when no column restricts the selection.
    pub fn is_unrestricted(&self) -> bool {
        self.active().next().is_none()
    }
}
