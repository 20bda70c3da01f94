use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AppError;

/// One day of the study plan. `date` is a year-less `"month.day"` string.
///
/// A numeric `date` is rejected: `5.10` and `5.1` are the same number.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayEntry {
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub dues: Vec<String>,
    #[serde(default)]
    pub start: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchedulePlan(pub Vec<DayEntry>);

impl SchedulePlan {
    /// Accepts a bare array of day entries, or an object wrapping one
    /// (JSON response mode forces providers to answer with an object).
    pub fn from_value(value: Value) -> Result<Self, AppError> {
        let entries = match value {
            Value::Array(_) => value,
            Value::Object(map) => map
                .into_iter()
                .map(|(_, v)| v)
                .find(Value::is_array)
                .ok_or_else(|| {
                    AppError::InvalidOutput("schedule object contains no day list".to_string())
                })?,
            other => {
                return Err(AppError::InvalidOutput(format!(
                    "schedule must be a JSON array, got: {}",
                    other
                )));
            }
        };

        serde_json::from_value(entries)
            .map(SchedulePlan)
            .map_err(|e| AppError::InvalidOutput(format!("schedule: {}", e)))
    }

    pub fn entries(&self) -> &[DayEntry] {
        &self.0
    }
}
