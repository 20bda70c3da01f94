use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AppError;

/// Structured syllabus analysis produced by the syllabus agent.
///
/// Stored wholesale per (username, course_id); never merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyllabusAnalysis {
    #[serde(default)]
    pub tasks: BTreeMap<String, TaskEstimate>,
    #[serde(default, deserialize_with = "lenient_strings")]
    pub topic: Vec<String>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub contains_schedule: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thought: Option<String>,
}

/// Per-task estimate. Decoding never fails: shapes the model invents are
/// read as far as they go and the rest is left empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value")]
pub struct TaskEstimate {
    pub difficulty: String,
    /// Estimated duration range in days, usually `[min, max]`.
    pub day_needed: Vec<f64>,
}

static NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:\.\d+)?").expect("valid number regex"));

impl From<Value> for TaskEstimate {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(mut map) => Self {
                difficulty: map.remove("difficulty").map(scalar_text).unwrap_or_default(),
                day_needed: map.remove("day_needed").map(days).unwrap_or_default(),
            },
            Value::String(difficulty) => Self {
                difficulty,
                day_needed: Vec::new(),
            },
            _ => Self::default(),
        }
    }
}

fn scalar_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

/// `[7, 14]`, `[0.5, "1"]`, `"7-14"`, `"3 days"` or `5`.
fn days(value: Value) -> Vec<f64> {
    match value {
        Value::Number(n) => n.as_f64().into_iter().collect(),
        Value::String(s) => NUMBER
            .find_iter(&s)
            .filter_map(|m| m.as_str().parse().ok())
            .collect(),
        Value::Array(items) => items.into_iter().flat_map(days).collect(),
        _ => Vec::new(),
    }
}

impl SyllabusAnalysis {
    pub fn from_value(value: Value) -> Result<Self, AppError> {
        if !value.is_object() {
            return Err(AppError::InvalidOutput(format!(
                "syllabus analysis must be a JSON object, got: {}",
                value
            )));
        }
        serde_json::from_value(value)
            .map_err(|e| AppError::InvalidOutput(format!("syllabus analysis: {}", e)))
    }
}

/// Models sometimes emit booleans as `"true"` / `"false"` strings.
pub(crate) fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Bool(b) => Ok(b),
        Value::Null => Ok(false),
        Value::String(s) => Ok(s.trim().eq_ignore_ascii_case("true")),
        Value::Number(n) => Ok(n.as_f64().is_some_and(|v| v != 0.0)),
        other => Err(de::Error::custom(format!("expected a boolean, got {}", other))),
    }
}

/// A list of strings, or a single string standing in for one.
fn lenient_strings<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .map(scalar_text)
            .filter(|s| !s.is_empty())
            .collect(),
        Value::String(s) => vec![s],
        _ => Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_prompt_example_with_string_flag() {
        let value = json!({
            "tasks": {
                "Lab": {"difficulty": "Hard", "day_needed": [7, 14]},
                "Quiz": {"difficulty": "Easy", "day_needed": [2, 5]}
            },
            "contains_schedule": "false",
            "topic": ["Distributed Systems", "Asynchronous programming"],
            "thought": "start labs early"
        });

        let analysis = SyllabusAnalysis::from_value(value).expect("analysis");
        assert!(!analysis.contains_schedule);
        assert_eq!(analysis.topic.len(), 2);
        assert_eq!(analysis.tasks["Lab"].day_needed, vec![7.0, 14.0]);
        assert_eq!(analysis.thought.as_deref(), Some("start labs early"));
    }

    #[test]
    fn missing_fields_default() {
        let analysis = SyllabusAnalysis::from_value(json!({"contains_schedule": true}))
            .expect("analysis");
        assert!(analysis.contains_schedule);
        assert!(analysis.tasks.is_empty());
        assert!(analysis.topic.is_empty());
    }

    #[test]
    fn fractional_day_estimates_are_kept() {
        let analysis = SyllabusAnalysis::from_value(json!({
            "tasks": {"Reading": {"difficulty": "Easy", "day_needed": [0.5, 1]}},
            "topic": ["Caching"]
        }))
        .expect("analysis");

        assert_eq!(analysis.tasks["Reading"].day_needed, vec![0.5, 1.0]);
        assert_eq!(analysis.tasks["Reading"].difficulty, "Easy");
    }

    #[test]
    fn range_strings_and_scalars_become_day_lists() {
        let analysis = SyllabusAnalysis::from_value(json!({
            "tasks": {
                "Lab": {"difficulty": "Hard", "day_needed": "7-14"},
                "Quiz": {"difficulty": 2, "day_needed": 3},
                "Essay": {"day_needed": ["2", "4 days"]},
                "Exam": "Hard",
                "Misc": null
            }
        }))
        .expect("analysis");

        assert_eq!(analysis.tasks["Lab"].day_needed, vec![7.0, 14.0]);
        assert_eq!(analysis.tasks["Quiz"].day_needed, vec![3.0]);
        assert_eq!(analysis.tasks["Quiz"].difficulty, "2");
        assert_eq!(analysis.tasks["Essay"].day_needed, vec![2.0, 4.0]);
        assert!(analysis.tasks["Essay"].difficulty.is_empty());
        assert_eq!(analysis.tasks["Exam"].difficulty, "Hard");
        assert_eq!(analysis.tasks["Misc"], TaskEstimate::default());
    }

    #[test]
    fn single_topic_string_is_a_list() {
        let analysis = SyllabusAnalysis::from_value(json!({"topic": "Paging"})).expect("analysis");
        assert_eq!(analysis.topic, vec!["Paging"]);
    }

    #[test]
    fn stored_estimates_read_back_unchanged() {
        let analysis = SyllabusAnalysis::from_value(json!({
            "tasks": {"Lab": {"difficulty": "Hard", "day_needed": [7, 14]}}
        }))
        .expect("analysis");

        let raw = serde_json::to_string(&analysis).unwrap();
        let restored: SyllabusAnalysis = serde_json::from_str(&raw).unwrap();
        assert_eq!(restored, analysis);
    }

    #[test]
    fn rejects_non_object() {
        let err = SyllabusAnalysis::from_value(json!([1, 2, 3])).unwrap_err();
        assert!(matches!(err, AppError::InvalidOutput(_)));
    }
}
