use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::{Employee, LogId, ReportRow};

/// Value of the `result` discriminator that marks a failed action.
pub const RESULT_ERROR: &str = "Error";
/// Field injected into every report with the operator's name.
pub const OPERATOR_NAME_FIELD: &str = "operatorName";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Action {
    StartShift,
    AddReport,
    EndShift,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StartShift => "startShift",
            Self::AddReport => "addReport",
            Self::EndShift => "endShift",
        }
    }
}

/// Body of every POST sent to the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRequest {
    pub action: Action,
    pub data: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartShiftData {
    pub operator: Employee,
    pub helpers: Vec<Employee>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartShiftResponse {
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub log_ids: Vec<LogId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndShiftData {
    pub log_ids: Vec<LogId>,
}

/// Free-form report fields plus the injected operator name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReportData(pub Map<String, Value>);

impl ReportData {
    pub fn new<I, K, V>(fields: I, operator_name: &str) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut map = Map::new();
        for (name, value) in fields {
            map.insert(name.into(), Value::String(value.into()));
        }
        map.insert(
            OPERATOR_NAME_FIELD.to_string(),
            Value::String(operator_name.to_string()),
        );
        Self(map)
    }
}

/// Returns the service's error text when an action body has
/// `result == "Error"`. A `message` of any JSON type is accepted.
pub fn action_error(body: &Value) -> Option<String> {
    if body.get("result").and_then(Value::as_str) != Some(RESULT_ERROR) {
        return None;
    }
    Some(match body.get("message") {
        Some(Value::String(text)) => text.clone(),
        None | Some(Value::Null) => "the service reported an error without a message".to_string(),
        Some(other) => other.to_string(),
    })
}

/// Read-only view served on GET: the roster and the reports table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub employees: Vec<Employee>,
    #[serde(default)]
    pub reports: Vec<ReportRow>,
}

/// Returns the service's error text when a snapshot body carries the
/// `error` marker. Empty or null markers do not count.
pub fn snapshot_error(body: &Value) -> Option<String> {
    match body.get("error")? {
        Value::Null | Value::Bool(false) => None,
        Value::String(text) if text.is_empty() => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}
