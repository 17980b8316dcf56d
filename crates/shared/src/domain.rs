use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Position of an employee inside the roster it was loaded with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EmployeeId(pub usize);

impl fmt::Display for EmployeeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EmployeeRole {
    Operator,
    Helper,
    /// Any role the service knows about that is neither selectable list.
    Other(String),
}

impl From<String> for EmployeeRole {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Operator" => Self::Operator,
            "Helper" => Self::Helper,
            _ => Self::Other(value),
        }
    }
}

impl From<EmployeeRole> for String {
    fn from(value: EmployeeRole) -> Self {
        match value {
            EmployeeRole::Operator => "Operator".to_string(),
            EmployeeRole::Helper => "Helper".to_string(),
            EmployeeRole::Other(other) => other,
        }
    }
}

/// Employee record as served by the remote service.
///
/// Fields the client does not interpret are kept in `extra` so the full
/// record goes back to the service unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    pub name: String,
    pub role: EmployeeRole,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Employee {
    pub fn new(name: impl Into<String>, role: EmployeeRole) -> Self {
        Self {
            name: name.into(),
            role,
            extra: Map::new(),
        }
    }
}

/// Employee list from the last snapshot, addressed by [`EmployeeId`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Roster {
    employees: Vec<Employee>,
}

impl Roster {
    pub fn new(employees: Vec<Employee>) -> Self {
        Self { employees }
    }

    pub fn is_empty(&self) -> bool {
        self.employees.is_empty()
    }

    pub fn get(&self, id: EmployeeId) -> Option<&Employee> {
        self.employees.get(id.0)
    }

    pub fn operators(&self) -> impl Iterator<Item = (EmployeeId, &Employee)> {
        self.with_role(EmployeeRole::Operator)
    }

    pub fn helpers(&self) -> impl Iterator<Item = (EmployeeId, &Employee)> {
        self.with_role(EmployeeRole::Helper)
    }

    fn with_role(&self, role: EmployeeRole) -> impl Iterator<Item = (EmployeeId, &Employee)> {
        self.employees
            .iter()
            .enumerate()
            .filter(move |(_, employee)| employee.role == role)
            .map(|(index, employee)| (EmployeeId(index), employee))
    }
}

/// Server-issued shift log identifier. Opaque to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogId(pub Value);

impl From<&str> for LogId {
    fn from(value: &str) -> Self {
        Self(Value::String(value.to_string()))
    }
}

impl fmt::Display for LogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Value::String(text) => f.write_str(text),
            other => write!(f, "{other}"),
        }
    }
}

/// An active shift. Only exists once the service has acknowledged the start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub operator: Employee,
    #[serde(default)]
    pub helpers: Vec<Employee>,
    pub log_ids: Vec<LogId>,
    #[serde(default = "Utc::now")]
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Screen {
    Setup,
    Main,
    Ended,
}

/// One row of the reports table, columns in the order the service sent them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReportRow(pub Map<String, Value>);

impl ReportRow {
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn cell(&self, column: &str) -> String {
        match self.0.get(column) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(text)) => text.clone(),
            Some(other) => other.to_string(),
        }
    }
}
