//! Saved searches and their execution audit trail.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A saved marketplace search owned by the persistence layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Search {
    /// Store-assigned row id; 0 until first persisted.
    pub id: i64,
    /// Human-readable label.
    pub name: String,
    /// Query string sent to the marketplace.
    pub query: String,
    /// Optional category filter.
    pub category: Option<String>,
    /// Optional upper price bound filter.
    pub max_price: Option<Decimal>,
    /// Disabled searches are skipped by the periodic cycle and rejected by
    /// manual triggers.
    pub enabled: bool,
    /// Price at or below which a new result is considered notable.
    pub notify_threshold: Option<Decimal>,
    pub created_at: DateTime<Utc>,
}

impl Search {
    pub fn new(name: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            id: 0,
            name: name.into(),
            query: query.into(),
            category: None,
            max_price: None,
            enabled: true,
            notify_threshold: None,
            created_at: Utc::now(),
        }
    }
}

/// Outcome of a single search execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Running,
    Completed,
    Failed,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Running => "running",
            ExecutionStatus::Completed => "completed",
            ExecutionStatus::Failed => "failed",
        }
    }
}

impl std::str::FromStr for ExecutionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "running" => Ok(ExecutionStatus::Running),
            "completed" => Ok(ExecutionStatus::Completed),
            "failed" => Ok(ExecutionStatus::Failed),
            other => Err(format!("unknown execution status: {other}")),
        }
    }
}

/// Audit row for one search execution, written at start and updated on
/// completion or failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchExecution {
    pub id: Uuid,
    pub search_id: i64,
    pub status: ExecutionStatus,
    pub items_found: i64,
    pub new_items_found: i64,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub duration_ms: Option<i64>,
}

impl SearchExecution {
    /// Start a new execution record in the `Running` state.
    pub fn started(search_id: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            search_id,
            status: ExecutionStatus::Running,
            items_found: 0,
            new_items_found: 0,
            error: None,
            started_at: Utc::now(),
            duration_ms: None,
        }
    }

    /// Mark the execution completed with result counts.
    pub fn complete(&mut self, items_found: i64, new_items_found: i64, duration_ms: i64) {
        self.status = ExecutionStatus::Completed;
        self.items_found = items_found;
        self.new_items_found = new_items_found;
        self.duration_ms = Some(duration_ms);
    }

    /// Mark the execution failed with an error message.
    pub fn fail(&mut self, error: impl Into<String>, duration_ms: i64) {
        self.status = ExecutionStatus::Failed;
        self.error = Some(error.into());
        self.duration_ms = Some(duration_ms);
    }
}
