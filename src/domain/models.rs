// Progress records in the shapes the adapter reads, writes and exchanges

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Progress through one scenario, as every adapter operation returns it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioProgress {
    pub scenario_id: String,
    pub current_stage: Option<String>,
    pub progress: Option<f64>,
    /// Insertion order is kept for display only
    #[serde(default)]
    pub completed_stages: Vec<String>,
    pub last_updated: Option<DateTime<Utc>>,
    /// Seconds
    #[serde(default)]
    pub total_time_spent: u64,
    /// 0 - 100, set once a scored stage is done
    pub assessment_score: Option<f64>,
    pub feedback: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scenario_specific_data: Option<serde_json::Value>,
}

/// A partial update passed to `save`. Callers name fields either way the
/// product ever did; the aliases normalize them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressPatch {
    #[serde(default, alias = "status", skip_serializing_if = "Option::is_none")]
    pub current_stage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
    #[serde(
        default,
        alias = "completed_stages",
        skip_serializing_if = "Option::is_none"
    )]
    pub completed_stages: Option<Vec<String>>,
    #[serde(default, alias = "score", skip_serializing_if = "Option::is_none")]
    pub assessment_score: Option<f64>,
    #[serde(
        default,
        alias = "timeSpent",
        alias = "time_spent",
        skip_serializing_if = "Option::is_none"
    )]
    pub total_time_spent: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scenario_specific_data: Option<serde_json::Value>,
}

impl ProgressPatch {
    pub fn stage(mut self, stage: impl Into<String>) -> Self {
        self.current_stage = Some(stage.into());
        self
    }

    pub fn completed<I, S>(mut self, stages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.completed_stages = Some(stages.into_iter().map(Into::into).collect());
        self
    }

    pub fn score(mut self, score: f64) -> Self {
        self.assessment_score = Some(score);
        self
    }

    pub fn time_spent(mut self, seconds: u64) -> Self {
        self.total_time_spent = Some(seconds);
        self
    }
}

/// The JSON value kept in local storage under `scenario-progress-{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalRecord {
    #[serde(default)]
    pub scenario_id: String,
    #[serde(flatten)]
    pub patch: ProgressPatch,
    pub timestamp: Option<DateTime<Utc>>,
}

/// Body of `POST /api/progress`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteProgressWrite {
    pub scenario_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_stages: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_spent: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
}

/// A progress record as the remote API returns it.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RemoteProgress {
    #[serde(default, alias = "scenarioId")]
    pub scenario_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub progress: Option<f64>,
    #[serde(default, alias = "completedStages")]
    pub completed_stages: Option<Vec<String>>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default, alias = "timeSpent")]
    pub time_spent: Option<u64>,
    #[serde(default)]
    pub feedback: Option<String>,
    #[serde(default, alias = "startDate")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default, alias = "completionDate")]
    pub completion_date: Option<DateTime<Utc>>,
    #[serde(default, alias = "lastUpdated", alias = "updated_at")]
    pub last_updated: Option<DateTime<Utc>>,
}

/// `{ success, message, data }` wrapper used by every API response.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    pub data: Option<T>,
}
