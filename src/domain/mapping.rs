// The one place where local and remote field names meet.
//
//   local            remote
//   currentStage     status
//   progress         progress
//   completedStages  completed_stages   (write body: completedStages)
//   assessmentScore  score
//   totalTimeSpent   time_spent         (write body: timeSpent)
//   feedback         feedback
//   lastUpdated      last_updated

use chrono::{DateTime, Utc};

use super::models::{LocalRecord, ProgressPatch, RemoteProgress, RemoteProgressWrite, ScenarioProgress};

pub fn local_record(scenario_id: &str, patch: ProgressPatch, now: DateTime<Utc>) -> LocalRecord {
    LocalRecord {
        scenario_id: scenario_id.to_string(),
        patch,
        timestamp: Some(now),
    }
}

pub fn to_remote_write(scenario_id: &str, patch: &ProgressPatch) -> RemoteProgressWrite {
    RemoteProgressWrite {
        scenario_id: scenario_id.to_string(),
        status: patch.current_stage.clone(),
        progress: patch.progress,
        completed_stages: patch.completed_stages.clone(),
        score: patch.assessment_score,
        time_spent: patch.total_time_spent,
        feedback: patch.feedback.clone(),
    }
}

/// `scenario_hint` fills in the id when the remote record omits it.
pub fn from_remote(scenario_hint: Option<&str>, remote: RemoteProgress) -> ScenarioProgress {
    let scenario_id = remote
        .scenario_id
        .filter(|id| !id.is_empty())
        .or_else(|| scenario_hint.map(str::to_string))
        .unwrap_or_default();
    ScenarioProgress {
        scenario_id,
        current_stage: remote.status.filter(|s| !s.is_empty()),
        progress: remote.progress,
        completed_stages: remote.completed_stages.unwrap_or_default(),
        last_updated: remote.last_updated,
        total_time_spent: remote.time_spent.unwrap_or(0),
        assessment_score: remote.score,
        feedback: remote.feedback.filter(|f| !f.is_empty()),
        scenario_specific_data: None,
    }
}

pub fn from_local(record: LocalRecord) -> ScenarioProgress {
    let patch = record.patch;
    ScenarioProgress {
        scenario_id: record.scenario_id,
        current_stage: patch.current_stage,
        progress: patch.progress,
        completed_stages: patch.completed_stages.unwrap_or_default(),
        last_updated: record.timestamp,
        total_time_spent: patch.total_time_spent.unwrap_or(0),
        assessment_score: patch.assessment_score,
        feedback: patch.feedback,
        scenario_specific_data: patch.scenario_specific_data,
    }
}
