use chrono::Utc;
use entities::scenario_progress;
use poem_openapi::payload::Json;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set,
};
use uuid::Uuid;

use super::accounts::AccountService;
use crate::progress_api::models::{
    ErrorDto, GetProgressResponse, ListProgressResponse, ProgressEnvelopeDto,
    ProgressListEnvelopeDto, ProgressWriteDto, SaveProgressResponse,
};

const IN_PROGRESS: &str = "in_progress";
const COMPLETED: &str = "completed";

enum Caller {
    Known(Uuid),
    Unknown,
    Failed(DbErr),
}

pub struct ProgressService<'a> {
    pub db: &'a DatabaseConnection,
}

impl<'a> ProgressService<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    async fn caller(&self, token: &str) -> Caller {
        match AccountService::new(self.db).resolve(token).await {
            Ok(Some(id)) => Caller::Known(id),
            Ok(None) => Caller::Unknown,
            Err(e) => Caller::Failed(e),
        }
    }

    #[tracing::instrument(level = "debug", skip(self, token, body), fields(scenario_id = %body.scenario_id))]
    pub async fn save(&self, token: &str, body: ProgressWriteDto) -> SaveProgressResponse {
        let user_id = match self.caller(token).await {
            Caller::Known(id) => id,
            Caller::Unknown => return SaveProgressResponse::Unauthorized(ErrorDto::new("Invalid token")),
            Caller::Failed(e) => {
                tracing::error!(error = %e, "failed to resolve token");
                return SaveProgressResponse::InternalError(ErrorDto::new("Internal server error"));
            }
        };
        if body.scenario_id.trim().is_empty() {
            return SaveProgressResponse::BadRequest(ErrorDto::new("Scenario ID is required"));
        }
        if body.score.is_some_and(|s| !(0.0..=100.0).contains(&s)) {
            return SaveProgressResponse::BadRequest(ErrorDto::new("Score must be between 0 and 100"));
        }
        if body.progress.is_some_and(|p| !(0.0..=100.0).contains(&p)) {
            return SaveProgressResponse::BadRequest(ErrorDto::new("Progress must be between 0 and 100"));
        }
        if body.time_spent.is_some_and(|t| t < 0) {
            return SaveProgressResponse::BadRequest(ErrorDto::new("Time spent must not be negative"));
        }

        match self.upsert(user_id, body).await {
            Ok(model) => SaveProgressResponse::Ok(Json(ProgressEnvelopeDto {
                success: true,
                message: Some("Progress saved successfully".into()),
                data: Some(model.into()),
            })),
            Err(e) => {
                tracing::error!(error = %e, "failed to save progress");
                SaveProgressResponse::InternalError(ErrorDto::new("Internal server error"))
            }
        }
    }

    #[tracing::instrument(level = "debug", skip(self, token))]
    pub async fn get(&self, token: &str, scenario_id: &str) -> GetProgressResponse {
        let user_id = match self.caller(token).await {
            Caller::Known(id) => id,
            Caller::Unknown => return GetProgressResponse::Unauthorized(ErrorDto::new("Invalid token")),
            Caller::Failed(e) => {
                tracing::error!(error = %e, "failed to resolve token");
                return GetProgressResponse::InternalError(ErrorDto::new("Internal server error"));
            }
        };

        match self.find(user_id, scenario_id).await {
            Ok(Some(model)) => GetProgressResponse::Ok(Json(ProgressEnvelopeDto {
                success: true,
                message: None,
                data: Some(model.into()),
            })),
            Ok(None) => GetProgressResponse::NotFound(ErrorDto::new("Progress record not found")),
            Err(e) => {
                tracing::error!(error = %e, "failed to fetch progress");
                GetProgressResponse::InternalError(ErrorDto::new("Internal server error"))
            }
        }
    }

    #[tracing::instrument(level = "debug", skip(self, token))]
    pub async fn list(&self, token: &str) -> ListProgressResponse {
        let user_id = match self.caller(token).await {
            Caller::Known(id) => id,
            Caller::Unknown => return ListProgressResponse::Unauthorized(ErrorDto::new("Invalid token")),
            Caller::Failed(e) => {
                tracing::error!(error = %e, "failed to resolve token");
                return ListProgressResponse::InternalError(ErrorDto::new("Internal server error"));
            }
        };

        let rows = scenario_progress::Entity::find()
            .filter(scenario_progress::Column::UserId.eq(user_id))
            .order_by_desc(scenario_progress::Column::UpdatedAt)
            .all(self.db)
            .await;
        match rows {
            Ok(rows) => ListProgressResponse::Ok(Json(ProgressListEnvelopeDto {
                success: true,
                data: rows.into_iter().map(Into::into).collect(),
            })),
            Err(e) => {
                tracing::error!(error = %e, "failed to list progress");
                ListProgressResponse::InternalError(ErrorDto::new("Internal server error"))
            }
        }
    }

    async fn find(
        &self,
        user_id: Uuid,
        scenario_id: &str,
    ) -> Result<Option<scenario_progress::Model>, DbErr> {
        scenario_progress::Entity::find()
            .filter(scenario_progress::Column::UserId.eq(user_id))
            .filter(scenario_progress::Column::ScenarioId.eq(scenario_id))
            .one(self.db)
            .await
    }

    async fn upsert(
        &self,
        user_id: Uuid,
        body: ProgressWriteDto,
    ) -> Result<scenario_progress::Model, DbErr> {
        let now = Utc::now();
        let status = provided(body.status);
        let incoming_stages = body.completed_stages.unwrap_or_default();

        let Some(row) = self.find(user_id, &body.scenario_id).await? else {
            let status = status.unwrap_or_else(|| IN_PROGRESS.to_string());
            let completion_date = (status == COMPLETED).then_some(now);
            tracing::debug!(scenario_id = %body.scenario_id, %status, "creating progress record");
            return scenario_progress::ActiveModel {
                id: Set(Uuid::new_v4()),
                user_id: Set(user_id),
                scenario_id: Set(body.scenario_id),
                status: Set(status),
                progress: Set(body.progress.unwrap_or(0.0)),
                completed_stages: Set(serde_json::json!(merge_stages(Vec::new(), incoming_stages))),
                score: Set(body.score),
                time_spent: Set(body.time_spent.unwrap_or(0)),
                feedback: Set(provided(body.feedback)),
                start_date: Set(now),
                completion_date: Set(completion_date),
                updated_at: Set(now),
            }
            .insert(self.db)
            .await;
        };

        let existing_stages: Vec<String> =
            serde_json::from_value(row.completed_stages.clone()).unwrap_or_default();
        let completion_date = row
            .completion_date
            .or_else(|| (status.as_deref() == Some(COMPLETED)).then_some(now));

        let mut active: scenario_progress::ActiveModel = row.into();
        if let Some(status) = status {
            active.status = Set(status);
        }
        if let Some(progress) = body.progress {
            active.progress = Set(progress);
        }
        if let Some(score) = body.score {
            active.score = Set(Some(score));
        }
        if let Some(time_spent) = body.time_spent {
            active.time_spent = Set(time_spent);
        }
        if let Some(feedback) = provided(body.feedback) {
            active.feedback = Set(Some(feedback));
        }
        active.completed_stages = Set(serde_json::json!(merge_stages(
            existing_stages,
            incoming_stages
        )));
        active.completion_date = Set(completion_date);
        active.updated_at = Set(now);
        active.update(self.db).await
    }
}

/// Empty strings do not overwrite stored values.
fn provided(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Completed stages only grow; order is first completion.
fn merge_stages(mut existing: Vec<String>, incoming: Vec<String>) -> Vec<String> {
    for stage in incoming {
        if !stage.is_empty() && !existing.contains(&stage) {
            existing.push(stage);
        }
    }
    existing
}
