use chrono::Utc;
use entities::user;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

/// Maps bearer tokens to users. Issuing tokens happens elsewhere.
pub struct AccountService<'a> {
    pub db: &'a DatabaseConnection,
}

impl<'a> AccountService<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    #[tracing::instrument(level = "debug", skip(self, token))]
    pub async fn resolve(&self, token: &str) -> Result<Option<Uuid>, DbErr> {
        let found = user::Entity::find()
            .filter(user::Column::ApiToken.eq(token))
            .one(self.db)
            .await?;
        Ok(found.map(|u| u.id))
    }

    /// Idempotent: an already-known token keeps its user.
    #[tracing::instrument(level = "debug", skip(self, token))]
    pub async fn register(&self, token: &str) -> Result<Uuid, DbErr> {
        if let Some(id) = self.resolve(token).await? {
            return Ok(id);
        }
        let created = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            api_token: Set(token.to_string()),
            created_at: Set(Utc::now()),
        }
        .insert(self.db)
        .await?;
        tracing::info!(user_id = %created.id, "registered api token");
        Ok(created.id)
    }
}
