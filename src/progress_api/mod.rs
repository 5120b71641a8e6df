pub mod models;
pub mod services;

use std::sync::Arc;

use poem::Route;
use poem_openapi::{
    OpenApi, OpenApiService, SecurityScheme,
    auth::Bearer,
    param::Path,
    payload::{Json, PlainText},
};
use sea_orm::DatabaseConnection;

use models::{GetProgressResponse, ListProgressResponse, ProgressWriteDto, SaveProgressResponse};
use services::{health::HealthService, progress::ProgressService};

/// Bearer token issued to the learner at sign-in
#[derive(SecurityScheme)]
#[oai(ty = "bearer")]
pub struct BearerAuth(Bearer);

pub struct ProgressApi {
    pub db: Arc<DatabaseConnection>,
}

#[OpenApi]
impl ProgressApi {
    #[oai(path = "/status", method = "get")]
    #[tracing::instrument(level = "debug", skip(self))]
    async fn status(&self) -> PlainText<String> {
        HealthService::new(&self.db).status_text().await
    }

    /// Save or update progress for a scenario
    #[oai(path = "/api/progress", method = "post")]
    #[tracing::instrument(level = "debug", skip(self, auth, body))]
    async fn save_progress(
        &self,
        auth: BearerAuth,
        body: Json<ProgressWriteDto>,
    ) -> SaveProgressResponse {
        ProgressService::new(&self.db)
            .save(&auth.0.token, body.0)
            .await
    }

    /// Progress for one scenario
    #[oai(path = "/api/progress/:scenario_id", method = "get")]
    #[tracing::instrument(level = "debug", skip(self, auth, scenario_id))]
    async fn get_progress(&self, auth: BearerAuth, scenario_id: Path<String>) -> GetProgressResponse {
        ProgressService::new(&self.db)
            .get(&auth.0.token, &scenario_id.0)
            .await
    }

    /// All progress records of the caller
    #[oai(path = "/api/progress", method = "get")]
    #[tracing::instrument(level = "debug", skip(self, auth))]
    async fn list_progress(&self, auth: BearerAuth) -> ListProgressResponse {
        ProgressService::new(&self.db).list(&auth.0.token).await
    }
}

/// The API plus its OpenAPI document (`/spec`) and RapiDoc UI (`/ui`).
pub fn app(db: Arc<DatabaseConnection>, server_url: &str) -> Route {
    let version = env!("CARGO_PKG_VERSION");
    let api_service =
        OpenApiService::new(ProgressApi { db }, "Dharmasikhara Progress API", version)
            .server(server_url);
    let ui = api_service.rapidoc();
    let spec = api_service.spec();
    Route::new()
        .nest("/", api_service)
        .nest("/ui", ui)
        .nest("/spec", poem::endpoint::make_sync(move |_| spec.clone()))
}
