//! Lazy database bootstrap for the API routes.
//!
//! The first `/api` request connects the configured projects, registers their
//! models and syncs their tables. A failed bootstrap is not cached, so the next
//! request tries again.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use common::errors::{AppError, AppResult};
use common::response::ApiResponse;
use tokio::sync::OnceCell;

use crate::db_manager::DatabaseManager;
use crate::models::register_form_models;
use crate::schema::SyncOptions;
use crate::state::AppState;

pub const UNAVAILABLE_MESSAGE: &str = "Database not available. Please try again.";

/// One-time initialization of the projects that serve form routes.
pub struct Bootstrap {
    manager: Arc<DatabaseManager>,
    projects: Vec<String>,
    ready: OnceCell<()>,
}

impl Bootstrap {
    pub fn new(manager: Arc<DatabaseManager>, projects: Vec<String>) -> Self {
        Self {
            manager,
            projects,
            ready: OnceCell::new(),
        }
    }

    pub fn projects(&self) -> &[String] {
        &self.projects
    }

    pub fn is_ready(&self) -> bool {
        self.ready.initialized()
    }

    /// Connects, registers and syncs every project once. Concurrent callers
    /// wait for the same run.
    pub async fn ensure_ready(&self) -> AppResult<()> {
        self.ready
            .get_or_try_init(|| async {
                for project in &self.projects {
                    tracing::info!(project = %project, "Initializing database on first request");
                    self.manager.init_project(project, None).await?;
                    register_form_models(&self.manager, project).await?;
                    self.manager.sync_project(project, SyncOptions::alter()).await?;
                }
                tracing::info!(projects = ?self.projects, "Databases ready");
                Ok::<(), AppError>(())
            })
            .await
            .map(|_| ())
    }
}

/// Holds back `/api` requests until the databases are ready.
pub async fn ensure_ready_middleware(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if let Err(e) = state.bootstrap.ensure_ready().await {
        tracing::error!(error = %e, "Database bootstrap failed");
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ApiResponse::err(e.code(), UNAVAILABLE_MESSAGE)),
        )
            .into_response();
    }
    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::config::{DbEnv, DbSettings, DbVariantSettings, ProjectDbSettings};

    #[tokio::test]
    async fn test_bootstrap_retries_after_failure() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"x").unwrap();

        // Storage below a regular file cannot be created.
        let settings = DbSettings::new(DbEnv::Local).with_project(
            "hsnweb",
            ProjectDbSettings::uniform(DbVariantSettings::sqlite(
                blocker.join("hsnweb.sqlite").to_string_lossy(),
            )),
        );
        let manager = Arc::new(DatabaseManager::new(settings));
        let bootstrap = Bootstrap::new(manager.clone(), vec!["hsnweb".into()]);

        assert!(bootstrap.ensure_ready().await.is_err());
        assert!(!bootstrap.is_ready());
        assert!(manager.get_status().await.is_empty());

        std::fs::remove_file(&blocker).unwrap();
        bootstrap.ensure_ready().await.unwrap();
        assert!(bootstrap.is_ready());
        assert_eq!(
            manager.get_status().await["hsnweb"].models,
            vec!["ContactSubmission", "NewsletterSubscription"]
        );
    }
}
