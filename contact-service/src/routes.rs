//! Per-project API routers.

use axum::{
    middleware,
    routing::{get, post, put},
    Extension, Router,
};
use common::config::KNOWN_PROJECTS;

use crate::bootstrap::ensure_ready_middleware;
use crate::handlers::{self, ProjectName};
use crate::state::AppState;

/// Project with its own readiness endpoint.
const AIHUNAR: &str = "aihunar";

/// Contact and newsletter routes for one project.
pub fn forms_router(project: &str) -> Router<AppState> {
    Router::new()
        .route("/contact", post(handlers::submit_contact))
        .route("/newsletter", post(handlers::subscribe_newsletter))
        .route("/admin/contacts", get(handlers::list_contacts))
        .route("/admin/contacts/{id}", put(handlers::update_contact))
        .route("/admin/newsletter", get(handlers::list_subscribers))
        .layer(Extension(ProjectName(project.to_string())))
}

/// Everything under `/api`. Form routes are mounted for the bootstrapped
/// projects; every request waits for the database bootstrap.
pub fn api_router(state: AppState) -> Router<AppState> {
    let mut api = Router::new();
    for project in KNOWN_PROJECTS {
        let mut router = Router::new();
        let mut mounted = false;

        if state.bootstrap.projects().iter().any(|p| p == project) {
            router = router.merge(forms_router(project));
            mounted = true;
        }
        if project == AIHUNAR {
            router = router.route("/health", get(handlers::aihunar_health));
            mounted = true;
        }

        if mounted {
            api = api.nest(&format!("/{}", project), router);
        }
    }
    api.layer(middleware::from_fn_with_state(state, ensure_ready_middleware))
}
