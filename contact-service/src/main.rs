//! Contact and newsletter service.
//!
//! Serves the contact/newsletter API of every configured project from one
//! process:
//! - per-project database connections with lazy bootstrap
//! - contact submissions with mail notification
//! - newsletter subscriptions
//! - a `sync` subcommand for schema maintenance

mod bootstrap;
mod database;
mod db_manager;
mod handlers;
mod mailer;
mod models;
mod routes;
mod schema;
mod service;
mod state;

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method, StatusCode},
    middleware,
    routing::get,
    Json, Router,
};
use clap::{Parser, Subcommand};
use common::config::{AppConfig, AppEnv, DbEnv, DbSettings};
use common::middleware::{request_id_middleware, security_headers_middleware};
use common::response::ApiResponse;
use state::AppState;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use utoipa::OpenApi;

use crate::db_manager::DatabaseManager;
use crate::models::register_form_models;
use crate::schema::SyncOptions;

const FORCE_SYNC_GRACE: Duration = Duration::from_secs(3);

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Contact Service API",
        description = "Contact form and newsletter endpoints per project"
    ),
    paths(
        handlers::submit_contact,
        handlers::subscribe_newsletter,
        handlers::list_contacts,
        handlers::update_contact,
        handlers::list_subscribers,
        handlers::aihunar_health,
        handlers::health_check,
    ),
    components(schemas(
        common::models::ContactRequest,
        common::models::ContactReceipt,
        common::models::ContactStatus,
        common::models::ContactSubmission,
        common::models::ContactList,
        common::models::UpdateContactRequest,
        common::models::NewsletterRequest,
        common::models::NewsletterReceipt,
        common::models::NewsletterSubscription,
        common::models::NewsletterList,
        common::response::Pagination,
        db_manager::ProjectStatus,
        handlers::HealthResponse,
        handlers::ProjectHealth,
    )),
    tags(
        (name = "forms", description = "Public form endpoints"),
        (name = "admin", description = "Submission management"),
        (name = "health", description = "Health endpoints")
    )
)]
struct ApiDoc;

#[derive(Parser)]
#[command(name = "contact-service", version, about = "Contact form and newsletter service")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Create or update the tables of the bootstrap projects
    Sync {
        /// Drop and recreate tables. All data is lost.
        #[arg(long)]
        force: bool,
        /// Database environment (local or prod); defaults to DB_ENV
        #[arg(long)]
        env: Option<DbEnv>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load();
    init_tracing(config.env);

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Sync { force, env } => sync(config, force, env).await,
    }
}

fn init_tracing(env: AppEnv) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    let registry = tracing_subscriber::registry().with(filter);
    if env.is_production() {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn serve(config: AppConfig) -> anyhow::Result<()> {
    let db_settings = DbSettings::from_env().context("invalid database configuration")?;
    let db_env = db_settings.default_env();
    let state = AppState::new(config.clone(), db_settings).context("invalid mail configuration")?;

    info!(env = %config.env, db_env = %db_env, projects = ?config.bootstrap_projects, "Initializing databases");
    match state.bootstrap.ensure_ready().await {
        Ok(()) => {
            for project in state.bootstrap.projects() {
                let models: Vec<String> = state.manager.get_models(project).await.into_keys().collect();
                info!(project = %project, models = ?models, "Registered models");
            }
        }
        Err(e) => warn!(error = %e, "Database bootstrap failed, retrying on first API request"),
    }

    let app = create_router(state.clone());
    let addr = config.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!(address = %addr, env = %config.env, db_env = %db_env, "Server started");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

    info!("Shutting down gracefully");
    state.manager.close_all().await;
    Ok(())
}

async fn sync(config: AppConfig, force: bool, env: Option<DbEnv>) -> anyhow::Result<()> {
    let settings = DbSettings::from_env().context("invalid database configuration")?;
    info!(db_env = %env.unwrap_or(settings.default_env()), force, "Database sync");

    if force {
        warn!("Force mode will DROP ALL TABLES and recreate them. All data will be lost. Press Ctrl+C to cancel.");
        tokio::time::sleep(FORCE_SYNC_GRACE).await;
    }
    let options = if force {
        SyncOptions::force()
    } else {
        SyncOptions::alter()
    };

    let manager = DatabaseManager::new(settings);
    let result = async {
        for project in &config.bootstrap_projects {
            manager.init_project(project, env).await?;
            register_form_models(&manager, project).await?;
        }
        manager.sync_all(options).await?;
        info!("Database sync completed");
        let status = serde_json::to_string_pretty(&manager.get_status().await)?;
        println!("{}", status);
        Ok::<(), anyhow::Error>(())
    }
    .await;

    manager.close_all().await;
    result.context("database sync failed")
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}

fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.allowed_origins);
    let body_limit = state.config.body_limit;

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/api-docs/openapi.json", get(openapi_json))
        .nest("/api", routes::api_router(state.clone()))
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(request_id_middleware))
        .with_state(state)
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

async fn not_found() -> (StatusCode, Json<ApiResponse<()>>) {
    (
        StatusCode::NOT_FOUND,
        Json(ApiResponse::err("NOT_FOUND", "Endpoint not found")),
    )
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::Request;
    use common::config::{DbVariantSettings, ProjectDbSettings};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::mailer::DisabledNotifier;

    fn app_with_storage(storage: &Path) -> (Router, AppState) {
        let config = AppConfig::from_lookup(|_| None);
        let settings = DbSettings::new(DbEnv::Local).with_project(
            "hsnweb",
            ProjectDbSettings::uniform(DbVariantSettings::sqlite(storage.to_string_lossy())),
        );
        let state = AppState::with_parts(
            config,
            Arc::new(DatabaseManager::new(settings)),
            Arc::new(DisabledNotifier),
        );
        (create_router(state.clone()), state)
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(value) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };
        let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn test_health_reports_databases() {
        let dir = tempfile::tempdir().unwrap();
        let (app, _) = app_with_storage(&dir.path().join("hsnweb.sqlite"));

        let (status, body) = send(&app, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["dbEnv"], "local");
        assert_eq!(body["databases"], json!({}));

        send(&app, Method::GET, "/api/aihunar/health", None).await;
        let (_, body) = send(&app, Method::GET, "/health", None).await;
        assert_eq!(
            body["databases"]["hsnweb"],
            json!({
                "connected": true,
                "dialect": "sqlite",
                "models": ["ContactSubmission", "NewsletterSubscription"]
            })
        );
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let dir = tempfile::tempdir().unwrap();
        let (app, _) = app_with_storage(&dir.path().join("hsnweb.sqlite"));

        let (status, body) = send(&app, Method::GET, "/nope", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Endpoint not found");
    }

    #[tokio::test]
    async fn test_aihunar_health() {
        let dir = tempfile::tempdir().unwrap();
        let (app, _) = app_with_storage(&dir.path().join("hsnweb.sqlite"));

        let (status, body) = send(&app, Method::GET, "/api/aihunar/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "ok");
        assert_eq!(body["meta"]["project"], "aihunar");
    }

    #[tokio::test]
    async fn test_contact_flow() {
        let dir = tempfile::tempdir().unwrap();
        let (app, state) = app_with_storage(&dir.path().join("hsnweb.sqlite"));

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/hsnweb/contact",
            Some(json!({"email": "jane@example.com", "subject": " "})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body["message"],
            "Missing required fields: inquiry, message, name, subject"
        );

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/hsnweb/contact",
            Some(json!({
                "name": "Jane",
                "email": "jane@example.com",
                "inquiry": "Sales",
                "subject": "Pricing",
                "message": "Hello"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["submitted"], true);
        let id = body["data"]["id"].as_i64().unwrap();
        assert!(state.bootstrap.is_ready());

        let (status, body) = send(&app, Method::GET, "/api/hsnweb/admin/contacts", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["pagination"]["total"], 1);
        assert_eq!(body["data"]["pagination"]["limit"], 20);
        assert_eq!(body["data"]["submissions"][0]["emailSent"], false);

        let uri = format!("/api/hsnweb/admin/contacts/{}", id);
        let (status, body) = send(&app, Method::PUT, &uri, Some(json!({"status": "replied"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "replied");

        let (status, _) = send(&app, Method::PUT, &uri, Some(json!({"status": "archived"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, body) = send(&app, Method::PUT, &uri, Some(json!({"notes": "called"}))).await;
        assert_eq!(body["data"]["notes"], "called");
        let (_, body) = send(&app, Method::PUT, &uri, Some(json!({"status": "read"}))).await;
        assert_eq!(body["data"]["notes"], "called");
        let (status, body) = send(&app, Method::PUT, &uri, Some(json!({"notes": null}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["notes"], Value::Null);
        assert_eq!(body["data"]["status"], "read");

        let (status, body) = send(
            &app,
            Method::PUT,
            "/api/hsnweb/admin/contacts/999",
            Some(json!({"notes": "x"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Contact submission not found.");
    }

    #[tokio::test]
    async fn test_null_required_field_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        let (app, _) = app_with_storage(&dir.path().join("hsnweb.sqlite"));

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/hsnweb/contact",
            Some(json!({
                "name": null,
                "email": "jane@example.com",
                "inquiry": "Sales",
                "subject": "Pricing",
                "message": "Hello"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Missing required fields: name");

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/hsnweb/newsletter",
            Some(json!({"email": null})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Missing required fields: email");
    }

    #[tokio::test]
    async fn test_newsletter_flow() {
        let dir = tempfile::tempdir().unwrap();
        let (app, _) = app_with_storage(&dir.path().join("hsnweb.sqlite"));

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/hsnweb/newsletter",
            Some(json!({"email": "not-an-email"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Invalid email format");

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/hsnweb/newsletter",
            Some(json!({"email": "a@localhost"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Invalid email format");

        let request = json!({"email": "a@example.com"});
        let (_, body) = send(&app, Method::POST, "/api/hsnweb/newsletter", Some(request.clone())).await;
        assert_eq!(body["data"]["subscribed"], true);
        assert!(body["data"]["id"].is_i64());

        let (_, body) = send(&app, Method::POST, "/api/hsnweb/newsletter", Some(request)).await;
        assert_eq!(body["data"]["alreadyExists"], true);
        assert_eq!(body["message"], "You're already subscribed to our newsletter!");

        let (status, body) =
            send(&app, Method::GET, "/api/hsnweb/admin/newsletter?active=true", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["pagination"]["total"], 1);
        assert_eq!(body["data"]["subscribers"][0]["source"], "website");
    }

    #[tokio::test]
    async fn test_bootstrap_failure_returns_503() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"x").unwrap();
        let (app, _) = app_with_storage(&blocker.join("hsnweb.sqlite"));

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/hsnweb/newsletter",
            Some(json!({"email": "a@example.com"})),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Database not available. Please try again.");

        // Health stays available.
        let (status, _) = send(&app, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_response_headers() {
        let dir = tempfile::tempdir().unwrap();
        let (app, _) = app_with_storage(&dir.path().join("hsnweb.sqlite"));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .header(header::ORIGIN, "http://localhost:3000")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let headers = response.headers();
        assert_eq!(headers[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
        assert_eq!(
            headers[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "http://localhost:3000"
        );
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
        assert!(headers.contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_openapi_document() {
        let dir = tempfile::tempdir().unwrap();
        let (app, _) = app_with_storage(&dir.path().join("hsnweb.sqlite"));

        let (status, body) = send(&app, Method::GET, "/api-docs/openapi.json", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["paths"]["/api/{project}/contact"].is_object());
        assert!(body["paths"]["/health"].is_object());
    }
}
