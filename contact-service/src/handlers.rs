//! HTTP handlers.

use std::collections::BTreeMap;

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use common::config::DbEnv;
use common::errors::AppError;
use common::extractors::{ClientMeta, ValidatedJson};
use common::models::{
    ContactList, ContactListQuery, ContactReceipt, ContactRequest, ContactSubmission,
    NewsletterList, NewsletterListQuery, NewsletterReceipt, NewsletterRequest,
    UpdateContactRequest,
};
use common::response::ApiResponse;

use crate::db_manager::ProjectStatus;
use crate::service::{FormServiceTrait, SubscribeOutcome};
use crate::state::AppState;

/// Project a form router is mounted for.
#[derive(Debug, Clone)]
pub struct ProjectName(pub String);

/// Accept a contact form submission
#[utoipa::path(
    post,
    path = "/api/{project}/contact",
    tag = "forms",
    params(("project" = String, Path, description = "Project name")),
    request_body = ContactRequest,
    responses(
        (status = 200, description = "Submission stored", body = ApiResponse<ContactReceipt>),
        (status = 400, description = "Missing or invalid fields"),
        (status = 503, description = "Database not available")
    )
)]
pub async fn submit_contact(
    State(state): State<AppState>,
    Extension(ProjectName(project)): Extension<ProjectName>,
    client: ClientMeta,
    ValidatedJson(req): ValidatedJson<ContactRequest>,
) -> Result<Json<ApiResponse<ContactReceipt>>, AppError> {
    let submission = state.form_service(&project).submit_contact(req, client).await?;
    let receipt = ContactReceipt {
        submitted: true,
        id: submission.id,
        timestamp: submission.created_at,
    };
    Ok(Json(
        ApiResponse::ok_with_message(
            receipt,
            "Thank you! Your message has been received. We'll get back to you within 24 hours.",
        )
        .with_project(project),
    ))
}

/// Subscribe to the newsletter
#[utoipa::path(
    post,
    path = "/api/{project}/newsletter",
    tag = "forms",
    params(("project" = String, Path, description = "Project name")),
    request_body = NewsletterRequest,
    responses(
        (status = 200, description = "Subscribed, already subscribed or reactivated", body = ApiResponse<NewsletterReceipt>),
        (status = 400, description = "Missing or invalid email")
    )
)]
pub async fn subscribe_newsletter(
    State(state): State<AppState>,
    Extension(ProjectName(project)): Extension<ProjectName>,
    client: ClientMeta,
    ValidatedJson(req): ValidatedJson<NewsletterRequest>,
) -> Result<Json<ApiResponse<NewsletterReceipt>>, AppError> {
    let email = req.email.trim().to_string();
    let outcome = state.form_service(&project).subscribe(req, client).await?;

    let mut receipt = NewsletterReceipt {
        subscribed: true,
        email,
        id: None,
        already_exists: None,
        reactivated: None,
    };
    let message = match outcome {
        SubscribeOutcome::Created(subscription) => {
            receipt.id = Some(subscription.id);
            "Successfully subscribed to newsletter!"
        }
        SubscribeOutcome::AlreadySubscribed => {
            receipt.already_exists = Some(true);
            "You're already subscribed to our newsletter!"
        }
        SubscribeOutcome::Reactivated(_) => {
            receipt.reactivated = Some(true);
            "Welcome back! Your subscription has been reactivated."
        }
    };
    Ok(Json(
        ApiResponse::ok_with_message(receipt, message).with_project(project),
    ))
}

/// List contact submissions, newest first
#[utoipa::path(
    get,
    path = "/api/{project}/admin/contacts",
    tag = "admin",
    params(("project" = String, Path, description = "Project name"), ContactListQuery),
    responses(
        (status = 200, description = "One page of submissions", body = ApiResponse<ContactList>),
        (status = 400, description = "Unknown status filter")
    )
)]
pub async fn list_contacts(
    State(state): State<AppState>,
    Extension(ProjectName(project)): Extension<ProjectName>,
    Query(query): Query<ContactListQuery>,
) -> Result<Json<ApiResponse<ContactList>>, AppError> {
    let data = state.form_service(&project).list_contacts(query).await?;
    Ok(Json(ApiResponse::ok(data).with_project(project)))
}

/// Update a submission's status or notes
#[utoipa::path(
    put,
    path = "/api/{project}/admin/contacts/{id}",
    tag = "admin",
    params(
        ("project" = String, Path, description = "Project name"),
        ("id" = i64, Path, description = "Submission id")
    ),
    request_body = UpdateContactRequest,
    responses(
        (status = 200, description = "Updated submission", body = ApiResponse<ContactSubmission>),
        (status = 400, description = "Invalid status"),
        (status = 404, description = "Submission not found")
    )
)]
pub async fn update_contact(
    State(state): State<AppState>,
    Extension(ProjectName(project)): Extension<ProjectName>,
    Path(id): Path<i64>,
    ValidatedJson(req): ValidatedJson<UpdateContactRequest>,
) -> Result<Json<ApiResponse<ContactSubmission>>, AppError> {
    let data = state.form_service(&project).update_contact(id, req).await?;
    Ok(Json(
        ApiResponse::ok_with_message(data, "Contact submission updated.").with_project(project),
    ))
}

/// List newsletter subscribers, newest first
#[utoipa::path(
    get,
    path = "/api/{project}/admin/newsletter",
    tag = "admin",
    params(("project" = String, Path, description = "Project name"), NewsletterListQuery),
    responses(
        (status = 200, description = "One page of subscribers", body = ApiResponse<NewsletterList>)
    )
)]
pub async fn list_subscribers(
    State(state): State<AppState>,
    Extension(ProjectName(project)): Extension<ProjectName>,
    Query(query): Query<NewsletterListQuery>,
) -> Result<Json<ApiResponse<NewsletterList>>, AppError> {
    let data = state.form_service(&project).list_subscribers(query).await?;
    Ok(Json(ApiResponse::ok(data).with_project(project)))
}

/// Readiness of the aihunar project
#[utoipa::path(
    get,
    path = "/api/aihunar/health",
    tag = "health",
    responses(
        (status = 200, description = "Project API is ready", body = ApiResponse<ProjectHealth>)
    )
)]
pub async fn aihunar_health() -> Json<ApiResponse<ProjectHealth>> {
    Json(
        ApiResponse::ok_with_message(ProjectHealth { status: "ok".into() }, "AI Hunar API is ready")
            .with_project("aihunar"),
    )
}

/// Service health and database status
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is running", body = HealthResponse)
    )
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        db_env: state.manager.settings().default_env(),
        databases: state.manager.get_status().await,
    })
}

/// Project health payload.
#[derive(Debug, Serialize, ToSchema)]
pub struct ProjectHealth {
    pub status: String,
}

/// Service health payload.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
    /// Default database environment.
    pub db_env: DbEnv,
    /// Connection manager status per initialized project.
    pub databases: BTreeMap<String, ProjectStatus>,
}
