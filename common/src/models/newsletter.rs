//! Newsletter subscription models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::response::Pagination;
use crate::utils::{email_address, null_as_default};

/// Request body for `POST /api/{project}/newsletter`.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct NewsletterRequest {
    #[serde(default, deserialize_with = "null_as_default")]
    #[validate(custom(function = "email_address"), length(max = 255))]
    pub email: String,
    #[validate(length(max = 100, message = "Name must be at most 100 characters"))]
    pub name: Option<String>,
    /// Where on the site the visitor subscribed (footer, popup, ...).
    #[validate(length(max = 50, message = "Source must be at most 50 characters"))]
    pub source: Option<String>,
}

/// A stored newsletter subscription.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewsletterSubscription {
    pub id: i64,
    pub email: String,
    pub name: Option<String>,
    pub source: Option<String>,
    pub is_active: bool,
    pub unsubscribed_at: Option<DateTime<Utc>>,
    pub ip_address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Response data for a subscription request.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewsletterReceipt {
    pub subscribed: bool,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub already_exists: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reactivated: Option<bool>,
}

/// Query parameters for the admin subscriber listing.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct NewsletterListQuery {
    /// Only active (`true`) or unsubscribed (`false`) entries.
    pub active: Option<bool>,
    /// 1-based page number (default 1).
    pub page: Option<u32>,
    /// Page size (default 50).
    pub limit: Option<u32>,
}

/// Admin subscriber listing.
#[derive(Debug, Serialize, ToSchema)]
pub struct NewsletterList {
    pub subscribers: Vec<NewsletterSubscription>,
    pub pagination: Pagination,
}
