//! Contact form models.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::errors::AppError;
use crate::response::Pagination;
use crate::utils::{email_address, explicit_null, not_blank, null_as_default};

/// Processing state of a contact submission.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ContactStatus {
    #[default]
    New,
    Read,
    Replied,
    Closed,
}

impl ContactStatus {
    /// All values in declaration order, as stored in the database.
    pub const ALL: [&'static str; 4] = ["new", "read", "replied", "closed"];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContactStatus::New => "new",
            ContactStatus::Read => "read",
            ContactStatus::Replied => "replied",
            ContactStatus::Closed => "closed",
        }
    }
}

impl FromStr for ContactStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(ContactStatus::New),
            "read" => Ok(ContactStatus::Read),
            "replied" => Ok(ContactStatus::Replied),
            "closed" => Ok(ContactStatus::Closed),
            other => Err(AppError::Validation(format!(
                "Invalid status: {} (expected one of: {})",
                other,
                Self::ALL.join(", ")
            ))),
        }
    }
}

impl fmt::Display for ContactStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request body for `POST /api/{project}/contact`.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ContactRequest {
    /// Visitor name.
    #[serde(default, deserialize_with = "null_as_default")]
    #[validate(custom(function = "not_blank"), length(max = 100))]
    pub name: String,
    /// Reply address.
    #[serde(default, deserialize_with = "null_as_default")]
    #[validate(custom(function = "email_address"), length(max = 255))]
    pub email: String,
    #[validate(length(max = 20, message = "Phone must be at most 20 characters"))]
    pub phone: Option<String>,
    #[validate(length(max = 200, message = "Company must be at most 200 characters"))]
    pub company: Option<String>,
    /// Inquiry type selected in the form.
    #[serde(default, deserialize_with = "null_as_default")]
    #[validate(custom(function = "not_blank"), length(max = 50))]
    pub inquiry: String,
    #[serde(default, deserialize_with = "null_as_default")]
    #[validate(custom(function = "not_blank"), length(max = 255))]
    pub subject: String,
    #[serde(default, deserialize_with = "null_as_default")]
    #[validate(custom(function = "not_blank"))]
    pub message: String,
}

/// A stored contact submission.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContactSubmission {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub inquiry_type: String,
    pub subject: String,
    pub message: String,
    pub status: ContactStatus,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub email_sent: bool,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Response data for an accepted contact submission.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ContactReceipt {
    pub submitted: bool,
    pub id: i64,
    pub timestamp: DateTime<Utc>,
}

/// Query parameters for the admin contact listing.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ContactListQuery {
    /// Only submissions with this status.
    pub status: Option<String>,
    /// 1-based page number (default 1).
    pub page: Option<u32>,
    /// Page size (default 20).
    pub limit: Option<u32>,
}

/// Admin contact listing.
#[derive(Debug, Serialize, ToSchema)]
pub struct ContactList {
    pub submissions: Vec<ContactSubmission>,
    pub pagination: Pagination,
}

/// Request body for `PUT /api/{project}/admin/contacts/{id}`.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateContactRequest {
    pub status: Option<ContactStatus>,
    /// Absent leaves the notes untouched; `null` clears them.
    #[serde(default, deserialize_with = "explicit_null")]
    #[schema(value_type = Option<String>)]
    pub notes: Option<Option<String>>,
}
