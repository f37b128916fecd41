//! API response wrapper types.
//!
//! Provides a unified response format for all API endpoints.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

/// Standard API response wrapper.
///
/// All API endpoints return responses in this format for consistency.
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T: Serialize> {
    /// Whether the request was successful.
    pub success: bool,

    /// Human-readable message for the website visitor.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Response data (present on success).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,

    /// Error details (present on failure).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,

    /// Response metadata.
    pub meta: ResponseMeta,
}

/// API error details.
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiError {
    /// Error code for client handling (e.g., "VALIDATION_ERROR", "NOT_FOUND").
    pub code: String,

    /// Human-readable error message.
    pub message: String,
}

/// Response metadata.
#[derive(Debug, Serialize, ToSchema)]
pub struct ResponseMeta {
    /// Response timestamp.
    pub timestamp: DateTime<Utc>,

    /// Project (tenant) that handled the request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
}

impl Default for ResponseMeta {
    fn default() -> Self {
        Self {
            timestamp: Utc::now(),
            project: None,
        }
    }
}

/// Pagination information for list responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    /// Total number of items.
    pub total: u64,

    /// Current page number (1-based).
    pub page: u32,

    /// Number of items per page.
    pub limit: u32,

    /// Total number of pages.
    pub total_pages: u32,
}

impl Pagination {
    /// Creates pagination info from total count and page parameters.
    pub fn new(page: u32, limit: u32, total: u64) -> Self {
        let total_pages = if limit == 0 {
            0
        } else {
            total.div_ceil(u64::from(limit)) as u32
        };
        Self {
            total,
            page,
            limit,
            total_pages,
        }
    }

    /// Row offset for the current page.
    pub fn offset(page: u32, limit: u32) -> u64 {
        u64::from(page.saturating_sub(1)) * u64::from(limit)
    }
}

impl<T: Serialize> ApiResponse<T> {
    /// Creates a successful response with data.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
            error: None,
            meta: ResponseMeta::default(),
        }
    }

    /// Creates a successful response with data and a visitor-facing message.
    pub fn ok_with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::ok(data)
        }
    }

    /// Sets the project name on the response.
    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.meta.project = Some(project.into());
        self
    }
}

impl ApiResponse<()> {
    /// Creates an error response.
    pub fn err(code: impl Into<String>, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            success: false,
            message: Some(message.clone()),
            data: None,
            error: Some(ApiError {
                code: code.into(),
                message,
            }),
            meta: ResponseMeta::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_pages() {
        let p = Pagination::new(2, 20, 41);
        assert_eq!(p.total_pages, 3);
        assert_eq!(Pagination::new(1, 20, 0).total_pages, 0);
        assert_eq!(Pagination::new(1, 20, 20).total_pages, 1);
    }

    #[test]
    fn test_pagination_offset() {
        assert_eq!(Pagination::offset(1, 20), 0);
        assert_eq!(Pagination::offset(3, 50), 100);
        assert_eq!(Pagination::offset(0, 50), 0);
    }

    #[test]
    fn test_error_envelope_shape() {
        let body = serde_json::to_value(ApiResponse::err("NOT_FOUND", "gone")).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "gone");
        assert_eq!(body["error"]["code"], "NOT_FOUND");
        assert!(body.get("data").is_none());
    }

    #[test]
    fn test_ok_with_message() {
        let body =
            serde_json::to_value(ApiResponse::ok_with_message(1, "saved").with_project("acme"))
                .unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["data"], 1);
        assert_eq!(body["message"], "saved");
        assert_eq!(body["meta"]["project"], "acme");
    }
}
