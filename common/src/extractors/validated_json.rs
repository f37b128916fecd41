//! JSON body extractor that runs `validator` rules before the handler sees the value.

use axum::{
    extract::{FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use validator::{Validate, ValidationErrors};

use crate::errors::AppError;

/// Deserialized and validated JSON request body.
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::Validation(rejection.body_text()))?;
        value.validate().map_err(validation_error)?;
        Ok(Self(value))
    }
}

/// Collapses validator output into a single visitor-facing message.
///
/// Missing fields are reported together (sorted by name); an invalid email is
/// only reported once every required field is present.
pub fn validation_error(errors: ValidationErrors) -> AppError {
    let mut missing = Vec::new();
    let mut invalid_email = false;
    let mut other = Vec::new();

    for (field, field_errors) in errors.field_errors() {
        for error in field_errors.iter() {
            match error.code.as_ref() {
                "required" => missing.push(field.to_string()),
                "email" => invalid_email = true,
                _ => other.push(
                    error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("Invalid value for field: {}", field)),
                ),
            }
        }
    }

    if !missing.is_empty() {
        missing.sort();
        missing.dedup();
        return AppError::Validation(format!("Missing required fields: {}", missing.join(", ")));
    }
    if invalid_email {
        return AppError::Validation("Invalid email format".to_string());
    }
    other.sort();
    AppError::Validation(
        other
            .into_iter()
            .next()
            .unwrap_or_else(|| "Invalid request".to_string()),
    )
}
