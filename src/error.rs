use std::collections::BTreeMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Field name to human readable messages, serialized as the `errors` object
/// of a 422 response.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn first_message(&self) -> Option<&str> {
        self.0
            .values()
            .flat_map(|msgs| msgs.iter())
            .next()
            .map(String::as_str)
    }

    /// `Ok(value)` when nothing was recorded, otherwise the collected errors.
    pub fn into_result<T>(self, value: T) -> Result<T, AppError> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(AppError::Validation(self))
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("The given data was invalid.")]
    Validation(ValidationErrors),

    #[error("{0} not found.")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Validation(errors) => {
                let message = errors
                    .first_message()
                    .unwrap_or("The given data was invalid.")
                    .to_string();
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    Json(json!({ "message": message, "errors": errors })),
                )
                    .into_response()
            }
            AppError::NotFound(_) => (
                StatusCode::NOT_FOUND,
                Json(json!({ "message": self.to_string() })),
            )
                .into_response(),
            AppError::Database(_) | AppError::Migrate(_) => {
                error!("{}", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "message": "Server Error" })),
                )
                    .into_response()
            }
        }
    }
}
