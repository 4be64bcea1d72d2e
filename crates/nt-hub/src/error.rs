//! # Error Responses
//!
//! Every failure leaving the API is an [`AppError`], rendered as a JSend
//! body: `fail` for 4xx, `error` for 5xx. In development the body also
//! carries the error details; in production non-operational errors are
//! logged and replaced with a generic message.
//!
//! Handlers don't know the environment. [`AppError::into_response`] renders
//! for production and attaches the error to the response; [`render_errors`]
//! re-renders it with the environment held in [`AppState`].

use std::any::Any;
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use nt_store::StoreError;

use crate::{AppState, Environment};

#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct AppError {
    pub status_code: StatusCode,
    pub message: String,
    /// Expected failures (bad input, missing resource) as opposed to bugs.
    pub operational: bool,
}

impl AppError {
    pub fn new(status_code: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status_code,
            message: message.into(),
            operational: true,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    /// Failed model validation, one message per violated rule.
    pub fn validation(errors: &[String]) -> Self {
        Self::bad_request(format!("Invalid input data. {}.", errors.join(". ")))
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status_code: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
            operational: false,
        }
    }

    /// `fail` for client errors, `error` for everything else.
    pub fn status(&self) -> &'static str {
        if self.status_code.is_client_error() {
            "fail"
        } else {
            "error"
        }
    }

    fn body(&self, env: Environment) -> serde_json::Value {
        match env {
            Environment::Development => serde_json::json!({
                "status": self.status(),
                "message": self.message,
                "error": {
                    "statusCode": self.status_code.as_u16(),
                    "operational": self.operational,
                },
            }),
            Environment::Production if self.operational => serde_json::json!({
                "status": self.status(),
                "message": self.message,
            }),
            Environment::Production => serde_json::json!({
                "status": "error",
                "message": "Something went very wrong!",
            }),
        }
    }

    fn render(&self, env: Environment) -> Response {
        let status_code = if env == Environment::Production && !self.operational {
            StatusCode::INTERNAL_SERVER_ERROR
        } else {
            self.status_code
        };
        (status_code, Json(self.body(env))).into_response()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.operational {
            tracing::debug!("{} {}", self.status_code, self.message);
        } else {
            tracing::error!("ERROR {}: {}", self.status_code, self.message);
        }

        let mut response = self.render(Environment::Production);
        response.extensions_mut().insert(self);
        response
    }
}

/// Middleware: render any [`AppError`] for the configured environment.
pub async fn render_errors(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;
    match response.extensions_mut().remove::<AppError>() {
        Some(err) => err.render(state.environment),
        None => response,
    }
}

/// A panicking handler becomes a non-operational 500.
pub fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    AppError::internal(format!("handler panicked: {}", detail)).into_response()
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UnknownOperator { field, operator } => {
                Self::bad_request(format!("Invalid operator '{}' for field {}.", operator, field))
            }
            StoreError::NotFound { .. } => Self::not_found("No document found with that ID"),
            StoreError::Duplicate { field, value } => Self::bad_request(format!(
                "Duplicate {}: {}. Please use another value!",
                field, value
            )),
            StoreError::InvalidDocument(reason) => {
                Self::validation(&[reason])
            }
        }
    }
}
