//! Error to response mapping.
//!
//! # Design Decisions
//! - Retry exhaustion is 503: the store is unreachable, the request was fine
//! - Configuration gaps and query failures are 500
//! - Bodies are JSON `{ "error", "status" }`

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::store::{AcquireError, StoreError};

impl StoreError {
    pub fn status(&self) -> StatusCode {
        match self {
            StoreError::Acquire(AcquireError::Exhausted { .. }) => StatusCode::SERVICE_UNAVAILABLE,
            StoreError::Acquire(AcquireError::Configuration(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            StoreError::Query(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for StoreError {
    fn into_response(self) -> Response {
        let status = self.status();
        tracing::error!(status = status.as_u16(), error = %self, "Store operation failed");

        let body = Json(json!({
            "error": self.to_string(),
            "status": status.as_u16()
        }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{ConfigurationError, ConnectError, QueryError};

    #[test]
    fn status_mapping() {
        let exhausted = StoreError::from(AcquireError::Exhausted {
            attempts: 5,
            last_error: ConnectError::Transport("refused".into()),
        });
        assert_eq!(exhausted.status(), StatusCode::SERVICE_UNAVAILABLE);

        let config = StoreError::from(AcquireError::from(ConfigurationError::Missing("database.user")));
        assert_eq!(config.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let query = StoreError::from(QueryError::Database("boom".into()));
        assert_eq!(query.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
