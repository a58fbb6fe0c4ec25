// rest_api/src/error.rs

use axum::extract::multipart::MultipartError;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, error};

use models::ClinicError;
use security::AuthError;

/// Every failure a handler can return. Rendered as
/// `{"status": "error", "message": ...}` with the matching status code.
#[derive(Debug, Error)]
pub enum RestApiError {
    #[error(transparent)]
    Clinic(#[from] ClinicError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("Invalid request body: {0}")]
    InvalidBody(String),
    #[error("Invalid query string: {0}")]
    InvalidQuery(String),
    #[error("{0}")]
    PayloadTooLarge(String),
}

impl From<JsonRejection> for RestApiError {
    fn from(rejection: JsonRejection) -> Self {
        RestApiError::InvalidBody(rejection.body_text())
    }
}

impl From<QueryRejection> for RestApiError {
    fn from(rejection: QueryRejection) -> Self {
        RestApiError::InvalidQuery(rejection.body_text())
    }
}

impl From<MultipartError> for RestApiError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            RestApiError::PayloadTooLarge("Image must be 5MB or smaller".to_string())
        } else {
            RestApiError::InvalidBody(err.body_text())
        }
    }
}

impl RestApiError {
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            RestApiError::Clinic(err) => match err {
                ClinicError::Validation(m) => (StatusCode::BAD_REQUEST, m.clone()),
                ClinicError::Unauthenticated(m) => (StatusCode::UNAUTHORIZED, m.clone()),
                ClinicError::Forbidden(m) => (StatusCode::FORBIDDEN, m.clone()),
                ClinicError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
                ClinicError::Conflict(m) => (StatusCode::CONFLICT, m.clone()),
                ClinicError::Unavailable(m) => (StatusCode::SERVICE_UNAVAILABLE, m.clone()),
                _ => internal(self),
            },
            RestApiError::Auth(err) => match err {
                AuthError::MissingToken | AuthError::InvalidToken(_) => (StatusCode::UNAUTHORIZED, err.to_string()),
                AuthError::InvalidCredentials => (StatusCode::UNAUTHORIZED, err.to_string()),
                AuthError::Forbidden(m) => (StatusCode::FORBIDDEN, format!("Forbidden: {}", m)),
                AuthError::PasswordHash(_) | AuthError::Jwt(_) => internal(self),
            },
            RestApiError::InvalidBody(_) | RestApiError::InvalidQuery(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            RestApiError::PayloadTooLarge(m) => (StatusCode::PAYLOAD_TOO_LARGE, m.clone()),
        }
    }
}

fn internal(err: &RestApiError) -> (StatusCode, String) {
    error!("Request failed: {}", err);
    (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
}

impl IntoResponse for RestApiError {
    fn into_response(self) -> Response {
        if let RestApiError::Clinic(err) = &self {
            if err.is_client_error() {
                debug!("Rejected request: {}", err);
            }
        }
        let (status, message) = self.status_and_message();
        let body = Json(json!({
            "status": "error",
            "message": message,
        }));
        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, RestApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: impl Into<RestApiError>) -> StatusCode {
        err.into().into_response().status()
    }

    #[test]
    fn clinic_errors_map_to_their_status_codes() {
        assert_eq!(status_of(ClinicError::validation("x")), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(ClinicError::NotFound("x".into())), StatusCode::NOT_FOUND);
        assert_eq!(status_of(ClinicError::Conflict("x".into())), StatusCode::CONFLICT);
        assert_eq!(status_of(ClinicError::Unavailable("x".into())), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(status_of(ClinicError::Storage("disk".into())), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn client_errors_are_exactly_the_4xx_responses() {
        let errors = [
            ClinicError::validation("bad"),
            ClinicError::Unauthenticated("who".into()),
            ClinicError::Forbidden("no".into()),
            ClinicError::NotFound("gone".into()),
            ClinicError::Conflict("taken".into()),
            ClinicError::Unavailable("later".into()),
            ClinicError::Storage("disk".into()),
            ClinicError::Internal("boom".into()),
        ];
        for err in errors {
            let client = err.is_client_error();
            assert_eq!(status_of(err).is_client_error(), client);
        }
    }

    #[test]
    fn auth_errors_split_401_and_403() {
        assert_eq!(status_of(AuthError::MissingToken), StatusCode::UNAUTHORIZED);
        assert_eq!(status_of(AuthError::InvalidToken("exp".into())), StatusCode::UNAUTHORIZED);
        assert_eq!(status_of(AuthError::Forbidden("no".into())), StatusCode::FORBIDDEN);
    }

    #[test]
    fn internal_details_stay_server_side() {
        let (_, message) = RestApiError::from(ClinicError::Storage("sled exploded".into())).status_and_message();
        assert_eq!(message, "Internal server error");
    }
}
