use axum::{
    extract::rejection::QueryRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use crate::user::UserStoreError;

/// Failure of a single request, rendered as a status code plus a plain
/// text message.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("User not authorized")]
    Unauthorized,

    #[error("{0}")]
    NotFound(&'static str),

    #[error("Email already registered")]
    Conflict,

    #[error("Storage error: {0}")]
    Internal(anyhow::Error),
}

impl ApiError {
    pub fn missing_secret_code() -> Self {
        ApiError::BadRequest("Secret code is missing in the request".to_owned())
    }

    /// Login and profile lookups report an unknown secret code as a missing
    /// user rather than as an authorization failure.
    pub fn from_user_lookup(err: UserStoreError) -> Self {
        match err {
            UserStoreError::UserNotFound => ApiError::NotFound("User not found"),
            other => other.into(),
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<UserStoreError> for ApiError {
    fn from(err: UserStoreError) -> Self {
        match err {
            UserStoreError::UserNotFound => ApiError::Unauthorized,
            UserStoreError::PlaylistNotFound => ApiError::NotFound("Playlist not found"),
            UserStoreError::SongNotFound => ApiError::NotFound("Song not found in the playlist"),
            UserStoreError::EmailAlreadyRegistered => ApiError::Conflict,
            UserStoreError::Storage(err) => ApiError::Internal(err),
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(format!(
            "Failed to parse query string: {}",
            rejection.body_text()
        ))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if let ApiError::Internal(err) = &self {
            error!("Request failed with storage error: {:#}", err);
        }
        (status, self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn maps_store_errors_to_statuses() {
        let cases = [
            (UserStoreError::UserNotFound, StatusCode::UNAUTHORIZED),
            (UserStoreError::PlaylistNotFound, StatusCode::NOT_FOUND),
            (UserStoreError::SongNotFound, StatusCode::NOT_FOUND),
            (UserStoreError::EmailAlreadyRegistered, StatusCode::CONFLICT),
            (
                UserStoreError::Storage(anyhow!("disk full")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (store_error, expected) in cases {
            assert_eq!(ApiError::from(store_error).status_code(), expected);
        }
    }

    #[test]
    fn user_lookup_reports_missing_user() {
        let err = ApiError::from_user_lookup(UserStoreError::UserNotFound);
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "User not found");

        let err = ApiError::from_user_lookup(UserStoreError::PlaylistNotFound);
        assert_eq!(err.to_string(), "Playlist not found");
    }
}
