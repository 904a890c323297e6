use axum::response::{IntoResponse, Response};
use http::StatusCode;
use thiserror::Error;

/// Failures reported by the identity service
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("account already exists: {0}")]
    AccountExists(String),
    #[error("account not found: {0}")]
    AccountNotFound(String),
    #[error("bcrypt error: {0}")]
    Bcrypt(#[from] bcrypt::BcryptError),
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("invalid email: {0}")]
    InvalidEmail(String),
    #[error("IO error: {0}")]
    IO(#[from] std::io::Error),
    #[error("failed to (de)serialize: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
    #[error("identity service unavailable: {0}")]
    Unavailable(String),
    #[error("password must be at least {0} characters")]
    WeakPassword(usize),
}

impl AuthError {
    /// HTTP status for a failed sign-up or login.
    ///
    /// Malformed input is a bad request, a taken email a conflict, wrong
    /// credentials unauthorized. Anything else means the service failed to answer.
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::InvalidEmail(_) | AuthError::WeakPassword(_) => StatusCode::BAD_REQUEST,
            AuthError::AccountExists(_) => StatusCode::CONFLICT,
            AuthError::AccountNotFound(_) | AuthError::InvalidCredentials => {
                StatusCode::UNAUTHORIZED
            }
            AuthError::Bcrypt(_)
            | AuthError::IO(_)
            | AuthError::Serde(_)
            | AuthError::Task(_)
            | AuthError::Unavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Failures reported by the object store
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("invalid object name: {0:?}")]
    InvalidName(String),
    #[error("IO error: {0}")]
    IO(#[from] std::io::Error),
    #[error("object not found: {0}")]
    NotFound(String),
    #[error("not an image: {name}: {reason}")]
    NotImage { name: String, reason: String },
    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
    #[error("object store unavailable: {0}")]
    Unavailable(String),
}

/// Application error types
#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    ServiceUnavailable,
    NotFound(String),
    InternalError(String),
    PayloadTooLarge(String),
    Unauthorized,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
            AppError::ServiceUnavailable => {
                (StatusCode::SERVICE_UNAVAILABLE, "Service unavailable").into_response()
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg).into_response(),
            AppError::InternalError(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, msg).into_response()
            }
            AppError::PayloadTooLarge(msg) => (StatusCode::PAYLOAD_TOO_LARGE, msg).into_response(),
            AppError::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
        }
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(_) => AppError::NotFound(err.to_string()),
            StorageError::InvalidName(_) | StorageError::NotImage { .. } => {
                AppError::BadRequest(err.to_string())
            }
            StorageError::IO(_) | StorageError::Task(_) | StorageError::Unavailable(_) => {
                AppError::InternalError(err.to_string())
            }
        }
    }
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn service_unavailable_response() {
        let error = AppError::ServiceUnavailable;
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"Service unavailable");
    }

    #[tokio::test]
    async fn missing_object_is_not_found() {
        let error = AppError::from(StorageError::NotFound("photos/u1/a.jpg".to_string()));
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"object not found: photos/u1/a.jpg");
    }

    #[test]
    fn auth_error_status() {
        assert_eq!(
            StatusCode::BAD_REQUEST,
            AuthError::InvalidEmail("ab.co".to_string()).status()
        );
        assert_eq!(StatusCode::BAD_REQUEST, AuthError::WeakPassword(6).status());
        assert_eq!(
            StatusCode::CONFLICT,
            AuthError::AccountExists("a@b.co".to_string()).status()
        );
        assert_eq!(
            StatusCode::UNAUTHORIZED,
            AuthError::AccountNotFound("a@b.co".to_string()).status()
        );
        assert_eq!(StatusCode::UNAUTHORIZED, AuthError::InvalidCredentials.status());
        assert_eq!(
            StatusCode::INTERNAL_SERVER_ERROR,
            AuthError::Unavailable("connection reset".to_string()).status()
        );
    }

    #[tokio::test]
    async fn unauthorized_response() {
        let error = AppError::Unauthorized;
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
