use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use real_core::storage::{repository_error_to_status_code, RepositoryError};

use crate::managers::{manager_error_to_status_code, ManagerError};

pub struct AppError(pub anyhow::Error);

impl AppError {
    fn status_code(&self) -> StatusCode {
        let code = if let Some(manager_error) = self.0.downcast_ref::<ManagerError>() {
            Some(manager_error_to_status_code(manager_error))
        } else {
            self.0
                .downcast_ref::<RepositoryError>()
                .map(repository_error_to_status_code)
        };
        code.and_then(|c| StatusCode::from_u16(c).ok())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status_code = self.status_code();
        if status_code.is_server_error() {
            tracing::error!(status = %status_code, error = %self.0, "Request failed");
        } else {
            tracing::debug!(status = %status_code, error = %self.0, "Request rejected");
        }

        (status_code, self.0.to_string()).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use real_core::model::{FollowError, PostError};

    #[test]
    fn test_manager_errors_map_to_status() {
        let err = AppError::from(ManagerError::from(PostError::DoesNotExist("pid".into())));
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);

        let err = AppError::from(ManagerError::from(FollowError::CannotFollowSelf("uid".into())));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_repository_error_maps_to_status() {
        let err = AppError::from(RepositoryError::ConnectionFailed("down".into()));
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_other_errors_are_internal() {
        let err = AppError(anyhow::anyhow!("boom"));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
