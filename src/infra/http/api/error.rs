use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::application::error::{ErrorReport, ServiceError};
use crate::application::repos::RepoError;
use crate::domain::error::DomainError;

pub mod codes {
    pub const NOT_FOUND: &str = "not_found";
    pub const VALIDATION: &str = "validation_error";
    pub const INVALID_BODY: &str = "invalid_body";
    pub const DUPLICATE: &str = "duplicate";
    pub const INVALID_INPUT: &str = "invalid_input";
    pub const INTEGRITY: &str = "integrity_error";
    pub const DB_TIMEOUT: &str = "db_timeout";
    pub const REPO: &str = "repo_error";
}

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub detail: String,
    pub code: &'static str,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    detail: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, detail: impl Into<String>) -> Self {
        Self {
            status,
            code,
            detail: detail.into(),
        }
    }

    pub fn bad_request(code: &'static str, detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, code, detail)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

/// NotFound becomes 404; validation and every storage failure become 400.
impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Domain(err @ DomainError::NotFound { .. }) => {
                Self::new(StatusCode::NOT_FOUND, codes::NOT_FOUND, err.to_string())
            }
            ServiceError::Domain(err @ DomainError::Validation { .. }) => {
                Self::bad_request(codes::VALIDATION, err.to_string())
            }
            ServiceError::Repo(err) => {
                let code = match &err {
                    RepoError::Duplicate { .. } => codes::DUPLICATE,
                    RepoError::InvalidInput { .. } => codes::INVALID_INPUT,
                    RepoError::Integrity { .. } => codes::INTEGRITY,
                    RepoError::Timeout => codes::DB_TIMEOUT,
                    RepoError::NotFound | RepoError::Persistence(_) => codes::REPO,
                };
                Self::bad_request(code, err.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let report = ErrorReport::from_message(
            "infra::http::api",
            self.status,
            format!("{}: {}", self.code, self.detail),
        );
        let body = ApiErrorBody {
            detail: self.detail,
            code: self.code,
        };
        let mut response = (self.status, Json(body)).into_response();
        report.attach(&mut response);
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_404_with_entity_message() {
        let err = ApiError::from(ServiceError::not_found("dish"));
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.detail, "dish not found");
    }

    #[test]
    fn storage_failures_map_to_400() {
        let err = ApiError::from(ServiceError::Repo(RepoError::Duplicate {
            constraint: "menus_title_key".into(),
        }));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code, codes::DUPLICATE);
    }
}
