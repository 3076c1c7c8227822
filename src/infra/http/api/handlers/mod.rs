//! Route handlers. Each is a thin adapter over one service call.

mod dishes;
mod menus;
mod submenus;

pub use dishes::*;
pub use menus::*;
pub use submenus::*;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use serde::Serialize;
use uuid::Uuid;

use super::error::{ApiError, codes};

/// Body returned by successful deletes.
#[derive(Debug, Serialize)]
pub struct DeleteStatus {
    pub status: String,
}

impl DeleteStatus {
    fn new(entity: &str, id: Uuid) -> Self {
        Self {
            status: format!("{entity} {id} was successfully deleted!"),
        }
    }
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| ApiError::bad_request(codes::INVALID_BODY, rejection.body_text()))
}
