use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use uuid::Uuid;

use crate::domain::input::{SubmenuInput, SubmenuPatch};
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::state::ApiState;

use super::{DeleteStatus, body};

pub async fn list_submenus(
    State(state): State<ApiState>,
    Path(menu_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.submenus.get_list(menu_id).await?))
}

pub async fn get_submenu(
    State(state): State<ApiState>,
    Path((menu_id, submenu_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.submenus.get_detail(menu_id, submenu_id).await?))
}

pub async fn create_submenu(
    State(state): State<ApiState>,
    Path(menu_id): Path<Uuid>,
    payload: Result<Json<SubmenuInput>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let submenu = state.submenus.create(menu_id, body(payload)?).await?;
    Ok((StatusCode::CREATED, Json(submenu)))
}

pub async fn update_submenu(
    State(state): State<ApiState>,
    Path((menu_id, submenu_id)): Path<(Uuid, Uuid)>,
    payload: Result<Json<SubmenuPatch>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let submenu = state
        .submenus
        .update(menu_id, submenu_id, body(payload)?)
        .await?;
    Ok(Json(submenu))
}

pub async fn delete_submenu(
    State(state): State<ApiState>,
    Path((menu_id, submenu_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    state.submenus.delete(menu_id, submenu_id).await?;
    Ok(Json(DeleteStatus::new("Submenu", submenu_id)))
}
