use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use uuid::Uuid;

use crate::domain::input::{MenuInput, MenuPatch};
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::state::ApiState;

use super::{DeleteStatus, body};

pub async fn get_tree(State(state): State<ApiState>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.menus.get_tree().await?))
}

pub async fn list_menus(State(state): State<ApiState>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.menus.get_list().await?))
}

pub async fn get_menu(
    State(state): State<ApiState>,
    Path(menu_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.menus.get_detail(menu_id).await?))
}

pub async fn create_menu(
    State(state): State<ApiState>,
    payload: Result<Json<MenuInput>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let menu = state.menus.create(body(payload)?).await?;
    Ok((StatusCode::CREATED, Json(menu)))
}

pub async fn update_menu(
    State(state): State<ApiState>,
    Path(menu_id): Path<Uuid>,
    payload: Result<Json<MenuPatch>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.menus.update(menu_id, body(payload)?).await?))
}

pub async fn delete_menu(
    State(state): State<ApiState>,
    Path(menu_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.menus.delete(menu_id).await?;
    Ok(Json(DeleteStatus::new("Menu", menu_id)))
}
