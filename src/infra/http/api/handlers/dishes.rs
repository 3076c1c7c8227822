use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use uuid::Uuid;

use crate::domain::input::{DishInput, DishPatch};
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::state::ApiState;

use super::{DeleteStatus, body};

pub async fn list_dishes(
    State(state): State<ApiState>,
    Path((menu_id, submenu_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.dishes.get_list(menu_id, submenu_id).await?))
}

pub async fn get_dish(
    State(state): State<ApiState>,
    Path((menu_id, submenu_id, dish_id)): Path<(Uuid, Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(
        state.dishes.get_detail(menu_id, submenu_id, dish_id).await?,
    ))
}

pub async fn create_dish(
    State(state): State<ApiState>,
    Path((menu_id, submenu_id)): Path<(Uuid, Uuid)>,
    payload: Result<Json<DishInput>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let dish = state
        .dishes
        .create(menu_id, submenu_id, body(payload)?)
        .await?;
    Ok((StatusCode::CREATED, Json(dish)))
}

pub async fn update_dish(
    State(state): State<ApiState>,
    Path((menu_id, submenu_id, dish_id)): Path<(Uuid, Uuid, Uuid)>,
    payload: Result<Json<DishPatch>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let dish = state
        .dishes
        .update(menu_id, submenu_id, dish_id, body(payload)?)
        .await?;
    Ok(Json(dish))
}

pub async fn delete_dish(
    State(state): State<ApiState>,
    Path((menu_id, submenu_id, dish_id)): Path<(Uuid, Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    state.dishes.delete(menu_id, submenu_id, dish_id).await?;
    Ok(Json(DeleteStatus::new("Dish", dish_id)))
}
