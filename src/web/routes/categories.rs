use axum::{
    extract::{Path, State},
    Json,
};

use crate::error::AppError;
use crate::services::category_service::{self, CategoryView};
use crate::web::{AppState, Data};

pub async fn list_categories_handler(
    State(state): State<AppState>,
) -> Result<Json<Data<Vec<CategoryView>>>, AppError> {
    let data = category_service::list_active(&state.pool).await?;
    Ok(Json(Data { data }))
}

pub async fn show_category_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<CategoryView>, AppError> {
    Ok(Json(category_service::find_active(&state.pool, id).await?))
}
