use axum::{
    extract::{Path, RawQuery, State},
    Json,
};
use tracing::warn;

use crate::error::AppError;
use crate::services::restaurant_filters::{parse_query_pairs, ListFilter, MarkerFilter};
use crate::services::restaurant_service::{
    self, Page, RestaurantDetailView, RestaurantListItemView, RestaurantMarkerView,
};
use crate::web::{AppState, Data};

/// GET /api/v1/restaurants/map
pub async fn map_markers_handler(
    State(state): State<AppState>,
    RawQuery(raw): RawQuery,
) -> Result<Json<Data<Vec<RestaurantMarkerView>>>, AppError> {
    let pairs = parse_query_pairs(raw.as_deref())?;
    let filter = MarkerFilter::from_query(&pairs).inspect_err(|e| {
        warn!("Rejected map query {:?}: {}", raw, e);
    })?;

    let data = restaurant_service::list_map_markers(&state.pool, &state.images, &filter).await?;
    Ok(Json(Data { data }))
}

/// GET /api/v1/restaurants
pub async fn list_restaurants_handler(
    State(state): State<AppState>,
    RawQuery(raw): RawQuery,
) -> Result<Json<Page<RestaurantListItemView>>, AppError> {
    let pairs = parse_query_pairs(raw.as_deref())?;
    let filter = ListFilter::from_query(&pairs)?;
    Ok(Json(
        restaurant_service::list_page(&state.pool, &state.images, &filter).await?,
    ))
}

/// GET /api/v1/restaurants/{slug}
pub async fn restaurant_detail_handler(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<RestaurantDetailView>, AppError> {
    Ok(Json(
        restaurant_service::load_detail(&state.pool, &state.images, &slug).await?,
    ))
}
