use std::time::Duration;

use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, get_service},
    Router,
};
use serde::Serialize;
use sqlx::SqlitePool;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::services::image_service::ImageUrls;

pub mod routes;

use routes::{categories, restaurants};

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub images: ImageUrls,
}

/// `{ "data": ... }` wrapper used by collection endpoints.
#[derive(Debug, Serialize)]
pub struct Data<T> {
    pub data: T,
}

/// Public JSON API. Static files and CORS are added by [`app`].
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/categories", get(categories::list_categories_handler))
        .route("/categories/:id", get(categories::show_category_handler))
        .route("/restaurants/map", get(restaurants::map_markers_handler))
        .route("/restaurants", get(restaurants::list_restaurants_handler))
        .route("/restaurants/:slug", get(restaurants::restaurant_detail_handler))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ));

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::new())
        .with_state(state)
}

pub fn app(config: &Config, state: AppState) -> Router {
    let origins = config
        .cors_allowed_origins
        .iter()
        .filter_map(|o| o.parse::<HeaderValue>().ok())
        .collect::<Vec<_>>();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(true)
        .max_age(Duration::from_secs(60 * 60));

    router(state)
        .nest_service("/storage", get_service(ServeDir::new(&config.storage_dir)))
        .layer(cors)
}
