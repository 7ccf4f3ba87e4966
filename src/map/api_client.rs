use std::future::Future;

use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;

use crate::map::markers::{Category, RestaurantMarker};
use crate::map::watcher::MarkerQuery;
use crate::services::restaurant_service::RestaurantDetailView;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("not found")]
    NotFound,
    #[error("unexpected status {0}")]
    Status(u16),
    #[error("invalid url: {0}")]
    InvalidUrl(String),
}

/// The three reads the map needs from the directory API.
pub trait MapBackend: Send + Sync + 'static {
    fn fetch_markers(
        &self,
        query: &MarkerQuery,
    ) -> impl Future<Output = Result<Vec<RestaurantMarker>, ClientError>> + Send;

    fn fetch_categories(&self) -> impl Future<Output = Result<Vec<Category>, ClientError>> + Send;

    fn fetch_detail(
        &self,
        slug: &str,
    ) -> impl Future<Output = Result<RestaurantDetailView, ClientError>> + Send;
}

#[derive(Deserialize)]
struct Envelope<T> {
    data: T,
}

/// HTTP client for `/api/v1`.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
}

impl ApiClient {
    /// `base_url` is the server origin, e.g. `http://127.0.0.1:8000`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, reqwest::Client::new())
    }

    pub fn with_client(base_url: impl Into<String>, http: reqwest::Client) -> Self {
        Self {
            base_url: base_url.into(),
            http,
        }
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let raw = format!("{}/api/v1", self.base_url.trim_end_matches('/'));
        let mut url =
            Url::parse(&raw).map_err(|e| ClientError::InvalidUrl(format!("{}: {}", raw, e)))?;
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidUrl(raw.clone()))?
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ClientError> {
        let resp = request.send().await?;
        match resp.status() {
            s if s.is_success() => Ok(resp.json::<T>().await?),
            StatusCode::NOT_FOUND => Err(ClientError::NotFound),
            s => Err(ClientError::Status(s.as_u16())),
        }
    }

    /// Collections come wrapped in `{ "data": [...] }`.
    async fn get_data<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ClientError> {
        Ok(self.get_json::<Envelope<T>>(request).await?.data)
    }
}

impl MapBackend for ApiClient {
    async fn fetch_markers(
        &self,
        query: &MarkerQuery,
    ) -> Result<Vec<RestaurantMarker>, ClientError> {
        let url = self.endpoint(&["restaurants", "map"])?;
        self.get_data(self.http.get(url).query(&query.to_query_pairs())).await
    }

    async fn fetch_categories(&self) -> Result<Vec<Category>, ClientError> {
        let url = self.endpoint(&["categories"])?;
        self.get_data(self.http.get(url)).await
    }

    async fn fetch_detail(&self, slug: &str) -> Result<RestaurantDetailView, ClientError> {
        let url = self.endpoint(&["restaurants", slug])?;
        self.get_json(self.http.get(url)).await
    }
}
