//! REST API client store.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use url::Url;

use super::{InventoryStore, StoreError, StoreResult};
use crate::models::{
    InventoryItem, ItemDraft, RawActivity, SalesMetric, SalesPoint, TopSeller, User,
};

/// Header identifying the signed-in user to the backend.
pub const USER_EMAIL_HEADER: &str = "X-User-Email";

/// Store backed by the inventory REST API.
#[derive(Clone)]
pub struct HttpStore {
    client: reqwest::Client,
    base_url: Url,
    user_email: Option<String>,
}

#[derive(Deserialize)]
struct AuthResponse {
    user: User,
}

impl HttpStore {
    /// Create a client for the API at `base_url`.
    pub fn new(base_url: &str, user_email: Option<String>, timeout: Duration) -> StoreResult<Self> {
        let base_url = Url::parse(base_url).map_err(|e| {
            StoreError::InvalidConfig(format!("invalid API base URL '{}': {}", base_url, e))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(StoreError::InvalidConfig(format!(
                "API base URL cannot carry a path: {}",
                base_url
            )));
        }

        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url,
            user_email: user_email.filter(|email| !email.trim().is_empty()),
        })
    }

    /// Same client, acting for another user.
    pub fn with_user_email(&self, user_email: Option<String>) -> Self {
        Self {
            user_email,
            ..self.clone()
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Exchange an OAuth authorization code for the signed-in user.
    pub async fn exchange_code(&self, code: &str) -> StoreResult<User> {
        let mut url = self.endpoint(&["api", "auth", "google-auth"])?;
        url.query_pairs_mut().append_pair("code", code);

        let response: AuthResponse = self.fetch_json(self.request(Method::POST, url)).await?;
        tracing::info!(email = %response.user.email, "signed in");
        Ok(response.user)
    }

    /// Build a URL under the base from path segments. Segments are escaped.
    pub fn endpoint(&self, segments: &[&str]) -> StoreResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                StoreError::InvalidConfig(format!(
                    "API base URL cannot carry a path: {}",
                    self.base_url
                ))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self
            .client
            .request(method, url)
            .header("Accept", "application/json");
        match &self.user_email {
            Some(email) => builder.header(USER_EMAIL_HEADER, email),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> StoreResult<Response> {
        let response = builder.send().await.map_err(|e| {
            tracing::warn!(error = %e, "inventory API unreachable");
            StoreError::Transport(e)
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let detail = error_detail(&body);
        tracing::warn!(
            status = status.as_u16(),
            detail = ?detail,
            "inventory API rejected request"
        );
        Err(StoreError::Rejected {
            status: status.as_u16(),
            detail,
        })
    }

    async fn fetch_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> StoreResult<T> {
        let body = self.send(builder).await?.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn execute(&self, builder: RequestBuilder) -> StoreResult<()> {
        self.send(builder).await.map(|_| ())
    }
}

/// The `detail` string of an error body, when it has one.
///
/// Validation errors carry a list under `detail`; those are ignored.
pub fn error_detail(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("detail")?
        .as_str()
        .filter(|detail| !detail.trim().is_empty())
        .map(String::from)
}

#[async_trait]
impl InventoryStore for HttpStore {
    async fn list_items(&self) -> StoreResult<Vec<InventoryItem>> {
        let url = self.endpoint(&["api", "inventory"])?;
        self.fetch_json(self.request(Method::GET, url)).await
    }

    async fn list_activities(&self) -> StoreResult<Vec<RawActivity>> {
        let url = self.endpoint(&["api", "inventory", "activities"])?;
        self.fetch_json(self.request(Method::GET, url)).await
    }

    async fn create_item(&self, draft: &ItemDraft) -> StoreResult<()> {
        let url = self.endpoint(&["api", "inventory"])?;
        self.execute(self.request(Method::POST, url).json(draft)).await
    }

    async fn update_item(&self, id: &str, draft: &ItemDraft) -> StoreResult<()> {
        let url = self.endpoint(&["api", "inventory", id])?;
        self.execute(self.request(Method::PUT, url).json(draft)).await
    }

    async fn delete_item(&self, id: &str) -> StoreResult<()> {
        let url = self.endpoint(&["api", "inventory", id])?;
        self.execute(self.request(Method::DELETE, url)).await
    }

    async fn sell(&self, id: &str, quantity: u32) -> StoreResult<()> {
        let url = self.endpoint(&["api", "inventory", id, "sell"])?;
        self.execute(self.request(Method::POST, url).json(&json!({ "quantity": quantity })))
            .await
    }

    async fn restock(&self, id: &str, quantity: u32) -> StoreResult<()> {
        let url = self.endpoint(&["api", "inventory", id, "restock"])?;
        self.execute(self.request(Method::POST, url).json(&json!({ "quantity": quantity })))
            .await
    }

    async fn sales_over_time(&self, metric: SalesMetric) -> StoreResult<Vec<SalesPoint>> {
        let mut url = self.endpoint(&["api", "inventory", "sales-over-time"])?;
        url.query_pairs_mut().append_pair("by", metric.as_query());
        self.fetch_json(self.request(Method::GET, url)).await
    }

    async fn top_selling(&self) -> StoreResult<Vec<TopSeller>> {
        let url = self.endpoint(&["api", "inventory", "top-selling"])?;
        self.fetch_json(self.request(Method::GET, url)).await
    }
}
