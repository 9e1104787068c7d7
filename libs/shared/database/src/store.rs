use anyhow::{anyhow, Result};
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client, Method,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error, warn};

use shared_config::AppConfig;
use shared_models::ids::EntityId;

/// Document-store client speaking the PostgREST wire conventions.
///
/// One instance is constructed from `AppConfig` at the request boundary and
/// handed down by value; there is no module-level connection singleton. The
/// store guarantees atomicity for a single document write only.
pub struct StoreClient {
    client: Client,
    base_url: String,
    service_key: String,
}

impl StoreClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.store_url.clone(),
            service_key: config.store_service_key.clone(),
        }
    }

    fn headers(&self, extra: Option<HeaderMap>) -> HeaderMap {
        let mut headers = HeaderMap::new();

        if let Ok(key) = HeaderValue::from_str(&self.service_key) {
            headers.insert("apikey", key);
        }
        if let Ok(bearer) = HeaderValue::from_str(&format!("Bearer {}", self.service_key)) {
            headers.insert(AUTHORIZATION, bearer);
        }
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(extra) = extra {
            headers.extend(extra);
        }

        headers
    }

    pub async fn request<T>(&self, method: Method, path: &str, body: Option<Value>) -> Result<T>
    where
        T: DeserializeOwned,
    {
        self.request_with_headers(method, path, body, None).await
    }

    pub async fn request_with_headers<T>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        extra_headers: Option<HeaderMap>,
    ) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making request to {}", url);

        let mut req = self
            .client
            .request(method, &url)
            .headers(self.headers(extra_headers));

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            error!("Store error ({}): {}", status, error_text);

            return Err(match status.as_u16() {
                401 | 403 => anyhow!("Authentication error: {}", error_text),
                404 => anyhow!("Resource not found: {}", error_text),
                _ => anyhow!("Store error ({}): {}", status, error_text),
            });
        }

        let data = response.json::<T>().await?;
        Ok(data)
    }

    /// Paginated fetch returning the rows plus the collection-wide match
    /// count, via `Prefer: count=exact` and the `Content-Range` reply header.
    pub async fn fetch_with_count<T>(&self, path: &str) -> Result<(Vec<T>, u64)>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making counted request to {}", url);

        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("count=exact"));

        let response = self
            .client
            .request(Method::GET, &url)
            .headers(self.headers(Some(headers)))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            error!("Store error ({}): {}", status, error_text);
            return Err(anyhow!("Store error ({}): {}", status, error_text));
        }

        let total = response
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range_total);

        let items: Vec<T> = response.json().await?;
        let total = match total {
            Some(total) => total,
            None => {
                warn!("Counted request to {} returned no usable Content-Range, falling back to page length", url);
                items.len() as u64
            }
        };

        Ok((items, total))
    }

    /// Fetch a single document by id. `Ok(None)` when the collection has no
    /// matching row.
    pub async fn find_by_id<T>(&self, collection: &str, id: EntityId) -> Result<Option<T>>
    where
        T: DeserializeOwned,
    {
        let path = format!("/rest/v1/{}?id=eq.{}", collection, id);
        let mut rows: Vec<T> = self.request(Method::GET, &path, None).await?;

        if rows.is_empty() {
            Ok(None)
        } else {
            Ok(Some(rows.swap_remove(0)))
        }
    }

    /// Insert one document and return the stored representation.
    pub async fn insert<T>(&self, collection: &str, document: Value) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));

        let path = format!("/rest/v1/{}", collection);
        let mut rows: Vec<T> = self
            .request_with_headers(Method::POST, &path, Some(document), Some(headers))
            .await?;

        if rows.is_empty() {
            return Err(anyhow!("insert into {} returned no representation", collection));
        }
        Ok(rows.swap_remove(0))
    }

    /// Apply a sparse patch to one document. `Ok(None)` when no row matched.
    pub async fn patch<T>(&self, collection: &str, id: EntityId, patch: Value) -> Result<Option<T>>
    where
        T: DeserializeOwned,
    {
        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));

        let path = format!("/rest/v1/{}?id=eq.{}", collection, id);
        let mut rows: Vec<T> = self
            .request_with_headers(Method::PATCH, &path, Some(patch), Some(headers))
            .await?;

        if rows.is_empty() {
            Ok(None)
        } else {
            Ok(Some(rows.swap_remove(0)))
        }
    }

    /// Hard-delete one document, returning the removed row so callers can
    /// snapshot it. `Ok(None)` when no row matched.
    pub async fn delete_returning<T>(&self, collection: &str, id: EntityId) -> Result<Option<T>>
    where
        T: DeserializeOwned,
    {
        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));

        let path = format!("/rest/v1/{}?id=eq.{}", collection, id);
        let mut rows: Vec<T> = self
            .request_with_headers(Method::DELETE, &path, None, Some(headers))
            .await?;

        if rows.is_empty() {
            Ok(None)
        } else {
            Ok(Some(rows.swap_remove(0)))
        }
    }

    pub fn get_base_url(&self) -> &str {
        &self.base_url
    }
}

/// `Content-Range: 0-9/42` -> 42. A `*/0` range (empty page) is also valid.
fn parse_content_range_total(raw: &str) -> Option<u64> {
    raw.rsplit('/').next()?.trim().parse().ok()
}
