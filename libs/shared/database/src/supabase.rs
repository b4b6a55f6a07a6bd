use anyhow::{Result, anyhow};
use reqwest::{
    Client,
    header::{HeaderMap, HeaderValue, CONTENT_TYPE, AUTHORIZATION},
    Method,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error};

use shared_config::AppConfig;

/// REST client for the backing document store. All four collections
/// (users, appointments, questionnaires, reminders) are reached through
/// equality-filtered queries, ordered+limited scans, and single-row
/// insert/patch with `Prefer: return=representation`.
///
/// Requests are signed with the service key; caller identity never reaches
/// the store, so authorization is enforced in the handlers.
pub struct SupabaseClient {
    client: Client,
    base_url: String,
    service_key: String,
}

impl SupabaseClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.supabase_url.clone(),
            service_key: config.supabase_service_key.clone(),
        }
    }

    fn get_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();

        if let Ok(key) = HeaderValue::from_str(&self.service_key) {
            headers.insert("apikey", key);
        }
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Ok(bearer) = HeaderValue::from_str(&format!("Bearer {}", self.service_key)) {
            headers.insert(AUTHORIZATION, bearer);
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

        let mut headers = self.get_headers();
        if let Some(extra) = extra_headers {
            headers.extend(extra);
        }

        let mut req = self.client.request(method, &url).headers(headers);

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

    /// Insert a row and return the stored representation.
    pub async fn insert_returning(&self, table: &str, row: Value) -> Result<Vec<Value>> {
        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));

        self.request_with_headers(
            Method::POST,
            &format!("/rest/v1/{}", table),
            Some(row),
            Some(headers),
        )
        .await
    }

    /// Patch rows matching `filter` (a raw query-string fragment) and return
    /// the updated representations. An empty result means no row matched;
    /// callers lean on this for conditional updates.
    pub async fn update_returning(&self, table: &str, filter: &str, patch: Value) -> Result<Vec<Value>> {
        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));

        self.request_with_headers(
            Method::PATCH,
            &format!("/rest/v1/{}?{}", table, filter),
            Some(patch),
            Some(headers),
        )
        .await
    }

    pub fn get_base_url(&self) -> &str {
        &self.base_url
    }
}
