use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client, Method,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error};

use shared_config::AppConfig;
use shared_models::error::AppError;

/// Thin client over a PostgREST endpoint. The application authenticates to
/// storage with its own service key; row visibility is enforced by the
/// service layer through query filters, never by the storage role.
pub struct PostgrestClient {
    client: Client,
    base_url: String,
    service_key: String,
}

impl PostgrestClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.postgrest_url.clone(),
            service_key: config.postgrest_service_key.clone(),
        }
    }

    fn headers(&self, returning: bool) -> Result<HeaderMap, AppError> {
        let mut headers = HeaderMap::new();

        let key = HeaderValue::from_str(&self.service_key)
            .map_err(|e| AppError::Internal(format!("Invalid service key: {}", e)))?;
        headers.insert("apikey", key);

        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.service_key))
            .map_err(|e| AppError::Internal(format!("Invalid service key: {}", e)))?;
        headers.insert(AUTHORIZATION, bearer);

        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if returning {
            headers.insert("Prefer", HeaderValue::from_static("return=representation"));
        }

        Ok(headers)
    }

    async fn request<T>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        returning: bool,
    ) -> Result<T, AppError>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!("Storage request: {} {}", method, url);

        let mut req = self
            .client
            .request(method, &url)
            .headers(self.headers(returning)?);

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req
            .send()
            .await
            .map_err(|e| AppError::Database(format!("Storage request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("Storage error ({}): {}", status, error_text);
            return Err(AppError::Database(format!(
                "Storage error ({}): {}",
                status, error_text
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| AppError::Database(format!("Invalid storage response: {}", e)))
    }

    pub async fn select<T>(&self, path: &str) -> Result<T, AppError>
    where
        T: DeserializeOwned,
    {
        self.request(Method::GET, path, None, false).await
    }

    /// Insert a row and return the stored representation.
    pub async fn insert<T>(&self, path: &str, body: Value) -> Result<T, AppError>
    where
        T: DeserializeOwned,
    {
        self.request(Method::POST, path, Some(body), true).await
    }

    /// Patch rows matched by the path's filters and return the updated rows.
    /// An empty result means no row matched the filters.
    pub async fn update<T>(&self, path: &str, body: Value) -> Result<T, AppError>
    where
        T: DeserializeOwned,
    {
        self.request(Method::PATCH, path, Some(body), true).await
    }

    /// Delete rows matched by the path's filters and return the deleted rows,
    /// so callers can distinguish "deleted" from "nothing matched".
    pub async fn delete<T>(&self, path: &str) -> Result<T, AppError>
    where
        T: DeserializeOwned,
    {
        self.request(Method::DELETE, path, None, true).await
    }
}
