use reqwest::{
    Client,
    header::{HeaderMap, HeaderValue, CONTENT_TYPE, AUTHORIZATION},
    Method, StatusCode,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, warn};

use shared_config::AppConfig;

use crate::store::StoreError;

/// PostgreSQL SQLSTATE for unique_violation, surfaced by PostgREST in `code`.
const UNIQUE_VIOLATION: &str = "23505";

#[derive(Debug, Error)]
pub enum SupabaseError {
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid header value: {0}")]
    InvalidHeader(String),

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

impl From<SupabaseError> for StoreError {
    fn from(err: SupabaseError) -> Self {
        match err {
            SupabaseError::UniqueViolation(message) => StoreError::UniqueViolation(message),
            SupabaseError::Decode(message) => StoreError::Decode(message),
            other => StoreError::Unavailable(other.to_string()),
        }
    }
}

/// Thin PostgREST client over the Supabase REST endpoint.
pub struct SupabaseClient {
    client: Client,
    base_url: String,
    anon_key: String,
    service_role_key: String,
}

impl SupabaseClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.supabase_url.trim_end_matches('/').to_string(),
            anon_key: config.supabase_anon_key.clone(),
            service_role_key: config.supabase_service_role_key.clone(),
        }
    }

    fn get_headers(&self, auth_token: Option<&str>, prefer: Option<&str>) -> Result<HeaderMap, SupabaseError> {
        let mut headers = HeaderMap::new();

        headers.insert(
            "apikey",
            HeaderValue::from_str(&self.anon_key)
                .map_err(|e| SupabaseError::InvalidHeader(e.to_string()))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(token) = auth_token {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {}", token))
                    .map_err(|e| SupabaseError::InvalidHeader(e.to_string()))?,
            );
        }

        if let Some(prefer) = prefer {
            headers.insert(
                "Prefer",
                HeaderValue::from_str(prefer).map_err(|e| SupabaseError::InvalidHeader(e.to_string()))?,
            );
        }

        Ok(headers)
    }

    pub async fn request<T>(
        &self,
        method: Method,
        path: &str,
        auth_token: Option<&str>,
        body: Option<Value>,
    ) -> Result<T, SupabaseError>
    where
        T: DeserializeOwned,
    {
        self.request_with_prefer(method, path, auth_token, body, None).await
    }

    /// Issue a request with a PostgREST `Prefer` header, e.g. `return=representation`
    /// so that inserts and conditional updates echo the affected rows.
    pub async fn request_with_prefer<T>(
        &self,
        method: Method,
        path: &str,
        auth_token: Option<&str>,
        body: Option<Value>,
        prefer: Option<&str>,
    ) -> Result<T, SupabaseError>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making {} request to {}", method, url);

        let headers = self.get_headers(auth_token, prefer)?;

        let mut req = self.client.request(method, &url).headers(headers);

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(Self::classify_error(status, text));
        }

        serde_json::from_str::<T>(&text).map_err(|e| SupabaseError::Decode(e.to_string()))
    }

    fn classify_error(status: StatusCode, error_text: String) -> SupabaseError {
        let code = serde_json::from_str::<Value>(&error_text)
            .ok()
            .and_then(|body| body.get("code").and_then(Value::as_str).map(str::to_owned));

        if status == StatusCode::CONFLICT && code.as_deref() == Some(UNIQUE_VIOLATION) {
            warn!("Unique constraint rejected write: {}", error_text);
            return SupabaseError::UniqueViolation(error_text);
        }

        error!("API error ({}): {}", status, error_text);

        match status.as_u16() {
            401 | 403 => SupabaseError::Auth(error_text),
            404 => SupabaseError::NotFound(error_text),
            other => SupabaseError::Api {
                status: other,
                message: error_text,
            },
        }
    }

    /// Bearer token used for server-side store access.
    pub fn service_token(&self) -> &str {
        &self.service_role_key
    }
}
