//! HTTP client for Cloud Code function calls.
//!
//! Every call is `POST {url}/functions/{name}` with the application id and
//! master key headers. Successful responses wrap the value in
//! `{"result": ...}`; failures carry `{"code": .., "error": ..}`.

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use sensbox_core::config::directory::DirectoryConfig;
use sensbox_core::error::{AppError, ErrorKind};
use sensbox_core::result::AppResult;

const APPLICATION_ID_HEADER: &str = "X-Parse-Application-Id";
const MASTER_KEY_HEADER: &str = "X-Parse-Master-Key";

/// Authenticated Cloud Code client.
#[derive(Clone)]
pub struct CloudClient {
    http: reqwest::Client,
    base_url: String,
}

impl std::fmt::Debug for CloudClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[derive(serde::Deserialize)]
struct ResultEnvelope<T> {
    result: T,
}

#[derive(serde::Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    error: Option<String>,
}

impl CloudClient {
    /// Build a client from the directory configuration.
    pub fn new(config: &DirectoryConfig) -> AppResult<Self> {
        let headers = build_headers(config)?;

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::Configuration,
                    "Failed to build directory HTTP client",
                    e,
                )
            })?;

        Ok(Self {
            http,
            base_url: config.url.trim_end_matches('/').to_string(),
        })
    }

    /// Call a Cloud Code function and decode its `result`.
    pub async fn run<P, R>(&self, function: &str, params: &P) -> AppResult<R>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = format!("{}/functions/{function}", self.base_url);
        debug!(function, "Calling directory function");

        let response = self
            .http
            .post(&url)
            .json(params)
            .send()
            .await
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::BackendCall,
                    format!("{function}: request failed"),
                    e,
                )
            })?;

        let status = response.status();
        let body = response.bytes().await.map_err(|e| {
            AppError::with_source(
                ErrorKind::BackendCall,
                format!("{function}: failed to read response"),
                e,
            )
        })?;

        decode_response(function, status, &body)
    }
}

fn build_headers(config: &DirectoryConfig) -> AppResult<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    let app_id = HeaderValue::from_str(&config.app_id)
        .map_err(|e| AppError::with_source(ErrorKind::Configuration, "Invalid app id", e))?;
    headers.insert(APPLICATION_ID_HEADER, app_id);

    let mut master_key = HeaderValue::from_str(&config.master_key)
        .map_err(|e| AppError::with_source(ErrorKind::Configuration, "Invalid master key", e))?;
    master_key.set_sensitive(true);
    headers.insert(MASTER_KEY_HEADER, master_key);

    Ok(headers)
}

fn decode_response<R: DeserializeOwned>(
    function: &str,
    status: StatusCode,
    body: &[u8],
) -> AppResult<R> {
    if !status.is_success() {
        let detail = serde_json::from_slice::<ErrorEnvelope>(body)
            .ok()
            .map(|e| {
                format!(
                    "code {}: {}",
                    e.code.unwrap_or_default(),
                    e.error.unwrap_or_default()
                )
            })
            .unwrap_or_else(|| String::from_utf8_lossy(body).into_owned());
        return Err(AppError::backend_call(format!(
            "{function} returned {status} ({detail})"
        )));
    }

    let envelope: ResultEnvelope<R> = serde_json::from_slice(body).map_err(|e| {
        AppError::with_source(
            ErrorKind::BackendCall,
            format!("{function}: unexpected response shape"),
            e,
        )
    })?;
    Ok(envelope.result)
}
