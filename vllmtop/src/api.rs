//! HTTP client for the management server's REST endpoints.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::json;

use crate::types::{Model, ModelsResponse, ServerStatus, ServiceStatusDetails};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Request(#[from] reqwest::Error),

    /// Non-2xx response. Displays the body when the server sent one.
    #[error("{}", status_text(.status, .body))]
    Status { status: u16, body: String },

    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),
}

fn status_text(status: &u16, body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        return format!("HTTP {status}");
    }
    // the manager wraps refusals as {"detail": "..."}
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(v) => match v.get("detail").and_then(|d| d.as_str()) {
            Some(detail) => detail.to_string(),
            None => body.to_string(),
        },
        Err(_) => body.to_string(),
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Calls the session controller makes against a management server.
///
/// Every call takes the base URL so implementations stay stateless.
#[async_trait]
pub trait ServerApi: Send + Sync {
    async fn get_status(&self, base: &str) -> ApiResult<ServerStatus>;
    async fn get_models(&self, base: &str) -> ApiResult<Vec<Model>>;
    async fn get_service_status(&self, base: &str, lines: u32)
        -> ApiResult<ServiceStatusDetails>;
    async fn start(&self, base: &str) -> ApiResult<()>;
    async fn stop(&self, base: &str) -> ApiResult<()>;
    async fn restart(&self, base: &str) -> ApiResult<()>;
    async fn switch_model(&self, base: &str, model_id: &str) -> ApiResult<()>;
    async fn shutdown(&self, base: &str) -> ApiResult<()>;
}

pub fn join_url(base: &str, path: &str) -> String {
    format!("{}{}", base.trim_end_matches('/'), path)
}

/// `ServerApi` over reqwest.
#[derive(Clone)]
pub struct HttpApi {
    client: reqwest::Client,
}

impl HttpApi {
    pub fn new(timeout: Duration) -> ApiResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: String) -> ApiResult<T> {
        let resp = self.client.get(url).send().await?;
        let resp = Self::ensure_success(resp).await?;
        // decode from text so bad payloads surface as Decode, not Request
        let text = resp.text().await?;
        Ok(serde_json::from_str(&text)?)
    }

    async fn post(&self, url: String, body: Option<serde_json::Value>) -> ApiResult<()> {
        let mut req = self.client.post(url);
        if let Some(b) = body {
            req = req.json(&b);
        }
        let resp = req.send().await?;
        Self::ensure_success(resp).await?;
        Ok(())
    }

    async fn ensure_success(resp: reqwest::Response) -> ApiResult<reqwest::Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(ApiError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl ServerApi for HttpApi {
    async fn get_status(&self, base: &str) -> ApiResult<ServerStatus> {
        self.get_json(join_url(base, "/status")).await
    }

    async fn get_models(&self, base: &str) -> ApiResult<Vec<Model>> {
        let r: ModelsResponse = self.get_json(join_url(base, "/models")).await?;
        Ok(r.models)
    }

    async fn get_service_status(
        &self,
        base: &str,
        lines: u32,
    ) -> ApiResult<ServiceStatusDetails> {
        self.get_json(join_url(base, &format!("/service/status?lines={lines}")))
            .await
    }

    async fn start(&self, base: &str) -> ApiResult<()> {
        self.post(join_url(base, "/start"), None).await
    }

    async fn stop(&self, base: &str) -> ApiResult<()> {
        self.post(join_url(base, "/stop"), None).await
    }

    async fn restart(&self, base: &str) -> ApiResult<()> {
        self.post(join_url(base, "/restart"), None).await
    }

    async fn switch_model(&self, base: &str, model_id: &str) -> ApiResult<()> {
        self.post(join_url(base, "/switch"), Some(json!({ "model": model_id })))
            .await
    }

    async fn shutdown(&self, base: &str) -> ApiResult<()> {
        self.post(join_url(base, "/shutdown"), None).await
    }
}
