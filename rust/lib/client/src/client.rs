use std::time::Duration;

use reqwest::Response;
use serde::de::DeserializeOwned;
use tracing::debug;

use bugs::model::{Bug, BugPatch, CreateBug};

use crate::error::ClientError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Typed client for the `/api/bugs` endpoints.
#[derive(Debug, Clone)]
pub struct BugClient {
    http: reqwest::Client,
    base_url: String,
}

impl BugClient {
    /// `base_url` is the server root, e.g. `http://localhost:5000`.
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn bugs_url(&self) -> String {
        format!("{}/api/bugs", self.base_url)
    }

    fn bug_url(&self, id: &str) -> String {
        format!("{}/api/bugs/{}", self.base_url, id)
    }

    /// `GET /api/bugs`
    pub async fn list(&self) -> Result<Vec<Bug>, ClientError> {
        let resp = self.http.get(self.bugs_url()).send().await?;
        decode(resp).await
    }

    /// `POST /api/bugs`
    pub async fn create(&self, input: &CreateBug) -> Result<Bug, ClientError> {
        let resp = self.http.post(self.bugs_url()).json(input).send().await?;
        decode(resp).await
    }

    /// `PUT /api/bugs/{id}`. `None` means the server has no bug with this id.
    pub async fn update(&self, id: &str, patch: &BugPatch) -> Result<Option<Bug>, ClientError> {
        let resp = self.http.put(self.bug_url(id)).json(patch).send().await?;
        decode(resp).await
    }

    /// `DELETE /api/bugs/{id}`. Returns the server's confirmation message.
    pub async fn delete(&self, id: &str) -> Result<String, ClientError> {
        let resp = self.http.delete(self.bug_url(id)).send().await?;
        let body: serde_json::Value = decode(resp).await?;
        Ok(body["message"].as_str().unwrap_or_default().to_string())
    }

    /// `GET /health`
    pub async fn health(&self) -> Result<serde_json::Value, ClientError> {
        let resp = self
            .http
            .get(format!("{}/health", self.base_url))
            .send()
            .await?;
        decode(resp).await
    }
}

/// Turn a response into `T`, or into `ClientError::Api` carrying the
/// server's `error` message.
async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, ClientError> {
    let status = resp.status();
    debug!(url = %resp.url(), %status, "response");

    if status.is_success() {
        return Ok(resp.json::<T>().await?);
    }

    let message = match resp.json::<serde_json::Value>().await {
        Ok(body) => body["error"].as_str().unwrap_or("unknown error").to_string(),
        Err(_) => status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string(),
    };
    Err(ClientError::Api {
        status: status.as_u16(),
        message,
    })
}
