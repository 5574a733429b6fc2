use crate::domain::error::LeagueError;
use crate::domain::traits::LeagueApi;
use crate::infrastructure::config::ApiConfig;
use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "X-Request-Id";

/// League backend reached over HTTP
pub struct HttpLeagueApi {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpLeagueApi {
    pub fn new(client: Client, config: &ApiConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone().filter(|t| !t.is_empty()),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }
}

#[async_trait]
impl LeagueApi for HttpLeagueApi {
    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, LeagueError> {
        let request_id = Uuid::new_v4().to_string();
        let url = self.url(path);
        debug!(%method, %url, %request_id, "sending request");

        let mut request = self
            .client
            .request(method, &url)
            .header(REQUEST_ID_HEADER, &request_id);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;
        debug!(%request_id, status = status.as_u16(), len = bytes.len(), "response received");

        if status.is_success() {
            if status == StatusCode::NO_CONTENT || bytes.is_empty() {
                return Ok(Value::Null);
            }
            return Ok(serde_json::from_slice(&bytes)?);
        }

        // Error bodies are best effort; a non-JSON body is dropped
        let body = if bytes.is_empty() {
            None
        } else {
            serde_json::from_slice::<Value>(&bytes).ok()
        };
        Err(LeagueError::Status {
            status: status.as_u16(),
            body,
        })
    }
}
