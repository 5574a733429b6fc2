use crate::domain::error::LeagueError;
use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;

/// Trait for the league backend
///
/// Abstracts the REST transport so store actions can run against the real
/// HTTP client or an in-process fake.
#[async_trait]
pub trait LeagueApi: Send + Sync {
    /// Send a request and return the decoded JSON payload (`Null` for empty bodies).
    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, LeagueError>;

    async fn get(&self, path: &str) -> Result<Value, LeagueError> {
        self.send(Method::GET, path, None).await
    }

    async fn post(&self, path: &str, body: Value) -> Result<Value, LeagueError> {
        self.send(Method::POST, path, Some(body)).await
    }

    async fn put(&self, path: &str, body: Value) -> Result<Value, LeagueError> {
        self.send(Method::PUT, path, Some(body)).await
    }

    async fn patch(&self, path: &str, body: Value) -> Result<Value, LeagueError> {
        self.send(Method::PATCH, path, Some(body)).await
    }

    async fn delete(&self, path: &str) -> Result<Value, LeagueError> {
        self.send(Method::DELETE, path, None).await
    }
}
