//! Client for the dating service.
//!
//! The dating service keeps its own copy of every user who enabled dating.
//! Profiles are pushed to `{endpoint}/{prefix}-put-user` and removed through
//! `{endpoint}/{prefix}-remove-user`.

use async_trait::async_trait;
use serde_json::json;

use real_core::model::User;

use super::{ClientError, Result};

#[async_trait]
pub trait DatingClient: Send + Sync {
    async fn put_user(&self, user: &User) -> Result<()>;

    async fn remove_user(&self, user_id: &str) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct HttpDatingClient {
    http: reqwest::Client,
    endpoint: String,
    function_prefix: String,
}

impl HttpDatingClient {
    pub fn new(endpoint: impl Into<String>, function_prefix: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            function_prefix: function_prefix.into(),
        }
    }

    fn function_url(&self, function: &str) -> String {
        format!("{}/{}-{}", self.endpoint, self.function_prefix, function)
    }

    async fn invoke(&self, function: &str, payload: serde_json::Value) -> Result<()> {
        let url = self.function_url(function);
        let response = self
            .http
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|source| ClientError::Request {
                url: url.clone(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(ClientError::Status {
                url,
                status: response.status().as_u16(),
            });
        }
        tracing::debug!(%url, "Dating function invoked");
        Ok(())
    }
}

#[async_trait]
impl DatingClient for HttpDatingClient {
    async fn put_user(&self, user: &User) -> Result<()> {
        self.invoke("put-user", json!(user)).await
    }

    async fn remove_user(&self, user_id: &str) -> Result<()> {
        self.invoke("remove-user", json!({ "userId": user_id })).await
    }
}

/// Used when no dating endpoint is configured.
#[derive(Debug, Clone, Default)]
pub struct NoopDatingClient;

#[async_trait]
impl DatingClient for NoopDatingClient {
    async fn put_user(&self, user: &User) -> Result<()> {
        tracing::trace!(user_id = %user.user_id, "Dating disabled, skipping put");
        Ok(())
    }

    async fn remove_user(&self, user_id: &str) -> Result<()> {
        tracing::trace!(%user_id, "Dating disabled, skipping remove");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_function_url() {
        let client = HttpDatingClient::new("http://localhost:9000/", "real-dating-dev");
        assert_eq!(
            client.function_url("put-user"),
            "http://localhost:9000/real-dating-dev-put-user"
        );
        assert_eq!(
            client.function_url("remove-user"),
            "http://localhost:9000/real-dating-dev-remove-user"
        );
    }
}
