use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

use giftlist_types::api::{AuthResponse, ContentHash, LoginRequest, RegisterRequest, UserInfo};
use giftlist_types::events::UpdatesResponse;
use giftlist_types::models::{PresentDetails, Recipient};

use crate::error::SyncError;
use crate::source::{Snapshot, SyncSource};

/// HTTP client for the gift list API. The session cookie set by `login`
/// lives in the client's cookie store.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, SyncError> {
        let http = Client::builder().cookie_store(true).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<UserInfo, SyncError> {
        let resp = self
            .http
            .post(self.url("/api/login"))
            .json(&LoginRequest {
                username: username.to_string(),
                password: password.to_string(),
            })
            .send()
            .await?;
        let auth: AuthResponse = decode(resp).await?;
        debug!("Logged in as {}", auth.user.username);
        Ok(auth.user)
    }

    /// Create an account. The server logs the new user in straight away.
    pub async fn register(&self, username: &str, password: &str) -> Result<UserInfo, SyncError> {
        let resp = self
            .http
            .post(self.url("/api/register"))
            .json(&RegisterRequest {
                username: username.to_string(),
                password: password.to_string(),
            })
            .send()
            .await?;
        let auth: AuthResponse = decode(resp).await?;
        Ok(auth.user)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, SyncError> {
        let resp = self.http.get(self.url(path)).send().await?;
        decode(resp).await
    }
}

async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, SyncError> {
    let status = resp.status();
    if status == StatusCode::UNAUTHORIZED {
        return Err(SyncError::Unauthorized);
    }
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        let message = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
            .unwrap_or(body);
        return Err(SyncError::Status {
            status: status.as_u16(),
            message,
        });
    }
    let bytes = resp.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[async_trait]
impl SyncSource for ApiClient {
    async fn updates_since(&self, since: Option<i64>) -> Result<UpdatesResponse, SyncError> {
        match since {
            Some(since) => self.get_json(&format!("/api/updates?since={since}")).await,
            None => self.get_json("/api/updates").await,
        }
    }

    async fn content_hash(&self) -> Result<String, SyncError> {
        let hash: ContentHash = self.get_json("/api/recipients-hash").await?;
        Ok(hash.hash)
    }

    async fn snapshot(&self) -> Result<Snapshot, SyncError> {
        let (recipients, presents) = tokio::try_join!(
            self.get_json::<Vec<Recipient>>("/api/recipients"),
            self.get_json::<Vec<PresentDetails>>("/api/presents/all"),
        )?;
        Ok(Snapshot { recipients, presents })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_is_normalized() {
        let client = ApiClient::new("http://localhost:3000/").unwrap();
        assert_eq!(client.url("/api/version"), "http://localhost:3000/api/version");
    }
}
