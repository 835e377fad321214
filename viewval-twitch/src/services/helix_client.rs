//! Twitch Helix API client
//!
//! App-access-token authentication (client-credentials grant), batched login
//! lookups and VOD listing. Implements [`StreamPlatform`] for the stats
//! orchestrator and the collector.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use viewval_common::config::{TwitchCredentials, MAX_VOD_COUNT};
use viewval_common::{BroadcastRecord, ChannelId};

use super::platform::{LiveStream, SourceError, StreamPlatform};

const HELIX_BASE_URL: &str = "https://api.twitch.tv/helix";
const TOKEN_URL: &str = "https://id.twitch.tv/oauth2/token";
const USER_AGENT: &str = "viewval/0.1.0";
const RATE_LIMIT_MS: u64 = 100; // Helix app tokens get 800 points/minute
const MAX_LOGINS_PER_REQUEST: usize = 100;
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Helix client errors
#[derive(Debug, Error)]
pub enum HelixError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("API error {0}: {1}")]
    ApiError(u16, String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

impl From<HelixError> for SourceError {
    fn from(err: HelixError) -> Self {
        match err {
            HelixError::NetworkError(msg) => SourceError::Transport(msg),
            HelixError::Unauthorized(msg) => SourceError::Unauthorized(msg),
            HelixError::ApiError(status, body) => SourceError::Api(status, body),
            HelixError::ParseError(msg) => SourceError::Parse(msg),
        }
    }
}

/// Helix list envelope
#[derive(Debug, Clone, Deserialize)]
pub struct HelixPage<T> {
    pub data: Vec<T>,
}

/// Live stream entry from `GET /streams`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HelixStream {
    pub user_id: String,
    pub user_login: String,
    pub viewer_count: u64,
    #[serde(default)]
    pub started_at: Option<String>,
}

/// User entry from `GET /users`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HelixUser {
    pub id: String,
    pub login: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Video entry from `GET /videos`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HelixVideo {
    pub id: String,
    #[serde(default)]
    pub view_count: u64,
    /// Elapsed-time token such as `"3h8m33s"`
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl From<HelixVideo> for BroadcastRecord {
    fn from(video: HelixVideo) -> Self {
        BroadcastRecord::new(video.view_count, video.duration)
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

/// Cached app access token
struct AppToken {
    access_token: String,
    expires_at: Instant,
}

impl AppToken {
    fn from_response(response: TokenResponse, issued_at: Instant) -> Self {
        Self {
            access_token: response.access_token,
            expires_at: issued_at + Duration::from_secs(response.expires_in),
        }
    }

    fn is_fresh(&self, now: Instant) -> bool {
        now + TOKEN_EXPIRY_MARGIN < self.expires_at
    }
}

/// Rate limiter enforcing a minimum interval between requests
struct RateLimiter {
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    fn new(min_interval_ms: u64) -> Self {
        Self {
            last_request: Mutex::new(None),
            min_interval: Duration::from_millis(min_interval_ms),
        }
    }

    async fn wait(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(last_time) = *last {
            let elapsed = last_time.elapsed();
            if elapsed < self.min_interval {
                let wait_time = self.min_interval - elapsed;
                tracing::debug!("Helix rate limiting: waiting {:?}", wait_time);
                tokio::time::sleep(wait_time).await;
            }
        }

        *last = Some(Instant::now());
    }
}

/// Twitch Helix API client
pub struct HelixClient {
    http_client: reqwest::Client,
    rate_limiter: Arc<RateLimiter>,
    credentials: TwitchCredentials,
    token: Mutex<Option<AppToken>>,
    api_base: String,
    token_url: String,
}

impl HelixClient {
    /// Build the client; no network traffic until the first call
    pub fn new(credentials: TwitchCredentials) -> Result<Self, HelixError> {
        Self::with_endpoints(credentials, HELIX_BASE_URL, TOKEN_URL)
    }

    /// Client against explicit Helix and OAuth endpoints
    pub fn with_endpoints(
        credentials: TwitchCredentials,
        api_base: impl Into<String>,
        token_url: impl Into<String>,
    ) -> Result<Self, HelixError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| HelixError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            rate_limiter: Arc::new(RateLimiter::new(RATE_LIMIT_MS)),
            credentials,
            token: Mutex::new(None),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token_url: token_url.into(),
        })
    }

    /// Current app access token, requesting a new one when needed
    async fn access_token(&self) -> Result<String, HelixError> {
        let mut token = self.token.lock().await;

        if let Some(existing) = token.as_ref() {
            if existing.is_fresh(Instant::now()) {
                return Ok(existing.access_token.clone());
            }
        }

        tracing::debug!("Requesting Twitch app access token");
        let issued_at = Instant::now();
        let response = self
            .http_client
            .post(&self.token_url)
            .form(&[
                ("client_id", self.credentials.client_id.as_str()),
                ("client_secret", self.credentials.client_secret.as_str()),
                ("grant_type", "client_credentials"),
            ])
            .send()
            .await
            .map_err(|e| HelixError::NetworkError(e.to_string()))?;

        let status = response.status();
        if status == 400 || status == 401 || status == 403 {
            let error_text = response.text().await.unwrap_or_default();
            return Err(HelixError::Unauthorized(error_text));
        }
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(HelixError::ApiError(status.as_u16(), error_text));
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| HelixError::ParseError(e.to_string()))?;

        let fresh = AppToken::from_response(body, issued_at);
        let access_token = fresh.access_token.clone();
        *token = Some(fresh);

        tracing::info!("Obtained Twitch app access token");
        Ok(access_token)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, HelixError> {
        let access_token = self.access_token().await?;
        self.rate_limiter.wait().await;

        let url = format!("{}/{}", self.api_base, path);
        tracing::debug!(url = %url, params = query.len(), "Querying Helix API");

        let response = self
            .http_client
            .get(&url)
            .query(query)
            .header("Client-Id", &self.credentials.client_id)
            .bearer_auth(&access_token)
            .send()
            .await
            .map_err(|e| HelixError::NetworkError(e.to_string()))?;

        let status = response.status();

        if status == 401 {
            // Token revoked or expired early; next call fetches a new one
            *self.token.lock().await = None;
            let error_text = response.text().await.unwrap_or_default();
            return Err(HelixError::Unauthorized(error_text));
        }

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(HelixError::ApiError(status.as_u16(), error_text));
        }

        response
            .json()
            .await
            .map_err(|e| HelixError::ParseError(e.to_string()))
    }

    /// Live streams for the given logins, keyed by login
    pub async fn get_streams_by_logins(
        &self,
        logins: &[ChannelId],
    ) -> Result<HashMap<ChannelId, HelixStream>, HelixError> {
        let mut out = HashMap::new();

        for chunk in logins.chunks(MAX_LOGINS_PER_REQUEST) {
            let mut query = login_query("user_login", chunk);
            query.push(("first", MAX_LOGINS_PER_REQUEST.to_string()));

            let page: HelixPage<HelixStream> = self.get_json("streams", &query).await?;
            for stream in page.data {
                if let Ok(id) = ChannelId::new(&stream.user_login) {
                    out.insert(id, stream);
                }
            }
        }

        Ok(out)
    }

    /// Users for the given logins, keyed by login
    pub async fn get_users_by_logins(
        &self,
        logins: &[ChannelId],
    ) -> Result<HashMap<ChannelId, HelixUser>, HelixError> {
        let mut out = HashMap::new();

        for chunk in logins.chunks(MAX_LOGINS_PER_REQUEST) {
            let query = login_query("login", chunk);
            let page: HelixPage<HelixUser> = self.get_json("users", &query).await?;
            for user in page.data {
                if let Ok(id) = ChannelId::new(&user.login) {
                    out.insert(id, user);
                }
            }
        }

        Ok(out)
    }

    /// Most recent archived broadcasts of a user, newest first
    pub async fn get_vods_by_user_id(
        &self,
        user_id: &str,
        first: usize,
    ) -> Result<Vec<HelixVideo>, HelixError> {
        let first = first.clamp(1, MAX_VOD_COUNT);
        let query = [
            ("user_id", user_id.to_string()),
            ("type", "archive".to_string()),
            ("first", first.to_string()),
        ];

        let page: HelixPage<HelixVideo> = self.get_json("videos", &query).await?;
        let mut videos = page.data;
        videos.truncate(first);

        tracing::info!(user_id = %user_id, count = videos.len(), "Retrieved VODs from Helix");
        Ok(videos)
    }
}

fn login_query(key: &'static str, logins: &[ChannelId]) -> Vec<(&'static str, String)> {
    logins.iter().map(|id| (key, id.as_str().to_string())).collect()
}

#[async_trait]
impl StreamPlatform for HelixClient {
    async fn probe_live(
        &self,
        channels: &[ChannelId],
    ) -> Result<HashMap<ChannelId, LiveStream>, SourceError> {
        let streams = self.get_streams_by_logins(channels).await?;
        Ok(streams
            .into_iter()
            .map(|(id, stream)| {
                (
                    id,
                    LiveStream {
                        viewer_count: stream.viewer_count,
                    },
                )
            })
            .collect())
    }

    async fn resolve_user_ids(
        &self,
        channels: &[ChannelId],
    ) -> Result<HashMap<ChannelId, String>, SourceError> {
        let users = self.get_users_by_logins(channels).await?;
        Ok(users.into_iter().map(|(id, user)| (id, user.id)).collect())
    }

    async fn fetch_recent_broadcasts(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<BroadcastRecord>, SourceError> {
        let videos = self.get_vods_by_user_id(user_id, limit).await?;
        Ok(videos.into_iter().map(BroadcastRecord::from).collect())
    }
}
