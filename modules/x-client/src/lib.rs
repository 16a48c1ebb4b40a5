pub mod error;
pub mod types;

pub use error::{Result, XError};
pub use types::{
    ListInfo, MembershipList, MembershipPage, PostPage, RawCard, RawMedia, RawTweet,
    RawUrlEntity, RawUser,
};

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, COOKIE};
use serde::de::DeserializeOwned;

const BASE_URL: &str = "https://api.x.com/1.1";

/// Per-request ceiling. A page that takes longer is a transient failure.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Browser session credential imported from a logged-in session.
#[derive(Debug, Clone)]
pub struct XSession {
    pub auth_token: String,
    pub csrf_token: String,
    /// App bearer token, when the gateway requires one in addition to cookies.
    pub bearer_token: Option<String>,
}

pub struct XClient {
    client: reqwest::Client,
    session: XSession,
    base_url: String,
}

impl XClient {
    pub fn new(session: XSession) -> Result<Self> {
        if session.auth_token.trim().is_empty() || session.csrf_token.trim().is_empty() {
            return Err(XError::InvalidSession(
                "auth_token and csrf_token are both required".to_string(),
            ));
        }
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            session,
            base_url: BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    fn headers(&self) -> Result<HeaderMap> {
        let invalid =
            |e: reqwest::header::InvalidHeaderValue| XError::InvalidSession(e.to_string());

        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_str(&format!(
                "auth_token={}; ct0={}",
                self.session.auth_token, self.session.csrf_token
            ))
            .map_err(invalid)?,
        );
        headers.insert(
            "x-csrf-token",
            HeaderValue::from_str(&self.session.csrf_token).map_err(invalid)?,
        );
        if let Some(ref bearer) = self.session.bearer_token {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {bearer}")).map_err(invalid)?,
            );
        }
        Ok(headers)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let resp = self
            .client
            .get(&url)
            .headers(self.headers()?)
            .query(query)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(XError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = resp.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// One page of a list timeline, newest first.
    pub async fn list_tweets(
        &self,
        list_id: &str,
        count: u32,
        cursor: Option<&str>,
    ) -> Result<PostPage> {
        let mut query = vec![("count", count.to_string())];
        if let Some(cursor) = cursor {
            query.push(("cursor", cursor.to_string()));
        }
        let page: PostPage = self
            .get(&format!("lists/{list_id}/tweets"), &query)
            .await?;
        tracing::debug!(
            list_id,
            count = page.tweets.len(),
            has_next = page.next_cursor.is_some(),
            "Fetched list page"
        );
        Ok(page)
    }

    pub async fn list_info(&self, list_id: &str) -> Result<ListInfo> {
        self.get(&format!("lists/{list_id}"), &[]).await
    }

    pub async fn user_by_screen_name(&self, handle: &str) -> Result<RawUser> {
        self.get(&format!("users/by/screen_name/{handle}"), &[]).await
    }

    /// Lists a user has been added to. The cursor starts at `-1`.
    pub async fn memberships(
        &self,
        user_id: &str,
        count: u32,
        cursor: Option<&str>,
    ) -> Result<MembershipPage> {
        let mut query = vec![("count", count.to_string())];
        if let Some(cursor) = cursor.filter(|c| *c != "-1") {
            query.push(("cursor", cursor.to_string()));
        }
        self.get(&format!("users/{user_id}/memberships"), &query)
            .await
    }

    /// The account that owns the session.
    pub async fn verify_credentials(&self) -> Result<RawUser> {
        self.get("account/verify_credentials", &[]).await
    }
}
