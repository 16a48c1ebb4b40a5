use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{AiError, Result};

pub(crate) fn client(timeout: Duration) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder().timeout(timeout).build()?)
}

/// `GET` that only cares about a success status.
pub(crate) async fn get_ok(http: &reqwest::Client, url: &str, timeout: Duration) -> Result<()> {
    let response = http.get(url).timeout(timeout).send().await?;
    if !response.status().is_success() {
        return Err(AiError::from_response(response).await);
    }
    Ok(())
}

pub(crate) async fn get_json<T: DeserializeOwned>(
    http: &reqwest::Client,
    url: &str,
    timeout: Duration,
) -> Result<T> {
    let response = http.get(url).timeout(timeout).send().await?;
    if !response.status().is_success() {
        return Err(AiError::from_response(response).await);
    }
    Ok(response.json().await?)
}

pub(crate) async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
    http: &reqwest::Client,
    url: &str,
    body: &B,
) -> Result<T> {
    let response = http.post(url).json(body).send().await?;
    if !response.status().is_success() {
        return Err(AiError::from_response(response).await);
    }
    Ok(response.json().await?)
}
