//! Shared HTTP plumbing for the adapters

use crate::error::ProviderError;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Upper bound for every outbound call
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub fn build_client(timeout: Duration) -> Result<Client, ProviderError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ProviderError::Unknown(format!("Failed to create HTTP client: {}", e)))
}

/// `{base}{path}` without doubled slashes
pub fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), path)
}

/// Send and turn non-2xx statuses into classified errors
pub async fn send(request: RequestBuilder, timeout: Duration) -> Result<Response, ProviderError> {
    let response = request
        .send()
        .await
        .map_err(|e| ProviderError::from_reqwest(e, timeout))?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(ProviderError::from_http_status(status.as_u16(), &body));
    }

    Ok(response)
}

/// Send, check status and decode the JSON body
pub async fn send_json<T: DeserializeOwned>(
    request: RequestBuilder,
    timeout: Duration,
) -> Result<T, ProviderError> {
    let response = send(request, timeout).await?;
    response.json::<T>().await.map_err(|e| {
        let e = e.without_url();
        if e.is_timeout() {
            ProviderError::Timeout(timeout)
        } else {
            ProviderError::InvalidResponse(e.to_string())
        }
    })
}
