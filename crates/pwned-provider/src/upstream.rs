use crate::{ProviderError, RangeProvider, Result};
use async_trait::async_trait;
use std::time::Duration;

const PWNED_RANGE_BASE_URL: &str = "https://api.pwnedpasswords.com/range";
const USER_AGENT: &str = concat!("pwned-mirror/", env!("CARGO_PKG_VERSION"));

/// Bounded retry schedule: immediate, immediate, then a 30s backoff, as
/// specified by the upstream contract.
const ATTEMPT_DELAYS: [Duration; 3] = [
    Duration::from_secs(0),
    Duration::from_secs(0),
    Duration::from_secs(30),
];

/// Networked range provider issuing `GET {base}/<PREFIX>` against the
/// Have-I-Been-Pwned range API (or a compatible mirror), with a stable
/// `User-Agent` and the system trust store for TLS verification.
pub struct UpstreamClient {
    http: reqwest::Client,
    base_url: String,
}

impl UpstreamClient {
    pub fn new() -> Result<Self> {
        Self::with_base_url(PWNED_RANGE_BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ProviderError::Unavailable(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    async fn request_range(&self, prefix: &str) -> Result<String> {
        let url = format!("{}/{prefix}", self.base_url);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| ProviderError::Unavailable(e.to_string()))?;
        let response = response
            .error_for_status()
            .map_err(|e| ProviderError::Unavailable(e.to_string()))?;
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::Unavailable(e.to_string()))?;
        Ok(body.replace("\r\n", "\n"))
    }
}

impl Default for UpstreamClient {
    fn default() -> Self {
        Self::new().expect("default reqwest client configuration is always valid")
    }
}

#[async_trait]
impl RangeProvider for UpstreamClient {
    async fn get_range(&self, prefix: &str) -> Result<String> {
        let mut last_error = None;
        for delay in ATTEMPT_DELAYS {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            match self.request_range(prefix).await {
                Ok(body) => return Ok(body),
                Err(e) => {
                    log::warn!("upstream fetch of prefix {prefix} failed: {e}");
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| ProviderError::Unavailable(prefix.to_owned())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_crlf_to_lf() {
        let body = "AAA:1\r\nBBB:2".replace("\r\n", "\n");
        assert_eq!(body, "AAA:1\nBBB:2");
    }

    #[test]
    fn user_agent_is_stable() {
        assert!(USER_AGENT.starts_with("pwned-mirror/"));
    }
}
