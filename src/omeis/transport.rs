use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;
use url::Url;

use crate::error::OmeisError;

/// Line-oriented request/response channel to an OMEIS instance.
///
/// `params` is a whitespace-separated list of `Key=Value` tokens, exactly as
/// OMEIS expects them in its query string. The response body is returned one
/// entry per line.
#[async_trait]
pub trait OmeisTransport: Send + Sync {
    async fn call(&self, method: &str, params: &str) -> Result<Vec<String>, OmeisError>;

    /// Where calls are sent (for logging).
    fn endpoint(&self) -> &str;
}

/// OMEIS over HTTP GET.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: Url,
}

impl HttpTransport {
    /// Create a transport for the OMEIS CGI at `base_url`.
    ///
    /// Fails if the URL does not parse or the HTTP client cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, OmeisError> {
        let base_url = Url::parse(base_url).map_err(|e| OmeisError::Transport {
            method: "(setup)".to_string(),
            message: format!("invalid OMEIS URL '{}': {}", base_url, e),
        })?;

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| OmeisError::Transport {
                method: "(setup)".to_string(),
                message: e.to_string(),
            })?;

        Ok(Self { client, base_url })
    }

    /// Build the request URL: `?Method=<method>&tok&tok...`.
    pub fn request_url(&self, method: &str, params: &str) -> Url {
        let mut query = format!("Method={}", method);
        for token in params.split_whitespace() {
            query.push('&');
            query.push_str(token);
        }
        let mut url = self.base_url.clone();
        url.set_query(Some(&query));
        url
    }
}

#[async_trait]
impl OmeisTransport for HttpTransport {
    async fn call(&self, method: &str, params: &str) -> Result<Vec<String>, OmeisError> {
        let url = self.request_url(method, params);
        debug!(%url, "Calling OMEIS");

        let transport_error = |message: String| OmeisError::Transport {
            method: method.to_string(),
            message,
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| transport_error(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(transport_error(format!("HTTP {}", status)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| transport_error(e.to_string()))?;

        Ok(body.lines().map(str::to_string).collect())
    }

    fn endpoint(&self) -> &str {
        self.base_url.as_str()
    }
}
