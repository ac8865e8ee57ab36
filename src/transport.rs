//! Transport seam between the adapter and the network.

use crate::error::Error;
use crate::protocol::CHAT_ENDPOINT;
use bytes::Bytes;
use futures::future::BoxFuture;
use futures::stream::BoxStream;
use futures::{FutureExt, StreamExt, TryStreamExt};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE, RETRY_AFTER};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use std::time::Duration;

/// Raw response body of a streaming request.
///
/// Dropping the stream releases the underlying connection.
pub type ByteStream = BoxStream<'static, Result<Bytes, Error>>;

/// Sends chat-completion requests.
///
/// Each call owns its own request/response pair, so one transport can serve
/// concurrent calls.
pub trait Transport: Send + Sync {
    /// Send a non-streaming request and return the raw response body.
    fn complete(&self, body: Value) -> BoxFuture<'_, Result<String, Error>>;

    /// Open a streaming request and return its SSE byte stream.
    fn open_stream(&self, body: Value) -> BoxFuture<'_, Result<ByteStream, Error>>;
}

/// Transport backed by a pooled reqwest client.
pub struct HttpTransport {
    http: reqwest::Client,
    url: String,
    headers: HeaderMap,
}

impl HttpTransport {
    /// Build a transport for `base_url` authenticated with `api_key`.
    pub fn new(base_url: &str, api_key: &SecretString, timeout: Duration) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_nodelay(true)
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(e.to_string()))?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", api_key.expose_secret()))
            .map_err(|_| Error::Config("API key contains invalid header characters".into()))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        Ok(Self {
            http,
            url: format!("{}{}", base_url.trim_end_matches('/'), CHAT_ENDPOINT),
            headers,
        })
    }

    /// Full URL requests are posted to.
    pub fn url(&self) -> &str {
        &self.url
    }

    async fn post(&self, body: &Value) -> Result<reqwest::Response, Error> {
        let resp = self
            .http
            .post(&self.url)
            .headers(self.headers.clone())
            .json(body)
            .send()
            .await?;

        let status = resp.status();
        tracing::debug!(url = %self.url, status = status.as_u16(), "chat completion response");

        if status.is_success() {
            Ok(resp)
        } else {
            Err(error_from_response(resp).await)
        }
    }
}

impl Transport for HttpTransport {
    fn complete(&self, body: Value) -> BoxFuture<'_, Result<String, Error>> {
        async move {
            let resp = self.post(&body).await?;
            Ok(resp.text().await?)
        }
        .boxed()
    }

    fn open_stream(&self, body: Value) -> BoxFuture<'_, Result<ByteStream, Error>> {
        async move {
            let resp = self.post(&body).await?;
            Ok(resp.bytes_stream().map_err(Error::Http).boxed())
        }
        .boxed()
    }
}

/// Convert a non-2xx response to an Error.
async fn error_from_response(resp: reqwest::Response) -> Error {
    let status = resp.status().as_u16();
    let retry_after = parse_retry_after(resp.headers());
    let body = resp.text().await.unwrap_or_default();

    tracing::warn!(status, body = %body, "chat completion request failed");

    match status {
        401 => Error::Unauthorized,
        429 => Error::RateLimited { retry_after },
        500..=599 => Error::Server(status),
        _ => {
            let message = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|v| v["error"]["message"].as_str().map(ToString::to_string))
                .unwrap_or(body);
            Error::api(status, message)
        }
    }
}

/// Parse Retry-After header given in seconds.
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}
