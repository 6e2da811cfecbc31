//! Connection-limited HTTP transport.

use crate::RequestConfig;
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue, REFERER, USER_AGENT};
use reqwest::{Method, Proxy, RequestBuilder, Response};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::instrument;
use url::Url;

/// Turns whatever an extractor scraped out of an attribute into a usable URL.
///
/// Protocol-relative URLs (`//cdn.example.org/x.jpg`) get `https:`, the path
/// is percent-encoded by the parser, and anything that isn't HTTP(S) is
/// rejected.
pub fn sanitize_url(raw: impl AsRef<str>) -> Result<Url> {
    let raw = raw.as_ref().trim();
    let owned;
    let raw = if raw.starts_with("//") {
        owned = format!("https:{raw}");
        owned.as_str()
    } else {
        raw
    };
    let url = Url::parse(raw).or_raise(|| ErrorKind::InvalidUrl(raw.to_string()))?;
    match url.scheme() {
        "http" | "https" if url.host_str().is_some() => Ok(url),
        _ => exn::bail!(ErrorKind::InvalidUrl(raw.to_string())),
    }
}

/// Shared HTTP transport.
///
/// Cheap to clone; clones share the same connection pool and the same cap on
/// outstanding requests. A permit is held from sending the request until the
/// body has been read in full, so the cap really is the number of sockets in
/// use, no matter how many concurrent tasks are queued behind it.
#[derive(Debug, Clone)]
pub struct Transport {
    client: reqwest::Client,
    limiter: Arc<Semaphore>,
    config: Arc<RequestConfig>,
}
impl Transport {
    pub fn new(config: RequestConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent).or_raise(|| ErrorKind::InvalidConfig("user_agent"))?,
        );
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_str(&config.accept_language).or_raise(|| ErrorKind::InvalidConfig("accept_language"))?,
        );
        let mut builder = reqwest::Client::builder()
            .default_headers(headers)
            .use_rustls_tls()
            .cookie_store(true)
            .connect_timeout(config.connect_timeout())
            .pool_idle_timeout(Duration::from_secs(30));
        if let Some(proxy) = config.proxy.as_deref().filter(|p| !p.is_empty()) {
            builder = builder.proxy(Proxy::all(proxy).or_raise(|| ErrorKind::InvalidConfig("proxy"))?);
        }
        let client = builder.build().or_raise(|| ErrorKind::InvalidConfig("client"))?;
        let limiter = Arc::new(Semaphore::new(config.max_connections.max(1)));
        Ok(Self { client, limiter, config: Arc::new(config) })
    }

    pub fn config(&self) -> &RequestConfig {
        &self.config
    }

    async fn permit(&self) -> Result<OwnedSemaphorePermit> {
        // The semaphore is never closed, but the API insists.
        self.limiter.clone().acquire_owned().await.or_raise(|| ErrorKind::Network("transport shut down".to_string()))
    }

    async fn send(request: RequestBuilder, url: &Url) -> Result<Response> {
        request.send().await.or_raise(|| ErrorKind::Network(url.to_string()))
    }

    fn check_status(response: &Response, url: &Url) -> Result<()> {
        let status = response.status();
        if !status.is_success() {
            exn::bail!(ErrorKind::Status { status: status.as_u16(), url: url.to_string() });
        }
        Ok(())
    }

    /// GET an HTML page as text, with the page itself as referer.
    #[instrument(level = "debug", skip_all, fields(url = %url))]
    pub async fn get_text(&self, url: &Url) -> Result<String> {
        let _permit = self.permit().await?;
        let request = self
            .client
            .get(url.clone())
            .header(ACCEPT, self.config.page_accept.as_str())
            .header(REFERER, url.as_str())
            .timeout(self.config.page_timeout());
        let response = Self::send(request, url).await?;
        Self::check_status(&response, url)?;
        response.text().await.or_raise(|| ErrorKind::Network(url.to_string()))
    }

    /// GET an asset as raw bytes, with an explicit referer (or none at all).
    ///
    /// A success status with an empty body is reported as
    /// [`ErrorKind::EmptyBody`].
    pub async fn get_bytes(&self, url: &Url, referer: Option<&str>) -> Result<Vec<u8>> {
        let _permit = self.permit().await?;
        let mut request = self
            .client
            .get(url.clone())
            .header(ACCEPT, self.config.image_accept.as_str())
            .timeout(self.config.image_timeout());
        if let Some(referer) = referer {
            request = request.header(REFERER, referer);
        }
        let response = Self::send(request, url).await?;
        Self::check_status(&response, url)?;
        let body = response.bytes().await.or_raise(|| ErrorKind::Network(url.to_string()))?;
        if body.is_empty() {
            exn::bail!(ErrorKind::EmptyBody(url.to_string()));
        }
        Ok(body.to_vec())
    }

    async fn probe_with(&self, method: Method, url: &Url) -> Result<Url> {
        let _permit = self.permit().await?;
        let request = self.client.request(method, url.clone()).timeout(self.config.probe_timeout());
        let response = Self::send(request, url).await?;
        Self::check_status(&response, url)?;
        // Redirects have already been followed, this is where we ended up.
        Ok(response.url().clone())
    }

    /// Lightweight liveness check.
    ///
    /// Tries HEAD first and falls back to GET when HEAD errors or is refused
    /// (plenty of servers answer HEAD with 403/405). Returns the final URL
    /// after redirects.
    #[instrument(level = "debug", skip_all, fields(url = %url))]
    pub async fn probe(&self, url: &Url) -> Result<Url> {
        match self.probe_with(Method::HEAD, url).await {
            Ok(live) => Ok(live),
            Err(head) => {
                tracing::trace!(error = %*head, "HEAD probe failed, retrying with GET");
                self.probe_with(Method::GET, url).await.or_raise(|| ErrorKind::Unreachable(url.to_string()))
            },
        }
    }
}
