//! Transport abstraction for SMP requests.
//!
//! The client only ever issues plain GETs. Implementations map the HTTP
//! outcome onto [`SmpClientError`] so every transport reports failures the
//! same way.

use std::sync::Arc;

use url::Url;

use crate::config::HttpConfig;
use crate::error::{Result, SmpClientError};

/// Fetches SMP documents.
///
/// Implementations must be thread-safe (Send + Sync).
pub trait SmpTransport: Send + Sync {
    /// GET `url` and return the response body on a 2xx status.
    fn get(&self, url: &Url) -> Result<Vec<u8>>;
}

impl<T: SmpTransport + ?Sized> SmpTransport for Arc<T> {
    fn get(&self, url: &Url) -> Result<Vec<u8>> {
        (**self).get(url)
    }
}

/// Map a non-success HTTP status to an error.
pub fn status_error(url: &Url, status: u16) -> SmpClientError {
    let url = url.to_string();
    match status {
        400 => SmpClientError::BadRequest { url },
        403 => SmpClientError::Unauthorized { url },
        404 => SmpClientError::NotFound { url, cause: None },
        status => SmpClientError::Http { url, status },
    }
}

/// Blocking HTTP transport over `reqwest`.
///
/// No cookie store is kept, so no authentication state crosses requests.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    /// Build a transport with the given timeouts, proxy and user agent.
    ///
    /// Must not be called from within an async runtime.
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let mut builder = reqwest::blocking::Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.socket_timeout())
            .user_agent(config.user_agent.clone());

        if let Some(proxy) = &config.proxy {
            let proxy = reqwest::Proxy::all(proxy.as_str()).map_err(|e| SmpClientError::Transport {
                url: proxy.clone(),
                message: format!("invalid proxy: {}", e),
            })?;
            builder = builder.proxy(proxy);
        }

        let client = builder.build().map_err(|e| SmpClientError::Transport {
            url: String::new(),
            message: format!("cannot build HTTP client: {}", e),
        })?;
        Ok(Self { client })
    }
}

impl SmpTransport for HttpTransport {
    fn get(&self, url: &Url) -> Result<Vec<u8>> {
        tracing::debug!(%url, "GET");

        let response = self
            .client
            .get(url.clone())
            .send()
            .map_err(|e| request_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!(%url, status = status.as_u16(), "SMP request failed");
            return Err(status_error(url, status.as_u16()));
        }

        let body = response.bytes().map_err(|e| request_error(url, e))?;
        Ok(body.to_vec())
    }
}

fn request_error(url: &Url, error: reqwest::Error) -> SmpClientError {
    if error.is_connect() {
        SmpClientError::NotFound {
            url: url.to_string(),
            cause: Some(error.to_string()),
        }
    } else {
        SmpClientError::Transport {
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}

/// An in-memory transport for testing.
///
/// Serves canned responses by exact URL and records every request.
pub mod memory {
    use super::*;
    use std::collections::HashMap;

    use parking_lot::{Mutex, RwLock};

    /// A canned response.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum MemoryResponse {
        /// 200 with this body.
        Body(Vec<u8>),
        /// A non-success status.
        Status(u16),
        /// The host cannot be reached.
        Unreachable(String),
        /// The request timed out.
        Timeout,
    }

    /// In-memory transport implementation.
    #[derive(Debug, Default)]
    pub struct MemoryTransport {
        responses: RwLock<HashMap<String, MemoryResponse>>,
        requests: Mutex<Vec<String>>,
    }

    impl MemoryTransport {
        /// Create an empty transport. Unknown URLs answer 404.
        pub fn new() -> Self {
            Self::default()
        }

        /// Serve `body` at `url`.
        pub fn insert(&self, url: &str, body: impl Into<Vec<u8>>) {
            self.respond(url, MemoryResponse::Body(body.into()));
        }

        /// Answer `url` with `response`.
        pub fn respond(&self, url: &str, response: MemoryResponse) {
            self.responses.write().insert(url.to_string(), response);
        }

        /// Every requested URL, in order.
        pub fn requests(&self) -> Vec<String> {
            self.requests.lock().clone()
        }

        /// Number of requests served.
        pub fn request_count(&self) -> usize {
            self.requests.lock().len()
        }
    }

    impl SmpTransport for MemoryTransport {
        fn get(&self, url: &Url) -> Result<Vec<u8>> {
            self.requests.lock().push(url.to_string());

            let response = self.responses.read().get(url.as_str()).cloned();
            match response {
                Some(MemoryResponse::Body(body)) => Ok(body),
                Some(MemoryResponse::Status(status)) => Err(status_error(url, status)),
                Some(MemoryResponse::Unreachable(cause)) => Err(SmpClientError::NotFound {
                    url: url.to_string(),
                    cause: Some(cause),
                }),
                Some(MemoryResponse::Timeout) => Err(SmpClientError::Transport {
                    url: url.to_string(),
                    message: "operation timed out".to_string(),
                }),
                None => Err(status_error(url, 404)),
            }
        }
    }
}
