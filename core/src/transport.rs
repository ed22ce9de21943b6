//! Network transports.
//!
//! `Transport` is the one seam between the dispatcher and the network.
//! `UreqTransport` executes requests with a blocking `ureq` agent on the
//! runtime's blocking pool, so the calling task never blocks. There is no
//! timeout and no retry: a hung exchange hangs the dispatch.

use async_trait::async_trait;
use tracing::debug;

use crate::config::DispatchConfig;
use crate::error::DispatchError;
use crate::http::{HttpRequest, HttpResponse};

#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform exactly one HTTP exchange.
    ///
    /// Any status code is a successful exchange; only failures to obtain a
    /// response at all are errors.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, DispatchError>;
}

/// `ureq`-backed transport.
///
/// Status codes are returned as data (`http_status_as_error(false)`) so the
/// dispatcher, not the agent, decides what a 400 or 500 means. Response
/// bodies are read in full with no size limit.
#[derive(Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
    user_agent: Option<String>,
}

impl UreqTransport {
    pub fn new() -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .new_agent();
        Self {
            agent,
            user_agent: None,
        }
    }

    pub fn from_config(config: &DispatchConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            ..Self::new()
        }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for UreqTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, DispatchError> {
        let agent = self.agent.clone();
        let user_agent = self.user_agent.clone();
        let url = request.url.clone();

        tokio::task::spawn_blocking(move || execute(&agent, user_agent.as_deref(), request))
            .await
            .map_err(|err| DispatchError::Network {
                url,
                source: Box::new(err),
            })?
    }
}

fn execute(
    agent: &ureq::Agent,
    user_agent: Option<&str>,
    request: HttpRequest,
) -> Result<HttpResponse, DispatchError> {
    let url = request.url.clone();
    let network = |source: Box<dyn std::error::Error + Send + Sync>| DispatchError::Network {
        url: url.clone(),
        source,
    };

    let mut builder = ::http::Request::builder()
        .method(request.method.as_str())
        .uri(request.url.as_str());
    for (name, value) in &request.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    if let Some(user_agent) = user_agent {
        builder = builder.header(::http::header::USER_AGENT, user_agent);
    }

    debug!(method = %request.method, url = %request.url, "sending request");
    let result = match request.body {
        Some(body) => {
            let req = builder.body(body).map_err(|e| network(Box::new(e)))?;
            agent.run(req)
        }
        None => {
            let req = builder.body(()).map_err(|e| network(Box::new(e)))?;
            agent.run(req)
        }
    };
    let mut response = result.map_err(|e| network(Box::new(e)))?;

    let status = response.status().as_u16();
    let headers = response
        .headers()
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect();
    // ureq caps `read_to_vec` at 10 MiB unless told otherwise.
    let body = response
        .body_mut()
        .with_config()
        .limit(u64::MAX)
        .read_to_vec()
        .map_err(|e| network(Box::new(e)))?;

    debug!(status, bytes = body.len(), "received response");
    Ok(HttpResponse {
        status,
        headers,
        body,
    })
}
