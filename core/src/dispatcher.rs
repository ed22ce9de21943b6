//! The async request dispatcher.
//!
//! # Design
//! `RequestDispatcher` composes the pure `client` functions with an injected
//! `Transport` and `DownloadSink`. It holds no mutable state, so concurrent
//! dispatches through one instance are independent. Every error raised on
//! the way is caught once in `dispatch` and rendered into
//! `Outcome::Failed`; nothing propagates to the caller.

use serde_json::Value;
use tracing::{info, warn};

use crate::client::{build_request, classify_response, Classified};
use crate::config::DispatchConfig;
use crate::download::{Blob, DirectoryDownloads, DownloadSink};
use crate::error::DispatchError;
use crate::http::HttpMethod;
use crate::outcome::Outcome;
use crate::transport::{Transport, UreqTransport};
use crate::types::Params;

pub struct RequestDispatcher<T, D> {
    transport: T,
    downloads: D,
}

impl RequestDispatcher<UreqTransport, DirectoryDownloads> {
    /// Dispatcher over `ureq` that saves downloads into the configured
    /// directory.
    pub fn from_config(config: &DispatchConfig) -> Self {
        Self::new(
            UreqTransport::from_config(config),
            DirectoryDownloads::from_config(config),
        )
    }
}

impl<T: Transport, D: DownloadSink> RequestDispatcher<T, D> {
    pub fn new(transport: T, downloads: D) -> Self {
        Self {
            transport,
            downloads,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn downloads(&self) -> &D {
        &self.downloads
    }

    /// Perform one request and report how it ended.
    pub async fn dispatch(
        &self,
        endpoint: &str,
        method: impl Into<HttpMethod>,
        params: Option<&Params>,
    ) -> Outcome {
        let method = method.into();
        match self.try_dispatch(endpoint, method.clone(), params).await {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(%method, endpoint, error = %err, "dispatch failed");
                Outcome::from_error(&err)
            }
        }
    }

    /// Callback form of `dispatch`.
    ///
    /// `on_result` receives `(data, error)` with at most one side set. It is
    /// not called when the response was turned into a download.
    pub async fn dispatch_with<F>(
        &self,
        endpoint: &str,
        method: impl Into<HttpMethod>,
        params: Option<&Params>,
        on_result: F,
    ) where
        F: FnOnce(Option<Value>, Option<String>),
    {
        let outcome = self.dispatch(endpoint, method, params).await;
        if matches!(outcome, Outcome::Downloaded { .. }) {
            return;
        }
        let (data, error) = outcome.into_parts();
        on_result(data, error);
    }

    async fn try_dispatch(
        &self,
        endpoint: &str,
        method: HttpMethod,
        params: Option<&Params>,
    ) -> Result<Outcome, DispatchError> {
        let request = build_request(endpoint, method, params)?;
        let response = self.transport.send(request).await?;

        match classify_response(response)? {
            Classified::Download(download) => {
                let blob = Blob {
                    content_type: download.content_type,
                    bytes: download.bytes,
                };
                self.downloads
                    .create_download(blob, download.filename)
                    .await?;
                info!(filename = download.filename, "response delivered as download");
                Ok(Outcome::Downloaded {
                    filename: download.filename.to_string(),
                })
            }
            other => Ok(other.into()),
        }
    }
}
