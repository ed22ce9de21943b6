//! Single-request HTTP dispatcher.
//!
//! # Overview
//! Sends one HTTP request, encoding parameters by method (unescaped query
//! string for `GET`, JSON body for `POST`/`PATCH`), then classifies the
//! response by status and content type. JSON and text bodies come back as
//! data, CSV and JSON exports are handed to a download sink, and every
//! failure is folded into `Outcome::Failed`.
//!
//! # Design
//! - `client` is the I/O-free half: `build_request` / `classify_response`
//!   over plain `HttpRequest` / `HttpResponse` values (host-does-IO).
//! - `RequestDispatcher` is stateless; the network (`Transport`) and the
//!   save-file side effect (`DownloadSink`) are injected.
//! - Results are a sum type, never a pair of nullable fields.

pub mod client;
pub mod config;
pub mod dispatcher;
pub mod download;
pub mod error;
pub mod http;
pub mod iso8601;
pub mod logging;
pub mod outcome;
pub mod transport;
pub mod types;

pub use client::{build_request, classify_response, Classified, DownloadRequest};
pub use config::DispatchConfig;
pub use dispatcher::RequestDispatcher;
pub use download::{Blob, DirectoryDownloads, DownloadSink, MemoryDownloads, SavedDownload};
pub use error::{render_failure, DispatchError};
pub use crate::http::{HttpMethod, HttpRequest, HttpResponse};
pub use outcome::Outcome;
pub use transport::{Transport, UreqTransport};
pub use types::{Numeric, ParamValue, Params};
