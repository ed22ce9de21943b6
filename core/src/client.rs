//! Stateless request encoding and response classification.
//!
//! # Design
//! This is the I/O-free half of the dispatcher. `build_request` turns an
//! endpoint, a method and optional parameters into an `HttpRequest`;
//! `classify_response` turns the `HttpResponse` that came back into a
//! `Classified` value. Whoever sits in between (the async
//! `RequestDispatcher`, or a host across the FFI boundary) owns the network
//! exchange and the download side effect.

use serde_json::Value;
use tracing::debug;

use crate::error::DispatchError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::types::Params;

pub const CSV_EXPORT_NAME: &str = "export.csv";
pub const JSON_EXPORT_NAME: &str = "export.json";

/// Build the request for one dispatch.
///
/// `GET` carries parameters as an unescaped query string; `POST` and `PATCH`
/// carry them as a JSON body. Other methods, or no parameters, leave the
/// request bare.
pub fn build_request(
    endpoint: &str,
    method: HttpMethod,
    params: Option<&Params>,
) -> Result<HttpRequest, DispatchError> {
    let mut request = HttpRequest {
        method,
        url: endpoint.to_string(),
        headers: Vec::new(),
        body: None,
    };

    let Some(params) = params else {
        return Ok(request);
    };

    match request.method {
        HttpMethod::Get => {
            request.url.push_str(&params.to_query());
        }
        HttpMethod::Post | HttpMethod::Patch => {
            request.body = Some(params.to_json_body()?);
            request
                .headers
                .push(("Content-Type".to_string(), "application/json".to_string()));
        }
        _ => {}
    }

    debug!(method = %request.method, url = %request.url, "built request");
    Ok(request)
}

/// A file the caller should save on the user's behalf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub filename: &'static str,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// What a response means once status and content type are inspected.
#[derive(Debug, Clone, PartialEq)]
pub enum Classified {
    /// 200 with `application/json`.
    Json(Value),
    /// 200 with `text/plain`.
    Text(String),
    /// 200 without a content type.
    Empty,
    /// 200 with `text/csv` or `application/json-download`.
    Download(DownloadRequest),
    /// 400; the body is the backend's error message.
    Rejected(String),
}

/// Classify a response by status, then by content type.
///
/// Content types are matched by substring, download types before plain JSON,
/// since `application/json-download` also contains `application/json`.
pub fn classify_response(response: HttpResponse) -> Result<Classified, DispatchError> {
    if response.status != 200 {
        if response.status == 400 {
            return Ok(Classified::Rejected(response.text()));
        }
        return Err(DispatchError::InvalidStatus(response.status));
    }

    let content_type = match response.header("content-type") {
        Some(ct) if !ct.is_empty() => ct.to_string(),
        _ => return Ok(Classified::Empty),
    };
    debug!(content_type = %content_type, bytes = response.body.len(), "classifying response");

    if content_type.contains("text/csv") {
        return Ok(download(CSV_EXPORT_NAME, content_type, response.body));
    }
    if content_type.contains("application/json-download") {
        return Ok(download(JSON_EXPORT_NAME, content_type, response.body));
    }
    if content_type.contains("application/json") {
        let json = serde_json::from_slice(&response.body).map_err(DispatchError::Decode)?;
        return Ok(Classified::Json(json));
    }
    if content_type.contains("text/plain") {
        return Ok(Classified::Text(response.text()));
    }

    Err(DispatchError::InvalidContentType(content_type))
}

fn download(filename: &'static str, content_type: String, bytes: Vec<u8>) -> Classified {
    Classified::Download(DownloadRequest {
        filename,
        content_type,
        bytes,
    })
}
