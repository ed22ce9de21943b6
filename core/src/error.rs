//! Error types for the request dispatcher.
//!
//! # Design
//! Every failure the dispatcher can hit lands in `DispatchError`. None of
//! them escape `RequestDispatcher::dispatch`: they are rendered once by
//! `render_failure` and delivered as `Outcome::Failed`. The two
//! backend-protocol variants carry the exact messages callers match on.

use std::error::Error as StdError;
use std::path::PathBuf;

use thiserror::Error;

/// Boxed error used for transport failures from arbitrary HTTP stacks.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Errors raised while building, sending, or interpreting a request.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The backend answered with a status other than 200 or 400.
    #[error("Invalid status code {0} returned from the backend.")]
    InvalidStatus(u16),

    /// The backend answered 200 with a content type we do not handle.
    #[error("Invalid content type {0} returned from the backend.")]
    InvalidContentType(String),

    /// The request never produced a response (DNS, refused, reset, ...).
    #[error("request to {url} failed")]
    Network {
        url: String,
        #[source]
        source: BoxError,
    },

    /// A 200 `application/json` body did not parse.
    #[error("response body is not valid JSON")]
    Decode(#[source] serde_json::Error),

    /// The parameter mapping could not be serialized as a JSON body.
    #[error("failed to encode request body")]
    Encode(#[source] serde_json::Error),

    /// Parameters handed in from outside Rust were not a flat object.
    #[error("invalid parameters: {0}")]
    InvalidParams(String),

    /// The download sink could not store the blob.
    #[error("failed to save download {filename}")]
    Download {
        filename: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read config file {path}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config")]
    ConfigParse(#[from] toml::de::Error),
}

/// Render an error the way the catch-all reports it: the human-readable
/// message (or `Fatal Error` when there is none), a newline, then the
/// diagnostic trace.
///
/// The trace is the error's debug form followed by one `caused by:` line per
/// source in the chain.
pub fn render_failure(err: &(dyn StdError + 'static)) -> String {
    let message = err.to_string();
    let message = if message.is_empty() {
        "Fatal Error".to_string()
    } else {
        message
    };

    let mut trace = format!("{err:?}");
    let mut source = err.source();
    while let Some(cause) = source {
        trace.push_str("\ncaused by: ");
        trace.push_str(&cause.to_string());
        source = cause.source();
    }

    format!("{message}\n{trace}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("")]
    struct Silent;

    #[test]
    fn invalid_status_message_matches_backend_contract() {
        let err = DispatchError::InvalidStatus(500);
        assert_eq!(err.to_string(), "Invalid status code 500 returned from the backend.");
    }

    #[test]
    fn invalid_content_type_message_matches_backend_contract() {
        let err = DispatchError::InvalidContentType("image/png".to_string());
        assert_eq!(
            err.to_string(),
            "Invalid content type image/png returned from the backend."
        );
    }

    #[test]
    fn render_puts_message_on_first_line() {
        let rendered = render_failure(&DispatchError::InvalidStatus(502));
        let (first, trace) = rendered.split_once('\n').unwrap();
        assert_eq!(first, "Invalid status code 502 returned from the backend.");
        assert!(trace.contains("InvalidStatus(502)"));
    }

    #[test]
    fn render_walks_source_chain() {
        let err = DispatchError::Download {
            filename: "export.csv".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
        };
        let rendered = render_failure(&err);
        assert!(rendered.starts_with("failed to save download export.csv\n"));
        assert!(rendered.ends_with("caused by: read-only"));
    }

    #[test]
    fn render_falls_back_to_fatal_error() {
        let rendered = render_failure(&Silent);
        assert!(rendered.starts_with("Fatal Error\n"));
    }
}
