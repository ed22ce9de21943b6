//! The single result shape every dispatch ends in.

use serde_json::Value;

use crate::client::Classified;
use crate::error::render_failure;

/// Result of one dispatch. Exactly one of "data" or "error" is meaningful
/// per variant; `Empty` and `Downloaded` carry neither.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Json(Value),
    Text(String),
    Empty,
    /// The body was handed to the download sink under this name.
    Downloaded { filename: String },
    /// Rejected by the backend (400) or failed anywhere along the way.
    Failed(String),
}

impl Outcome {
    /// Render any error through the catch-all format.
    pub fn from_error(err: &(dyn std::error::Error + 'static)) -> Self {
        Outcome::Failed(render_failure(err))
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failed(_))
    }

    pub fn data(&self) -> Option<Value> {
        match self {
            Outcome::Json(json) => Some(json.clone()),
            Outcome::Text(text) => Some(Value::String(text.clone())),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Outcome::Failed(message) => Some(message),
            _ => None,
        }
    }

    /// Split into the `(data, error)` pair of a two-argument continuation.
    pub fn into_parts(self) -> (Option<Value>, Option<String>) {
        match self {
            Outcome::Json(json) => (Some(json), None),
            Outcome::Text(text) => (Some(Value::String(text)), None),
            Outcome::Empty | Outcome::Downloaded { .. } => (None, None),
            Outcome::Failed(message) => (None, Some(message)),
        }
    }
}

impl From<Classified> for Outcome {
    /// Downloads map to `Downloaded` without having been saved; the
    /// dispatcher saves them before building its own outcome.
    fn from(classified: Classified) -> Self {
        match classified {
            Classified::Json(json) => Outcome::Json(json),
            Classified::Text(text) => Outcome::Text(text),
            Classified::Empty => Outcome::Empty,
            Classified::Download(download) => Outcome::Downloaded {
                filename: download.filename.to_string(),
            },
            Classified::Rejected(message) => Outcome::Failed(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DispatchError;

    #[test]
    fn parts_have_at_most_one_side() {
        let cases = [
            Outcome::Json(serde_json::json!({"a": 1})),
            Outcome::Text("t".to_string()),
            Outcome::Empty,
            Outcome::Downloaded { filename: "export.csv".to_string() },
            Outcome::Failed("boom".to_string()),
        ];
        for outcome in cases {
            let (data, error) = outcome.into_parts();
            assert!(data.is_none() || error.is_none());
        }
    }

    #[test]
    fn text_data_is_a_json_string() {
        let outcome = Outcome::Text("hi".to_string());
        assert_eq!(outcome.data(), Some(Value::String("hi".to_string())));
        assert_eq!(outcome.error(), None);
    }

    #[test]
    fn rejected_becomes_failed_verbatim() {
        let outcome = Outcome::from(Classified::Rejected("bad input".to_string()));
        assert_eq!(outcome, Outcome::Failed("bad input".to_string()));
        assert!(outcome.is_failure());
    }

    #[test]
    fn from_error_uses_catch_all_format() {
        let outcome = Outcome::from_error(&DispatchError::InvalidStatus(503));
        let message = outcome.error().unwrap();
        assert!(message.starts_with("Invalid status code 503 returned from the backend.\n"));
    }
}
