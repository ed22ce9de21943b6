//! Verify `build_request` and `classify_response` against the JSON test
//! vectors stored in `test-vectors/`.
//!
//! Parsed JSON bodies are compared as values where field order does not
//! matter; request bodies are compared as raw strings because parameter
//! order is part of the encoding.

use chrono::{DateTime, Utc};
use dispatch_core::{
    build_request, classify_response, Classified, HttpMethod, HttpResponse, Numeric, ParamValue,
    Params,
};
use serde_json::Value;

/// Decode a `{"type": ..., "value": ...}` parameter from the vectors.
fn param_value(case: &Value) -> ParamValue {
    match case["type"].as_str().unwrap() {
        "undefined" => ParamValue::Undefined,
        "null" => ParamValue::Null,
        "bool" => ParamValue::Bool(case["value"].as_bool().unwrap()),
        "number" => match &case["value"] {
            Value::Number(n) => ParamValue::Number(Numeric::from(n)),
            other => panic!("not a number: {other}"),
        },
        "string" => ParamValue::String(case["value"].as_str().unwrap().to_string()),
        "datetime" => {
            let raw = case["value"].as_str().unwrap();
            let parsed: DateTime<Utc> = DateTime::parse_from_rfc3339(raw).unwrap().with_timezone(&Utc);
            ParamValue::DateTime(parsed)
        }
        other => panic!("unknown param type: {other}"),
    }
}

fn params(case: &Value) -> Option<Params> {
    let entries = case.as_array()?;
    Some(
        entries
            .iter()
            .map(|entry| {
                let pair = entry.as_array().unwrap();
                (pair[0].as_str().unwrap().to_string(), param_value(&pair[1]))
            })
            .collect(),
    )
}

// ---------------------------------------------------------------------------
// Encode
// ---------------------------------------------------------------------------

#[test]
fn encode_test_vectors() {
    let raw = include_str!("../../test-vectors/encode.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let endpoint = case["endpoint"].as_str().unwrap();
        let method = HttpMethod::from(case["method"].as_str().unwrap());
        let params = params(&case["params"]);
        let expected = &case["expected_request"];

        let req = build_request(endpoint, method.clone(), params.as_ref()).unwrap();
        assert_eq!(req.method, method, "{name}: method");
        assert_eq!(req.url, expected["url"].as_str().unwrap(), "{name}: url");

        let expected_headers: Vec<(String, String)> = expected["headers"]
            .as_array()
            .unwrap()
            .iter()
            .map(|h| {
                let arr = h.as_array().unwrap();
                (arr[0].as_str().unwrap().to_string(), arr[1].as_str().unwrap().to_string())
            })
            .collect();
        assert_eq!(req.headers, expected_headers, "{name}: headers");
        assert_eq!(req.body.as_deref(), expected["body"].as_str(), "{name}: body");
    }
}

// ---------------------------------------------------------------------------
// Classify
// ---------------------------------------------------------------------------

#[test]
fn classify_test_vectors() {
    let raw = include_str!("../../test-vectors/classify.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let mut response = HttpResponse::new(case["status"].as_u64().unwrap() as u16)
            .with_body(case["body"].as_str().unwrap());
        if let Some(content_type) = case["content_type"].as_str() {
            response = response.with_header("Content-Type", content_type);
        }

        let expected = &case["expected"];
        let result = classify_response(response);
        match expected["kind"].as_str().unwrap() {
            "error" => {
                let err = result.unwrap_err();
                assert_eq!(err.to_string(), expected["message"].as_str().unwrap(), "{name}: message");
            }
            kind => {
                let classified = result.unwrap_or_else(|e| panic!("{name}: unexpected error {e}"));
                match (kind, classified) {
                    ("json", Classified::Json(json)) => {
                        assert_eq!(json, expected["value"], "{name}: json")
                    }
                    ("text", Classified::Text(text)) => {
                        assert_eq!(text, expected["value"].as_str().unwrap(), "{name}: text")
                    }
                    ("empty", Classified::Empty) => {}
                    ("download", Classified::Download(download)) => {
                        assert_eq!(download.filename, expected["filename"].as_str().unwrap(), "{name}: filename");
                        assert_eq!(download.bytes, case["body"].as_str().unwrap().as_bytes(), "{name}: bytes");
                    }
                    ("rejected", Classified::Rejected(message)) => {
                        assert_eq!(message, expected["value"].as_str().unwrap(), "{name}: message")
                    }
                    (kind, other) => panic!("{name}: expected {kind}, got {other:?}"),
                }
            }
        }
    }
}
