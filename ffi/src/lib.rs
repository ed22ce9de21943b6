//! C-ABI wrapper around `dispatch-core`.
//!
//! # Overview
//! Exposes the I/O-free half of the dispatcher through `extern "C"`
//! functions: encode a request, then classify the response the host got
//! back. The host owns the network exchange and the save-file dialog.
//!
//! # Design
//! - Every `extern "C"` function wraps its body in `catch_unwind` so panics
//!   never cross the FFI boundary.
//! - Classification failures, null arguments and panics all come back as an
//!   `FfiOutcome` of kind `Failed`, never as a null pointer.
//! - The C caller owns all returned pointers and must call the matching
//!   `dispatch_free_*` function to release them.

pub mod types;

use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::panic::catch_unwind;

use dispatch_core::{build_request, classify_response, HttpMethod, HttpResponse, Params};

use types::*;

/// Borrow a C string as `&str`, or `None` when null or not UTF-8.
unsafe fn str_arg<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    unsafe { CStr::from_ptr(ptr) }.to_str().ok()
}

// ---------------------------------------------------------------------------
// Build
// ---------------------------------------------------------------------------

/// Build the HTTP request for one dispatch.
///
/// `params_json` is an optional flat JSON object (may be null). Returns null
/// if `endpoint` or `method` is null or not UTF-8, or if `params_json` is
/// not a flat JSON object.
/// The caller must free the returned pointer with `dispatch_free_request`.
#[unsafe(no_mangle)]
pub extern "C" fn dispatch_build_request(
    endpoint: *const c_char,
    method: *const c_char,
    params_json: *const c_char,
) -> *mut FfiHttpRequest {
    catch_unwind(|| {
        let (Some(endpoint), Some(method)) = (unsafe { str_arg(endpoint) }, unsafe { str_arg(method) })
        else {
            return std::ptr::null_mut();
        };

        let params = if params_json.is_null() {
            None
        } else {
            let Some(raw) = (unsafe { str_arg(params_json) }) else {
                return std::ptr::null_mut();
            };
            let parsed = serde_json::from_str(raw)
                .ok()
                .and_then(|value| Params::from_json_object(&value).ok());
            match parsed {
                Some(params) => Some(params),
                None => return std::ptr::null_mut(),
            }
        };

        match build_request(endpoint, HttpMethod::from(method), params.as_ref()) {
            Ok(req) => FfiHttpRequest::from_core(req),
            Err(_) => std::ptr::null_mut(),
        }
    })
    .unwrap_or(std::ptr::null_mut())
}

// ---------------------------------------------------------------------------
// Classify
// ---------------------------------------------------------------------------

/// Convert an `FfiHttpResponse` to a core `HttpResponse`.
fn ffi_response_to_core(resp: &FfiHttpResponse) -> HttpResponse {
    let mut response = HttpResponse::new(resp.status);
    if let Some(content_type) = unsafe { str_arg(resp.content_type) } {
        response = response.with_header("content-type", content_type);
    }
    if !resp.body.is_null() && resp.body_len > 0 {
        let body = unsafe { std::slice::from_raw_parts(resp.body, resp.body_len) };
        response = response.with_body(body.to_vec());
    }
    response
}

/// Classify a response the host received.
///
/// Never returns null. Free the result with `dispatch_free_outcome`.
#[unsafe(no_mangle)]
pub extern "C" fn dispatch_classify_response(response: *const FfiHttpResponse) -> *mut FfiOutcome {
    catch_unwind(|| {
        if response.is_null() {
            return FfiOutcome::null_arg("response");
        }
        let resp = unsafe { &*response };
        match classify_response(ffi_response_to_core(resp)) {
            Ok(classified) => FfiOutcome::from_classified(classified),
            Err(e) => FfiOutcome::from_error(e),
        }
    })
    .unwrap_or_else(|_| FfiOutcome::panic("panic in dispatch_classify_response"))
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Free an `FfiHttpRequest` returned by `dispatch_build_request`.
/// Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn dispatch_free_request(req: *mut FfiHttpRequest) {
    if req.is_null() {
        return;
    }
    let _ = catch_unwind(|| {
        let req = unsafe { Box::from_raw(req) };
        free_c_string(req.method);
        free_c_string(req.url);
        free_c_string(req.body);
        if !req.headers.is_null() && req.headers_len > 0 {
            let headers = unsafe {
                Box::from_raw(std::ptr::slice_from_raw_parts_mut(
                    req.headers,
                    req.headers_len as usize,
                ))
            };
            for h in headers.iter() {
                free_c_string(h.key);
                free_c_string(h.value);
            }
        }
    });
}

/// Free an `FfiOutcome` returned by `dispatch_classify_response`.
/// Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn dispatch_free_outcome(outcome: *mut FfiOutcome) {
    if outcome.is_null() {
        return;
    }
    let _ = catch_unwind(|| {
        let outcome = unsafe { Box::from_raw(outcome) };
        free_c_string(outcome.data);
        free_c_string(outcome.error_message);
        free_c_string(outcome.download_filename);
        if !outcome.download.is_null() && outcome.download_len > 0 {
            drop(unsafe {
                Box::from_raw(std::ptr::slice_from_raw_parts_mut(
                    outcome.download,
                    outcome.download_len,
                ))
            });
        }
    });
}

fn free_c_string(s: *mut c_char) {
    if !s.is_null() {
        drop(unsafe { CString::from_raw(s) });
    }
}

/// Free a C string allocated by this library. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn dispatch_free_string(s: *mut c_char) {
    if !s.is_null() {
        let _ = catch_unwind(|| free_c_string(s));
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    fn c(s: &str) -> CString {
        CString::new(s).unwrap()
    }

    fn read(ptr: *const c_char) -> String {
        unsafe { CStr::from_ptr(ptr) }.to_str().unwrap().to_string()
    }

    fn response(status: u16, content_type: Option<&CString>, body: &[u8]) -> FfiHttpResponse {
        FfiHttpResponse {
            status,
            content_type: content_type.map_or(std::ptr::null(), |ct| ct.as_ptr()),
            body: body.as_ptr(),
            body_len: body.len(),
        }
    }

    #[test]
    fn build_get_encodes_query() {
        let endpoint = c("http://localhost:3000/reports");
        let method = c("GET");
        let params = c(r#"{"from":"2024-01-02","page":2,"tag":"a b"}"#);
        let req = dispatch_build_request(endpoint.as_ptr(), method.as_ptr(), params.as_ptr());
        assert!(!req.is_null());

        let req_ref = unsafe { &*req };
        assert_eq!(read(req_ref.method), "GET");
        assert_eq!(
            read(req_ref.url),
            "http://localhost:3000/reports?from=2024-01-02T00:00:00.000Z&page=2&tag=a b&"
        );
        assert_eq!(req_ref.headers_len, 0);
        assert!(req_ref.headers.is_null());
        assert!(req_ref.body.is_null());
        dispatch_free_request(req);
    }

    #[test]
    fn build_post_has_json_body_and_header() {
        let endpoint = c("/reports");
        let method = c("POST");
        let params = c(r#"{"title":"Q1","amount":3}"#);
        let req = dispatch_build_request(endpoint.as_ptr(), method.as_ptr(), params.as_ptr());
        assert!(!req.is_null());

        let req_ref = unsafe { &*req };
        assert_eq!(req_ref.headers_len, 1);
        let header = unsafe { &*req_ref.headers };
        assert_eq!(read(header.key), "Content-Type");
        assert_eq!(read(header.value), "application/json");
        assert_eq!(read(req_ref.body), r#"{"title":"Q1","amount":3}"#);
        dispatch_free_request(req);
    }

    #[test]
    fn build_without_params_is_bare() {
        let endpoint = c("/reports/1");
        let method = c("DELETE");
        let req = dispatch_build_request(endpoint.as_ptr(), method.as_ptr(), std::ptr::null());
        assert!(!req.is_null());
        let req_ref = unsafe { &*req };
        assert_eq!(read(req_ref.url), "/reports/1");
        assert!(req_ref.body.is_null());
        dispatch_free_request(req);
    }

    #[test]
    fn build_null_or_bad_args_return_null() {
        let endpoint = c("/reports");
        let method = c("GET");
        assert!(dispatch_build_request(std::ptr::null(), method.as_ptr(), std::ptr::null()).is_null());
        assert!(dispatch_build_request(endpoint.as_ptr(), std::ptr::null(), std::ptr::null()).is_null());

        let nested = c(r#"{"a":{"b":1}}"#);
        assert!(dispatch_build_request(endpoint.as_ptr(), method.as_ptr(), nested.as_ptr()).is_null());

        let garbage = c("not json");
        assert!(dispatch_build_request(endpoint.as_ptr(), method.as_ptr(), garbage.as_ptr()).is_null());
    }

    #[test]
    fn classify_json() {
        let ct = c("application/json");
        let resp = response(200, Some(&ct), br#"{"a":1}"#);
        let outcome = dispatch_classify_response(&resp);
        let o = unsafe { &*outcome };
        assert_eq!(o.kind, FfiOutcomeKind::Json);
        assert!(o.error_message.is_null());
        let data: serde_json::Value = serde_json::from_str(&read(o.data)).unwrap();
        assert_eq!(data["a"], 1);
        dispatch_free_outcome(outcome);
    }

    #[test]
    fn classify_empty_without_content_type() {
        let resp = response(200, None, b"");
        let outcome = dispatch_classify_response(&resp);
        let o = unsafe { &*outcome };
        assert_eq!(o.kind, FfiOutcomeKind::Empty);
        assert!(o.data.is_null());
        assert!(o.error_message.is_null());
        dispatch_free_outcome(outcome);
    }

    #[test]
    fn classify_csv_hands_bytes_to_host() {
        let ct = c("text/csv");
        let resp = response(200, Some(&ct), b"id\n1\n");
        let outcome = dispatch_classify_response(&resp);
        let o = unsafe { &*outcome };
        assert_eq!(o.kind, FfiOutcomeKind::Download);
        assert_eq!(read(o.download_filename), "export.csv");
        let bytes = unsafe { std::slice::from_raw_parts(o.download, o.download_len) };
        assert_eq!(bytes, b"id\n1\n");
        assert!(o.data.is_null());
        dispatch_free_outcome(outcome);
    }

    #[test]
    fn classify_bad_request_is_failed_with_body() {
        let ct = c("text/plain");
        let resp = response(400, Some(&ct), b"bad input");
        let outcome = dispatch_classify_response(&resp);
        let o = unsafe { &*outcome };
        assert_eq!(o.kind, FfiOutcomeKind::Failed);
        assert_eq!(read(o.error_message), "bad input");
        dispatch_free_outcome(outcome);
    }

    #[test]
    fn classify_server_error_is_failed() {
        let resp = response(500, None, b"");
        let outcome = dispatch_classify_response(&resp);
        let o = unsafe { &*outcome };
        assert_eq!(o.kind, FfiOutcomeKind::Failed);
        assert!(read(o.error_message).starts_with("Invalid status code 500"));
        dispatch_free_outcome(outcome);
    }

    #[test]
    fn classify_null_response_is_failed() {
        let outcome = dispatch_classify_response(std::ptr::null());
        let o = unsafe { &*outcome };
        assert_eq!(o.kind, FfiOutcomeKind::Failed);
        assert_eq!(read(o.error_message), "null argument: response");
        dispatch_free_outcome(outcome);
    }

    #[test]
    fn free_functions_accept_null() {
        dispatch_free_request(std::ptr::null_mut());
        dispatch_free_outcome(std::ptr::null_mut());
        dispatch_free_string(std::ptr::null_mut());
    }
}
