//! `#[repr(C)]` types for the FFI boundary.
//!
//! # Design
//! Each type mirrors a core type with C-compatible representations:
//! `*mut c_char` instead of `String`, pointer + length instead of `Vec`, and
//! tagged enums with explicit discriminants. Conversion functions live here
//! to keep `lib.rs` focused on the `extern "C"` surface.

use std::ffi::CString;
use std::os::raw::c_char;

use dispatch_core::{Classified, DispatchError, HttpRequest, Outcome};

/// Build a C string, dropping interior NULs rather than failing.
pub(crate) fn c_string(s: impl Into<String>) -> *mut c_char {
    let s: String = s.into();
    CString::new(s.replace('\0', ""))
        .unwrap_or_default()
        .into_raw()
}

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// A single HTTP header as a key-value pair of C strings.
#[repr(C)]
pub struct FfiHeader {
    pub key: *mut c_char,
    pub value: *mut c_char,
}

/// An HTTP request described as C-compatible plain data.
///
/// Built by `dispatch_build_request`. The host executes it and passes the
/// response back through `dispatch_classify_response`. `body` is null when
/// the request has no body.
#[repr(C)]
pub struct FfiHttpRequest {
    pub method: *mut c_char,
    pub url: *mut c_char,
    pub headers: *mut FfiHeader,
    pub headers_len: u32,
    pub body: *mut c_char,
}

impl FfiHttpRequest {
    /// Convert a core `HttpRequest` into a heap-allocated `FfiHttpRequest`.
    pub(crate) fn from_core(req: HttpRequest) -> *mut Self {
        let body = match req.body {
            Some(b) => c_string(b),
            None => std::ptr::null_mut(),
        };

        let headers_len = req.headers.len() as u32;
        let headers = if req.headers.is_empty() {
            std::ptr::null_mut()
        } else {
            let ffi_headers: Box<[FfiHeader]> = req
                .headers
                .into_iter()
                .map(|(k, v)| FfiHeader {
                    key: c_string(k),
                    value: c_string(v),
                })
                .collect();
            Box::into_raw(ffi_headers) as *mut FfiHeader
        };

        Box::into_raw(Box::new(FfiHttpRequest {
            method: c_string(req.method.as_str()),
            url: c_string(req.url),
            headers,
            headers_len,
            body,
        }))
    }
}

// ---------------------------------------------------------------------------
// Response input (caller-provided, not heap-allocated by us)
// ---------------------------------------------------------------------------

/// An HTTP response described as C-compatible plain data.
///
/// The host fills this in after executing a request. `content_type` is null
/// when the response had no `Content-Type` header; `body` may be null when
/// `body_len` is zero. The FFI layer reads but does not free these fields.
#[repr(C)]
pub struct FfiHttpResponse {
    pub status: u16,
    pub content_type: *const c_char,
    pub body: *const u8,
    pub body_len: usize,
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// Which fields of `FfiOutcome` are populated.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiOutcomeKind {
    /// `data` holds the JSON document as text.
    Json = 0,
    /// `data` holds the body text.
    Text = 1,
    /// Nothing is populated.
    Empty = 2,
    /// The host should save `download` (`download_len` bytes) as
    /// `download_filename`.
    Download = 3,
    /// `error_message` holds the rendered failure.
    Failed = 4,
}

/// Result envelope for `dispatch_classify_response`.
///
/// Unused pointer fields are null. Free with `dispatch_free_outcome`.
#[repr(C)]
pub struct FfiOutcome {
    pub kind: FfiOutcomeKind,
    pub data: *mut c_char,
    pub error_message: *mut c_char,
    pub download_filename: *mut c_char,
    pub download: *mut u8,
    pub download_len: usize,
}

impl FfiOutcome {
    fn empty(kind: FfiOutcomeKind) -> Self {
        FfiOutcome {
            kind,
            data: std::ptr::null_mut(),
            error_message: std::ptr::null_mut(),
            download_filename: std::ptr::null_mut(),
            download: std::ptr::null_mut(),
            download_len: 0,
        }
    }

    pub(crate) fn from_classified(classified: Classified) -> *mut Self {
        let outcome = match classified {
            Classified::Download(download) => {
                let len = download.bytes.len();
                let bytes = if len == 0 {
                    std::ptr::null_mut()
                } else {
                    Box::into_raw(download.bytes.into_boxed_slice()) as *mut u8
                };
                FfiOutcome {
                    download_filename: c_string(download.filename),
                    download: bytes,
                    download_len: len,
                    ..Self::empty(FfiOutcomeKind::Download)
                }
            }
            other => return Self::from_outcome(other.into()),
        };
        Box::into_raw(Box::new(outcome))
    }

    pub(crate) fn from_outcome(outcome: Outcome) -> *mut Self {
        let outcome = match outcome {
            Outcome::Json(json) => FfiOutcome {
                data: c_string(json.to_string()),
                ..Self::empty(FfiOutcomeKind::Json)
            },
            Outcome::Text(text) => FfiOutcome {
                data: c_string(text),
                ..Self::empty(FfiOutcomeKind::Text)
            },
            Outcome::Empty => Self::empty(FfiOutcomeKind::Empty),
            Outcome::Downloaded { filename } => FfiOutcome {
                download_filename: c_string(filename),
                ..Self::empty(FfiOutcomeKind::Download)
            },
            Outcome::Failed(message) => FfiOutcome {
                error_message: c_string(message),
                ..Self::empty(FfiOutcomeKind::Failed)
            },
        };
        Box::into_raw(Box::new(outcome))
    }

    pub(crate) fn from_error(err: DispatchError) -> *mut Self {
        Self::from_outcome(Outcome::from_error(&err))
    }

    /// Failure for a null argument.
    pub(crate) fn null_arg(name: &str) -> *mut Self {
        Self::from_outcome(Outcome::Failed(format!("null argument: {name}")))
    }

    /// Failure for a caught panic.
    pub(crate) fn panic(msg: &str) -> *mut Self {
        Self::from_outcome(Outcome::Failed(msg.to_string()))
    }
}
