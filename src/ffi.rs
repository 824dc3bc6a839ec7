//! FFI interface for C/C++ interop
//!
//! Exposes block extraction and full classification passes over a markup
//! buffer. Requests and results are passed as JSON for simplicity and type
//! safety; classification is delegated to a caller-supplied callback.

use std::ffi::{c_char, c_void, CStr, CString};
use std::ptr;

use serde::Serialize;

use crate::aggregator::LabelAggregator;
use crate::classifier::{Classifier, ScoredLabel};
use crate::config::{LabelSet, PassConfig};
use crate::error::{Error, Result};
use crate::extractors::{extract_groups, MarkupQuery, TextGroup};

/// Result struct returned to C/C++
/// Both pointers are owned by Rust and must be freed via free_ffi_result
#[repr(C)]
pub struct FfiResult {
    /// JSON-serialized result (null-terminated)
    pub json_ptr: *mut c_char,
    /// Error message if the call failed (null-terminated), or null on success
    pub error_ptr: *mut c_char,
}

/// Classification callback.
///
/// Receives the representative text and the JSON array of candidate labels,
/// both null-terminated, plus the caller's `user_data`. Must return a
/// null-terminated JSON array of `{"label": ..., "score": ...}` objects, or
/// null on failure. The returned buffer stays owned by the caller and only
/// has to remain valid until the callback is invoked again or the enclosing
/// call returns.
pub type ClassifyCallback = unsafe extern "C" fn(
    text: *const c_char,
    labels_json: *const c_char,
    user_data: *mut c_void,
) -> *const c_char;

struct CallbackClassifier {
    callback: ClassifyCallback,
    user_data: *mut c_void,
}

impl Classifier for CallbackClassifier {
    fn classify(&self, text: &str, labels: &LabelSet) -> Result<Vec<ScoredLabel>> {
        let text = CString::new(text)
            .map_err(|_| Error::Classifier("text contains null bytes".to_string()))?;
        let labels_json = CString::new(serde_json::to_string(labels)?)
            .map_err(|_| Error::Classifier("labels contain null bytes".to_string()))?;

        // SAFETY: both strings outlive the call; the caller guarantees the
        // callback contract documented on `ClassifyCallback`.
        let reply = unsafe { (self.callback)(text.as_ptr(), labels_json.as_ptr(), self.user_data) };
        if reply.is_null() {
            return Err(Error::Classifier("classification callback failed".to_string()));
        }

        // SAFETY: non-null and null-terminated per the callback contract.
        let reply = unsafe { CStr::from_ptr(reply) }
            .to_str()
            .map_err(|_| Error::Classifier("invalid UTF-8 from callback".to_string()))?;

        serde_json::from_str(reply)
            .map_err(|e| Error::Classifier(format!("invalid callback reply: {}", e)))
    }
}

/// Accepted content blocks on a page, without classification.
///
/// # Arguments
/// * `html_ptr` - Pointer to HTML content (UTF-8, not necessarily null-terminated)
/// * `html_len` - Length of HTML content in bytes
/// * `request_json` - JSON-serialized PassConfig (null-terminated)
///
/// # Returns
/// FfiResult whose JSON is an array of `{"key": ..., "fragments": [...]}`
///
/// # Safety
/// - `html_ptr` must point to valid memory of at least `html_len` bytes
/// - `request_json` must be a valid null-terminated C string
/// - Caller must free the result via `free_ffi_result`
#[no_mangle]
pub unsafe extern "C" fn extract_blocks_ffi(
    html_ptr: *const c_char,
    html_len: usize,
    request_json: *const c_char,
) -> FfiResult {
    let (html, config) = match read_inputs(html_ptr, html_len, request_json) {
        Ok(inputs) => inputs,
        Err(msg) => return make_error_result(&msg),
    };

    let query = MarkupQuery::parse(&html);
    match extract_groups(&query, &config) {
        Ok(groups) => make_json_result::<Vec<TextGroup>>(&groups),
        Err(e) => make_error_result(&e.to_string()),
    }
}

/// Run a full classification pass and return the result table.
///
/// # Returns
/// FfiResult whose JSON is `{"columns": [{"name": ..., "values": [...]}]}`.
/// Any failure, including a failed callback, yields an error and no table.
///
/// # Safety
/// Same as extract_blocks_ffi; additionally `callback` must honour the
/// `ClassifyCallback` contract for the whole call.
#[no_mangle]
pub unsafe extern "C" fn build_table_ffi(
    html_ptr: *const c_char,
    html_len: usize,
    request_json: *const c_char,
    callback: Option<ClassifyCallback>,
    user_data: *mut c_void,
) -> FfiResult {
    let callback = match callback {
        Some(cb) => cb,
        None => return make_error_result("Classification callback is null"),
    };

    let (html, config) = match read_inputs(html_ptr, html_len, request_json) {
        Ok(inputs) => inputs,
        Err(msg) => return make_error_result(&msg),
    };

    let classifier = CallbackClassifier {
        callback,
        user_data,
    };

    let result = LabelAggregator::from_config(&config).and_then(|mut aggregator| {
        let groups = extract_groups(&MarkupQuery::parse(&html), &config)?;
        aggregator.run(groups, &classifier)
    });

    match result {
        Ok(table) => make_json_result(&table),
        Err(e) => make_error_result(&e.to_string()),
    }
}

/// Free an FfiResult returned by this module
///
/// # Safety
/// - `result` must have been returned by a function of this module
/// - Must only be called once per result
#[no_mangle]
pub unsafe extern "C" fn free_ffi_result(result: FfiResult) {
    if !result.json_ptr.is_null() {
        drop(CString::from_raw(result.json_ptr));
    }
    if !result.error_ptr.is_null() {
        drop(CString::from_raw(result.error_ptr));
    }
}

unsafe fn read_inputs(
    html_ptr: *const c_char,
    html_len: usize,
    request_json: *const c_char,
) -> std::result::Result<(String, PassConfig), String> {
    let html = if html_ptr.is_null() || html_len == 0 {
        String::new()
    } else {
        let slice = std::slice::from_raw_parts(html_ptr as *const u8, html_len);
        match std::str::from_utf8(slice) {
            Ok(s) => s.to_string(),
            Err(_) => return Err("Invalid UTF-8 in HTML content".to_string()),
        }
    };

    if request_json.is_null() {
        return Err("Request JSON is null".to_string());
    }
    let request_str = match CStr::from_ptr(request_json).to_str() {
        Ok(s) => s,
        Err(_) => return Err("Invalid UTF-8 in request JSON".to_string()),
    };

    let config: PassConfig = serde_json::from_str(request_str)
        .map_err(|e| format!("Failed to parse request JSON: {}", e))?;

    Ok((html, config))
}

fn make_json_result<T: Serialize + ?Sized>(value: &T) -> FfiResult {
    match serde_json::to_string(value) {
        Ok(json) => match CString::new(json) {
            Ok(cstr) => FfiResult {
                json_ptr: cstr.into_raw(),
                error_ptr: ptr::null_mut(),
            },
            Err(_) => make_error_result("Result JSON contains null bytes"),
        },
        Err(e) => make_error_result(&format!("Failed to serialize result: {}", e)),
    }
}

// Helper to create error result
fn make_error_result(msg: &str) -> FfiResult {
    let error_cstr = CString::new(msg.replace('\0', " ")).unwrap_or_default();
    FfiResult {
        json_ptr: ptr::null_mut(),
        error_ptr: error_cstr.into_raw(),
    }
}
