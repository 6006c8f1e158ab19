//! Response-body shapes of the RTA API.
//!
//! The API is inconsistent about envelopes: login may answer flat or as
//! `{data: {...}}`, profiles may additionally nest under `{user: {...}}`,
//! and errors carry `detail` as either a string or a list of field errors.

use serde_json::{Map, Value};

/// Tokens shorter than this are rejected as implausible by default.
pub const MIN_TOKEN_LEN: usize = 10;

/// Unwrap a `{data: ...}` envelope when present and non-null.
fn unwrap_data(body: &Value) -> &Value {
    match body.get("data") {
        Some(inner) if !inner.is_null() => inner,
        _ => body,
    }
}

/// Pull `access_token` out of a login response, rejecting blank tokens and
/// tokens shorter than `min_len`. The token itself is returned untouched.
pub fn extract_token(body: &Value, min_len: usize) -> Option<String> {
    unwrap_data(body)
        .get("access_token")
        .and_then(Value::as_str)
        .filter(|t| !t.trim().is_empty() && t.len() >= min_len)
        .map(str::to_string)
}

/// Pull the identity object out of a profile response.
pub fn extract_profile(body: &Value) -> Option<Map<String, Value>> {
    let profile = unwrap_data(body);
    let user = match profile.get("user") {
        Some(inner) if inner.is_object() => inner,
        _ => profile,
    };
    user.as_object().cloned()
}

/// Structured error detail returned by the API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Detail {
    /// `detail: "..."`
    Message(String),
    /// `detail: [{loc: [...], msg: "..."}, ...]`, already joined.
    FieldErrors(String),
}

/// Interpret an error body's `detail` member.
pub fn parse_detail(body: &Value) -> Option<Detail> {
    match body.get("detail")? {
        Value::String(s) if !s.is_empty() => Some(Detail::Message(s.clone())),
        Value::Array(items) => Some(Detail::FieldErrors(join_field_errors(items))),
        _ => None,
    }
}

/// `loc.path: msg` per entry, comma-joined.
fn join_field_errors(items: &[Value]) -> String {
    items
        .iter()
        .map(|item| {
            let loc = item
                .get("loc")
                .and_then(Value::as_array)
                .map(|parts| {
                    parts
                        .iter()
                        .map(|p| match p {
                            Value::String(s) => s.clone(),
                            other => other.to_string(),
                        })
                        .collect::<Vec<_>>()
                        .join(".")
                })
                .unwrap_or_default();
            let msg = item.get("msg").and_then(Value::as_str).unwrap_or_default();
            format!("{loc}: {msg}")
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Human-readable message for a failed exchange or registration.
pub fn detail_message(body: &Value, fallback: &str) -> String {
    match parse_detail(body) {
        Some(Detail::Message(m) | Detail::FieldErrors(m)) => m,
        None => fallback.to_string(),
    }
}
