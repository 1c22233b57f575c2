//! Request and response bodies for the admin API.

use crate::error::AppError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body of `POST /api/admin/login`.
#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub token: Option<String>,
}

impl LoginRequest {
    /// Read the login fields from any JSON value.
    ///
    /// Bodies that are not objects, or objects without a `token`, carry no
    /// token. A non-null `token` that is not a string is a server error.
    pub fn from_value(value: &Value) -> Result<Self, AppError> {
        match value.get("token") {
            None | Some(Value::Null) => Ok(Self::default()),
            Some(Value::String(token)) => Ok(Self {
                token: Some(token.clone()),
            }),
            Some(other) => Err(AppError::Internal(format!(
                "login token is not a string: {}",
                json_kind(other)
            ))),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Generic success body, `{"ok": true}`.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct OkResponse {
    pub ok: bool,
}

impl OkResponse {
    pub fn ok() -> Self {
        Self { ok: true }
    }
}

/// Body of `GET /api/admin/session`.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionStatus {
    pub authenticated: bool,
}
