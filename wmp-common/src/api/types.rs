//! Shared API request/response types
//!
//! Every WMP endpoint answers with the same envelope:
//! `{"success": bool, "message": string, "data"?: object}`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Uniform response envelope
///
/// # Examples
///
/// ```
/// use wmp_common::api::types::ApiEnvelope;
///
/// let ok = ApiEnvelope::ok("Report created", serde_json::json!({"id": 1}));
/// assert!(ok.success);
///
/// let err = ApiEnvelope::error("Report not found");
/// assert!(err.data.is_none());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEnvelope {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ApiEnvelope {
    /// Successful response carrying a payload
    pub fn ok(message: impl Into<String>, data: Value) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }

    /// Successful response without payload
    pub fn ok_empty(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: None,
        }
    }

    /// Failed response
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
        }
    }
}
