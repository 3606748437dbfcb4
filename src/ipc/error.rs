use crate::error::RecordsError;
use serde_json::json;

pub fn ok(id: &str, result: serde_json::Value) -> serde_json::Value {
    json!({
        "id": id,
        "ok": true,
        "result": result
    })
}

pub fn err(
    id: &str,
    code: &str,
    message: impl Into<String>,
    details: Option<serde_json::Value>,
) -> serde_json::Value {
    let mut error = json!({
        "code": code,
        "message": message.into(),
    });
    if let Some(d) = details {
        error["details"] = d;
    }
    json!({
        "id": id,
        "ok": false,
        "error": error,
    })
}

/// A failed handler step, rendered with [`HandlerErr::response`].
#[derive(Debug)]
pub struct HandlerErr {
    pub code: &'static str,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl HandlerErr {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn response(self, id: &str) -> serde_json::Value {
        tracing::warn!(request_id = id, code = self.code, message = %self.message, "request failed");
        err(id, self.code, self.message, self.details)
    }
}

impl From<RecordsError> for HandlerErr {
    fn from(e: RecordsError) -> Self {
        let details = match &e {
            RecordsError::DuplicateIdentifier { kind, id } | RecordsError::NotFound { kind, id } => {
                Some(json!({ "kind": kind.as_str(), "id": id }))
            }
            RecordsError::FileNotFound(path) | RecordsError::Write { path, .. } => {
                Some(json!({ "path": path.to_string_lossy() }))
            }
            _ => None,
        };
        Self {
            code: e.code(),
            message: e.to_string(),
            details,
        }
    }
}

/// Collapses a handler body into a response envelope.
pub fn respond(id: &str, result: Result<serde_json::Value, HandlerErr>) -> serde_json::Value {
    match result {
        Ok(v) => ok(id, v),
        Err(e) => e.response(id),
    }
}
