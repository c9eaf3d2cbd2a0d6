use crate::store::StoreError;
use serde_json::{json, Value};

/// Success envelope for one response line.
pub fn ok(id: &str, result: Value) -> Value {
    json!({ "id": id, "ok": true, "result": result })
}

/// Failure envelope. Handlers usually build a `HandlerErr` instead so store
/// failures map to precise codes in one place.
pub fn err(id: &str, code: &'static str, message: impl Into<String>, details: Option<Value>) -> Value {
    let mut e = HandlerErr::new(code, message);
    if let Some(d) = details {
        e = e.with_details(d);
    }
    e.response(id)
}

pub struct HandlerErr {
    pub code: &'static str,
    pub message: String,
    pub details: Option<Value>,
}

impl HandlerErr {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn response(self, id: &str) -> Value {
        let mut error = json!({ "code": self.code, "message": self.message });
        if let Some(d) = self.details {
            error["details"] = d;
        }
        json!({ "id": id, "ok": false, "error": error })
    }
}

impl From<StoreError> for HandlerErr {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound { entity, id } => {
                HandlerErr::new("not_found", format!("{} {} not found", entity, id))
                    .with_details(json!({ "id": id }))
            }
            StoreError::Backend { op, message } => HandlerErr::new(op.error_code(), message),
        }
    }
}
