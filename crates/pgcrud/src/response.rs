//! The `{code, msg, data}` response envelope.
//!
//! Executors return values and errors; this is where a boundary layer turns
//! either into the JSON body (plus HTTP status) the API answers with.

use crate::error::CrudError;
use serde::{Deserialize, Serialize};

/// Uniform API body. `status` is the HTTP status and is not serialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub code: String,
    pub msg: String,
    pub data: Option<T>,
    #[serde(skip)]
    pub status: u16,
}

impl<T> ApiResponse<T> {
    /// `200 SUCCESS` carrying `data`.
    pub fn success(data: T, msg: impl Into<String>) -> Self {
        Self {
            code: "SUCCESS".to_owned(),
            msg: msg.into(),
            data: Some(data),
            status: 200,
        }
    }

    /// An error body without data.
    pub fn error(status: u16, code: impl Into<String>, msg: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            msg: msg.into(),
            data: None,
            status,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Map an executor error onto a status and code.
    ///
    /// | error | status | code |
    /// |---|---|---|
    /// | `NotFound` | 404 | `NOT_FOUND` |
    /// | `Validation`, `Precondition` | 400 | `VALIDATION_ERROR` |
    /// | unique violation (23505) | 409 | `DUPLICATE` |
    /// | foreign key violation (23503) | 409 | `DATA_IN_USE` |
    /// | anything else | 500 | `INTERNAL_ERROR` |
    ///
    /// Internal errors get a generic message; the detail is logged instead.
    pub fn from_error(err: &CrudError) -> Self {
        match err {
            CrudError::NotFound(msg) => Self::error(404, "NOT_FOUND", msg.clone()),
            CrudError::Validation(msg) | CrudError::Precondition(msg) => {
                Self::error(400, "VALIDATION_ERROR", msg.clone())
            }
            _ if err.is_unique_violation() => {
                let msg = match err.constraint() {
                    Some(constraint) => format!("Duplicate entry violates '{constraint}'"),
                    None => "Duplicate entry".to_owned(),
                };
                Self::error(409, "DUPLICATE", msg)
            }
            _ if err.is_foreign_key_violation() => Self::error(
                409,
                "DATA_IN_USE",
                "Data is referenced by other records",
            ),
            _ => {
                tracing::error!(target: "pgcrud", error = %err, "internal error");
                Self::error(500, "INTERNAL_ERROR", "Internal server error")
            }
        }
    }
}

impl<T> From<CrudError> for ApiResponse<T> {
    fn from(err: CrudError) -> Self {
        Self::from_error(&err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn success_envelope() {
        let resp = ApiResponse::success(json!({"id": 1}), "Category created").with_status(201);
        assert_eq!(resp.status, 201);
        assert_eq!(
            serde_json::to_value(&resp).unwrap(),
            json!({"code": "SUCCESS", "msg": "Category created", "data": {"id": 1}})
        );
    }

    #[test]
    fn errors_map_to_status_and_code() {
        let resp: ApiResponse<()> =
            CrudError::not_found("Data with specified filters does not exist").into();
        assert_eq!((resp.status, resp.code.as_str()), (404, "NOT_FOUND"));
        assert_eq!(
            serde_json::to_value(&resp).unwrap(),
            json!({"code": "NOT_FOUND", "msg": "Data with specified filters does not exist", "data": null})
        );

        let resp: ApiResponse<()> = CrudError::precondition("soft_delete requires a non-empty filter").into();
        assert_eq!((resp.status, resp.code.as_str()), (400, "VALIDATION_ERROR"));

        let resp: ApiResponse<()> = CrudError::Pool("timed out".into()).into();
        assert_eq!((resp.status, resp.code.as_str()), (500, "INTERNAL_ERROR"));
        assert!(!resp.msg.contains("timed out"));
    }
}
