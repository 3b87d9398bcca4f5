//! # Errors
//!
//! Structured errors for the blog API. A `BlogError` lives inside
//! `anyhow::Error` so it can travel through services and stores
//! unchanged; the HTTP layer downcasts it to pick a status code and
//! render the `{status, message}` envelope.
//!
//! - 4xx kinds render as `status: "fail"`
//! - 5xx kinds render as `status: "error"`

use std::fmt;

use anyhow::Error as AnyError;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    BadRequest,       // 400
    NotAuthenticated, // 401
    Forbidden,        // 403
    NotFound,         // 404
    GeneralError,     // 500
}

impl ErrorKind {
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorKind::BadRequest => 400,
            ErrorKind::NotAuthenticated => 401,
            ErrorKind::Forbidden => 403,
            ErrorKind::NotFound => 404,
            ErrorKind::GeneralError => 500,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::BadRequest => "BadRequest",
            ErrorKind::NotAuthenticated => "NotAuthenticated",
            ErrorKind::Forbidden => "Forbidden",
            ErrorKind::NotFound => "NotFound",
            ErrorKind::GeneralError => "GeneralError",
        }
    }

    /// Envelope status: client mistakes "fail", server faults "error".
    pub fn status(&self) -> &'static str {
        if self.status_code() < 500 {
            "fail"
        } else {
            "error"
        }
    }
}

/// A structured blog API error that can live inside `anyhow::Error`.
#[derive(Debug)]
pub struct BlogError {
    pub kind: ErrorKind,
    pub message: String,
    /// Per-field validation messages, `{"title": ["..."]}`.
    pub errors: Option<Value>,
    pub source: Option<AnyError>,
}

impl BlogError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            errors: None,
            source: None,
        }
    }

    pub fn with_errors(mut self, errors: Value) -> Self {
        self.errors = Some(errors);
        self
    }

    pub fn with_source(mut self, source: AnyError) -> Self {
        self.source = Some(source);
        self
    }

    pub fn code(&self) -> u16 {
        self.kind.status_code()
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn status(&self) -> &'static str {
        self.kind.status()
    }

    /// Convert into `anyhow::Error` so it flows through `?`.
    pub fn into_anyhow(self) -> AnyError {
        AnyError::new(self)
    }

    pub fn from_anyhow(err: &AnyError) -> Option<&BlogError> {
        err.chain().find_map(|e| e.downcast_ref::<BlogError>())
    }

    /// Turn any error into a BlogError:
    /// - if it's already a BlogError, keep it
    /// - otherwise wrap as GeneralError
    pub fn normalize(err: AnyError) -> BlogError {
        match err.downcast::<BlogError>() {
            Ok(blog) => blog,
            Err(other) => {
                BlogError::new(ErrorKind::GeneralError, other.to_string()).with_source(other)
            }
        }
    }

    /// Client-facing copy without the inner `source`.
    pub fn sanitize_for_client(&self) -> BlogError {
        BlogError {
            kind: self.kind,
            message: self.message.clone(),
            errors: self.errors.clone(),
            source: None,
        }
    }

    pub fn to_json(&self) -> Value {
        let mut base = serde_json::json!({
            "status": self.status(),
            "message": self.message,
        });

        if let Some(e) = &self.errors {
            base["errors"] = e.clone();
        }
        base
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest, msg)
    }
    pub fn not_authenticated(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotAuthenticated, msg)
    }
    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Forbidden, msg)
    }
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, msg)
    }
    pub fn general_error(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::GeneralError, msg)
    }
}

impl fmt::Display for BlogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.name(), self.code(), self.message)
    }
}

impl std::error::Error for BlogError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Return early with a `BlogError` built from one of its constructors.
#[macro_export]
macro_rules! bail_blog {
    ($ctor:ident, $msg:expr) => {
        return Err($crate::errors::BlogError::$ctor($msg).into_anyhow())
    };
    ($ctor:ident, $fmt:expr, $($arg:tt)*) => {
        return Err($crate::errors::BlogError::$ctor(format!($fmt, $($arg)*)).into_anyhow())
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn client_errors_render_as_fail() {
        let err = BlogError::not_found("No blog found with that ID");
        assert_eq!(err.code(), 404);
        assert_eq!(
            err.to_json(),
            json!({"status": "fail", "message": "No blog found with that ID"})
        );
    }

    #[test]
    fn server_errors_render_as_error() {
        let err = BlogError::normalize(anyhow::anyhow!("disk on fire"));
        assert_eq!(err.kind, ErrorKind::GeneralError);
        assert_eq!(err.to_json()["status"], "error");
        assert!(err.sanitize_for_client().source.is_none());
    }

    #[test]
    fn downcast_survives_context() {
        let err = BlogError::bad_request("nope")
            .into_anyhow()
            .context("while creating a blog");
        let blog = BlogError::from_anyhow(&err).expect("must be BlogError");
        assert_eq!(blog.kind, ErrorKind::BadRequest);
    }
}
