//! Service errors and their HTTP rendering
//!
//! Store failures are [`DatabaseError`]s. Anything that reaches a handler is an
//! [`Error`], rendered as `{ "error": ..., "code": ..., "status": ... }`.
//! Server-side failures are logged in full and answered with an opaque message.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::listing::QueryError;

/// What the store was doing when it failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatabaseOperation {
    Connect,
    Query,
    PoolAcquire,
}

impl DatabaseOperation {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Connect => "connect",
            Self::Query => "query",
            Self::PoolAcquire => "pool_acquire",
        }
    }
}

impl fmt::Display for DatabaseOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure category; picks the response status and the error code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatabaseErrorKind {
    ConnectionFailed,
    QueryFailed,
    /// A row did not decode into a listing
    TypeConversion,
    Configuration,
    Timeout,
    PoolExhausted,
    Other,
}

impl DatabaseErrorKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ConnectionFailed => "connection_failed",
            Self::QueryFailed => "query_failed",
            Self::TypeConversion => "type_conversion",
            Self::Configuration => "configuration",
            Self::Timeout => "timeout",
            Self::PoolExhausted => "pool_exhausted",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for DatabaseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed store call
///
/// A missing listing is `Ok(None)` from the store, never one of these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseError {
    pub operation: DatabaseOperation,
    pub kind: DatabaseErrorKind,
    /// Driver message; logged, never sent to clients
    pub message: String,
    /// What the caller was doing, e.g. `list rentals`
    pub context: Option<String>,
}

impl DatabaseError {
    pub fn new(
        operation: DatabaseOperation,
        kind: DatabaseErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            operation,
            kind,
            message: message.into(),
            context: None,
        }
    }

    pub fn connection_failed(message: impl Into<String>) -> Self {
        Self::new(
            DatabaseOperation::Connect,
            DatabaseErrorKind::ConnectionFailed,
            message,
        )
    }

    pub fn query_failed(message: impl Into<String>) -> Self {
        Self::new(
            DatabaseOperation::Query,
            DatabaseErrorKind::QueryFailed,
            message,
        )
    }

    pub fn timeout(operation: DatabaseOperation, message: impl Into<String>) -> Self {
        Self::new(operation, DatabaseErrorKind::Timeout, message)
    }

    /// Whether repeating the call could succeed
    ///
    /// Listing queries are never retried in-process; this only feeds the logs.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self.kind,
            DatabaseErrorKind::ConnectionFailed
                | DatabaseErrorKind::Timeout
                | DatabaseErrorKind::PoolExhausted
        )
    }

    #[must_use]
    pub fn add_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

impl fmt::Display for DatabaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.operation, self.kind, self.message)?;
        match &self.context {
            Some(context) => write!(f, " (while {context})"),
            None => Ok(()),
        }
    }
}

impl std::error::Error for DatabaseError {}

impl From<sqlx::Error> for DatabaseError {
    fn from(err: sqlx::Error) -> Self {
        use sqlx::Error as E;
        use DatabaseErrorKind as K;
        use DatabaseOperation as O;

        let (operation, kind) = match &err {
            E::PoolTimedOut => (O::PoolAcquire, K::PoolExhausted),
            E::PoolClosed | E::Io(_) | E::Tls(_) | E::WorkerCrashed => {
                (O::Connect, K::ConnectionFailed)
            }
            E::Configuration(_) => (O::Connect, K::Configuration),
            E::TypeNotFound { .. } | E::ColumnDecode { .. } | E::Decode(_) => {
                (O::Query, K::TypeConversion)
            }
            // 57014 query_canceled: the server-side statement_timeout fired
            E::Database(db) if db.code().as_deref() == Some("57014") => (O::Query, K::Timeout),
            E::Database(_) | E::Protocol(_) | E::ColumnNotFound(_) | E::RowNotFound => {
                (O::Query, K::QueryFailed)
            }
            _ => (O::Query, K::Other),
        };

        Self::new(operation, kind, err.to_string())
    }
}

/// Result type alias using the service error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the service
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(Box<figment::Error>),

    #[error(transparent)]
    Database(DatabaseError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The request was withdrawn (shutdown) before its query finished
    #[error("Request canceled")]
    Canceled,

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl Error {
    /// Status, machine-readable code and client-safe message
    fn parts(&self) -> (StatusCode, String, String) {
        const OPAQUE: &str = "Internal Server Error";

        let (status, code, message) = match self {
            Error::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST".into(), msg.as_str()),
            Error::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND".into(), msg.as_str()),
            Error::Canceled => (
                StatusCode::SERVICE_UNAVAILABLE,
                "REQUEST_CANCELED".into(),
                "Request canceled",
            ),
            Error::Database(e) if e.kind == DatabaseErrorKind::Timeout => (
                StatusCode::GATEWAY_TIMEOUT,
                "DATABASE_TIMEOUT".into(),
                "Database operation timed out",
            ),
            Error::Database(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("DATABASE_{}", e.kind.as_str().to_uppercase()),
                OPAQUE,
            ),
            Error::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "CONFIG_ERROR".into(), OPAQUE),
            Error::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "IO_ERROR".into(), OPAQUE),
            Error::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR".into(), OPAQUE),
        };

        (status, code, message.to_string())
    }
}

/// JSON body of every error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    pub status: u16,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();

        match &self {
            Error::Database(e) => tracing::error!(
                operation = %e.operation,
                kind = %e.kind,
                context = ?e.context,
                retriable = e.is_retriable(),
                "Database error: {}",
                e.message
            ),
            Error::Canceled => tracing::warn!("Request canceled before the query completed"),
            _ if status.is_server_error() => tracing::error!(code = %code, "{}", self),
            _ => tracing::debug!(code = %code, "{}", self),
        }

        let body = ErrorResponse {
            error: message,
            code,
            status: status.as_u16(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Error::Config(Box::new(err))
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        Error::Database(err.into())
    }
}

impl From<DatabaseError> for Error {
    fn from(err: DatabaseError) -> Self {
        Error::Database(err)
    }
}

impl From<QueryError> for Error {
    fn from(err: QueryError) -> Self {
        match err {
            QueryError::Validation(msg) => Error::BadRequest(msg),
            QueryError::Internal(db) => Error::Database(db),
            QueryError::Canceled => Error::Canceled,
        }
    }
}
