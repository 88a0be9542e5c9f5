//! Error types for the record store API client.
//!
//! # Design
//! `RecordNotFound` and `RecordExists` get dedicated variants because callers
//! routinely branch on them: a domain wrapper may swallow `RecordExists` when
//! asked to create idempotently, or turn `RecordNotFound` into an absence
//! value. All other non-2xx responses land in `HttpError` with the raw status
//! code and the server's error text for debugging.

use std::fmt;

/// Errors returned by `RestClient` parse methods and request executors.
#[derive(Debug)]
pub enum ApiError {
    /// The server returned 404 — the requested record does not exist.
    RecordNotFound,

    /// The server returned 409 — a record with this key already exists.
    RecordExists,

    /// The server returned a non-2xx status other than 404 or 409.
    HttpError { status: u16, body: String },

    /// The request payload could not be encoded.
    SerializationError(String),

    /// The response body could not be decoded into the expected type.
    DeserializationError(String),

    /// The HTTP round-trip itself failed (connection refused, timeout, ...).
    /// Raised by request executors, never by parse methods.
    Transport(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::RecordNotFound => write!(f, "record not found"),
            ApiError::RecordExists => write!(f, "record already exists"),
            ApiError::HttpError { status, body } => {
                write!(f, "HTTP {status}: {body}")
            }
            ApiError::SerializationError(msg) => {
                write!(f, "serialization failed: {msg}")
            }
            ApiError::DeserializationError(msg) => {
                write!(f, "deserialization failed: {msg}")
            }
            ApiError::Transport(msg) => {
                write!(f, "transport error: {msg}")
            }
        }
    }
}

impl std::error::Error for ApiError {}
