//! Error type for the accounts client.
//!
//! # Design
//! Every failure of every operation is funneled into a single
//! `OperationError`. Callers branch on `kind` and `status_code` to decide
//! their own retry policy; the client itself never retries. Whenever a
//! response body was read before the operation failed, the raw bytes are
//! kept in `payload` so error bodies from the service reach the caller
//! verbatim.

use std::fmt;

use thiserror::Error;

/// Boxed error produced by transport primitives.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Which stage of an operation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A caller-supplied argument was rejected before any network call.
    InvalidArgument,
    /// The client could not be configured (e.g. malformed base URL).
    InvalidConfiguration,
    /// No response was received (connection error, timeout).
    TransportFailure,
    /// The request itself could not be assembled.
    RequestBuildFailure,
    /// A response arrived but its body could not be read.
    BodyReadFailure,
    /// The service answered with a status other than the expected one.
    UnexpectedStatus,
    /// The service answered 200 with a non-JSON content type.
    UnexpectedContentType,
    /// The request payload could not be encoded.
    SerializationFailure,
    /// The response body was not a decodable envelope.
    DeserializationFailure,
    /// The envelope decoded but carried no account.
    EmptyPayload,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::InvalidArgument => "invalid argument",
            ErrorKind::InvalidConfiguration => "invalid configuration",
            ErrorKind::TransportFailure => "transport failure",
            ErrorKind::RequestBuildFailure => "request build failure",
            ErrorKind::BodyReadFailure => "body read failure",
            ErrorKind::UnexpectedStatus => "unexpected status",
            ErrorKind::UnexpectedContentType => "unexpected content type",
            ErrorKind::SerializationFailure => "serialization failure",
            ErrorKind::DeserializationFailure => "deserialization failure",
            ErrorKind::EmptyPayload => "empty payload",
        };
        f.write_str(name)
    }
}

/// Normalized failure of a client operation.
///
/// Displays as the message, followed by ` : <cause>` when an underlying
/// error is attached.
#[derive(Debug, Error)]
#[error("{message}{}", .cause.as_ref().map(|c| format!(" : {c}")).unwrap_or_default())]
pub struct OperationError {
    pub kind: ErrorKind,
    pub message: String,
    /// HTTP status of the response, 0 when none was received or inspected.
    pub status_code: u16,
    /// Raw response body, set whenever one was read.
    pub payload: Option<Vec<u8>>,
    #[source]
    pub cause: Option<BoxError>,
}

impl OperationError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status_code: 0,
            payload: None,
            cause: None,
        }
    }

    pub fn with_cause(mut self, cause: impl Into<BoxError>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    pub fn with_status(mut self, status_code: u16) -> Self {
        self.status_code = status_code;
        self
    }

    pub fn with_payload(mut self, payload: Vec<u8>) -> Self {
        self.payload = Some(payload);
        self
    }

    pub(crate) fn invalid_id() -> Self {
        Self::new(ErrorKind::InvalidArgument, "id must be a valid uuid")
    }

    pub(crate) fn invalid_url() -> Self {
        Self::new(ErrorKind::InvalidConfiguration, "invalid URL provided")
    }

    pub(crate) fn transport(operation: Operation, cause: BoxError) -> Self {
        let message = match operation {
            Operation::Get => "Error placing a Get Http request",
            Operation::Post => "Error placing a Post Http request",
            Operation::Delete => "Error placing Delete Http request",
        };
        Self::new(ErrorKind::TransportFailure, message).with_cause(cause)
    }

    pub(crate) fn request_build(cause: BoxError) -> Self {
        Self::new(ErrorKind::RequestBuildFailure, "Error preparing Delete Http request")
            .with_cause(cause)
    }

    pub(crate) fn body_read(cause: BoxError) -> Self {
        Self::new(ErrorKind::BodyReadFailure, "Error processing response body").with_cause(cause)
    }

    pub(crate) fn unexpected_status(
        operation: Operation,
        expected: u16,
        actual: u16,
        payload: Vec<u8>,
    ) -> Self {
        Self::new(
            ErrorKind::UnexpectedStatus,
            format!(
                "Unexpected response code returned for {operation} operation, expected {expected}, got {actual}"
            ),
        )
        .with_status(actual)
        .with_payload(payload)
    }

    pub(crate) fn unexpected_content_type(status: u16, actual: &str, payload: Vec<u8>) -> Self {
        Self::new(
            ErrorKind::UnexpectedContentType,
            format!("Unexpected Content-Type, expecting application/json, got {actual}"),
        )
        .with_status(status)
        .with_payload(payload)
    }

    pub(crate) fn serialization(cause: BoxError) -> Self {
        Self::new(ErrorKind::SerializationFailure, "Unable to serialize payload").with_cause(cause)
    }

    pub(crate) fn deserialization(cause: impl Into<BoxError>, payload: Vec<u8>) -> Self {
        Self::new(ErrorKind::DeserializationFailure, "Error deserializing json")
            .with_cause(cause)
            .with_payload(payload)
    }

    pub(crate) fn empty_payload(payload: Vec<u8>) -> Self {
        Self::new(
            ErrorKind::EmptyPayload,
            "Got an empty object after deserialization, json payload was an empty object?",
        )
        .with_payload(payload)
    }
}

/// Operation label used in error messages and log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Operation {
    Get,
    Post,
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Get => f.write_str("Get"),
            Operation::Post => f.write_str("Post"),
            Operation::Delete => f.write_str("Delete"),
        }
    }
}
