//! Synchronous client for the accounts resource API.
//!
//! # Overview
//! `AccountsClient` fetches, creates and deletes accounts on a remote
//! service that speaks JSON envelopes (`{"data": {...}}`) over HTTP. Every
//! failure, whether network, status, content type or decoding, comes back
//! as a single `OperationError`.
//!
//! # Design
//! - The client is stateless apart from its base URL and transport.
//! - HTTP goes through the `Transport` trait; `UreqTransport` is the
//!   default. Any primitive can be replaced to inject faults in tests.
//! - DTOs are defined independently from the mock-server crate;
//!   integration tests catch schema drift.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod types;

pub use client::{AccountsClient, SERVICE_PATH};
pub use config::ClientConfig;
pub use error::{BoxError, ErrorKind, OperationError};
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport, UreqTransport};
pub use types::{Account, AccountAttributes, Envelope};
