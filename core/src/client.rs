//! Accounts client: three operations over one response pipeline.
//!
//! # Design
//! `AccountsClient` holds only its base URL and a `Transport`, and carries
//! no mutable state between calls. Each operation validates its input,
//! hands a request to the transport, then runs the response through the
//! same ordered checks:
//!
//! 1. read the whole body (a read failure wins over everything else),
//! 2. compare the status code with the one the operation expects,
//! 3. check the content type (fetch only),
//! 4. decode the `{"data": ...}` envelope and reject an empty one.
//!
//! The first failing step produces the operation's `OperationError`; later
//! steps never run. The response is owned by the operation, so its body is
//! released on every return path.

use serde::de::{Error as _, Unexpected};
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::{validate_base_url, ClientConfig};
use crate::error::{Operation, OperationError};
use crate::http::{
    HttpMethod, HttpResponse, Transport, UreqTransport, CONTENT_TYPE, JSON_CONTENT_TYPE,
};
use crate::types::{Account, Envelope};

/// Path of the accounts collection, relative to the base URL.
pub const SERVICE_PATH: &str = "v1/organisation/accounts";

const FETCH_OK: u16 = 200;
const CREATE_OK: u16 = 201;
const DELETE_OK: u16 = 204;

/// Synchronous client for the accounts service.
///
/// Safe to share between threads whenever the transport is; the default
/// `UreqTransport` is.
#[derive(Debug, Clone)]
pub struct AccountsClient<T = UreqTransport> {
    base_url: String,
    transport: T,
}

impl AccountsClient<UreqTransport> {
    /// Client for `base_url` over the default `ureq` transport.
    pub fn new(base_url: &str) -> Result<Self, OperationError> {
        Self::from_config(ClientConfig::new(base_url))
    }

    pub fn from_config(config: ClientConfig) -> Result<Self, OperationError> {
        Self::with_transport(&config.base_url, UreqTransport::new(config.timeout))
    }
}

impl<T: Transport> AccountsClient<T> {
    /// Client for `base_url` over a caller-supplied transport.
    pub fn with_transport(base_url: &str, transport: T) -> Result<Self, OperationError> {
        let base_url = validate_base_url(base_url)?;
        Ok(Self {
            base_url,
            transport,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Fetch the account with the given UUID.
    pub fn fetch(&self, id: &str) -> Result<Account, OperationError> {
        let result = self.fetch_inner(id);
        trace_outcome(Operation::Get, &result);
        result
    }

    /// Create `account`, returning the server's copy (with its version).
    pub fn create(&self, account: &Account) -> Result<Account, OperationError> {
        let result = self.create_inner(account);
        trace_outcome(Operation::Post, &result);
        result
    }

    /// Delete the account with the given UUID at `version`.
    pub fn delete(&self, id: &str, version: i64) -> Result<(), OperationError> {
        let result = self.delete_inner(id, version);
        trace_outcome(Operation::Delete, &result);
        result
    }

    fn fetch_inner(&self, id: &str) -> Result<Account, OperationError> {
        let id = parse_id(id)?;
        let url = format!("{}/{SERVICE_PATH}/{id}", self.base_url);
        debug!(method = %HttpMethod::Get, %url, "placing accounts request");

        let mut response = self
            .transport
            .get(&url)
            .map_err(|e| OperationError::transport(Operation::Get, e))?;

        let payload = self.read_payload(&mut response)?;
        let payload = check_status(Operation::Get, FETCH_OK, &response, payload)?;
        let payload = check_json_content_type(&response, payload)?;
        decode_account(payload)
    }

    fn create_inner(&self, account: &Account) -> Result<Account, OperationError> {
        let body = self
            .transport
            .serialize(&Envelope::new(account))
            .map_err(OperationError::serialization)?;
        let url = format!("{}/{SERVICE_PATH}", self.base_url);
        debug!(method = %HttpMethod::Post, %url, "placing accounts request");

        let mut response = self
            .transport
            .post(&url, JSON_CONTENT_TYPE, body)
            .map_err(|e| OperationError::transport(Operation::Post, e))?;

        let payload = self.read_payload(&mut response)?;
        let payload = check_status(Operation::Post, CREATE_OK, &response, payload)?;
        // The create response's content type is not checked.
        decode_account(payload)
    }

    fn delete_inner(&self, id: &str, version: i64) -> Result<(), OperationError> {
        let id = parse_id(id)?;
        let url = format!("{}/{SERVICE_PATH}/{id}?version={version}", self.base_url);
        debug!(method = %HttpMethod::Delete, %url, "placing accounts request");

        let request = self
            .transport
            .build_request(HttpMethod::Delete, &url, None)
            .map_err(OperationError::request_build)?;
        let mut response = self
            .transport
            .execute(request)
            .map_err(|e| OperationError::transport(Operation::Delete, e))?;

        if response.status == DELETE_OK {
            return Ok(());
        }
        let payload = self.read_payload(&mut response)?;
        Err(OperationError::unexpected_status(
            Operation::Delete,
            DELETE_OK,
            response.status,
            payload,
        ))
    }

    fn read_payload(&self, response: &mut HttpResponse) -> Result<Vec<u8>, OperationError> {
        self.transport
            .read_all(&mut response.body)
            .map_err(OperationError::body_read)
    }
}

fn parse_id(id: &str) -> Result<Uuid, OperationError> {
    Uuid::parse_str(id).map_err(|_| OperationError::invalid_id())
}

fn check_status(
    operation: Operation,
    expected: u16,
    response: &HttpResponse,
    payload: Vec<u8>,
) -> Result<Vec<u8>, OperationError> {
    if response.status == expected {
        return Ok(payload);
    }
    Err(OperationError::unexpected_status(
        operation,
        expected,
        response.status,
        payload,
    ))
}

fn check_json_content_type(
    response: &HttpResponse,
    payload: Vec<u8>,
) -> Result<Vec<u8>, OperationError> {
    let content_type = response.header(CONTENT_TYPE).unwrap_or_default();
    if content_type.starts_with(JSON_CONTENT_TYPE) {
        return Ok(payload);
    }
    Err(OperationError::unexpected_content_type(
        response.status,
        content_type,
        payload,
    ))
}

/// Decode an envelope, treating a missing, `null` or `{}` `data` as empty.
fn decode_account(payload: Vec<u8>) -> Result<Account, OperationError> {
    let mut envelope: serde_json::Map<String, Value> = match serde_json::from_slice(&payload) {
        Ok(envelope) => envelope,
        Err(e) => return Err(OperationError::deserialization(e, payload)),
    };

    match envelope.remove("data") {
        None | Some(Value::Null) => Err(OperationError::empty_payload(payload)),
        Some(Value::Object(fields)) if fields.is_empty() => {
            Err(OperationError::empty_payload(payload))
        }
        Some(data @ Value::Object(_)) => {
            serde_json::from_value(data).map_err(|e| OperationError::deserialization(e, payload))
        }
        Some(other) => {
            let cause = serde_json::Error::invalid_type(unexpected(&other), &"an account object");
            Err(OperationError::deserialization(cause, payload))
        }
    }
}

fn unexpected(value: &Value) -> Unexpected<'_> {
    match value {
        Value::Bool(b) => Unexpected::Bool(*b),
        Value::Number(_) => Unexpected::Other("number"),
        Value::String(s) => Unexpected::Str(s),
        Value::Array(_) => Unexpected::Seq,
        Value::Null | Value::Object(_) => Unexpected::Map,
    }
}

fn trace_outcome<R>(operation: Operation, result: &Result<R, OperationError>) {
    match result {
        Ok(_) => debug!(%operation, "accounts operation succeeded"),
        Err(err) => warn!(
            %operation,
            kind = %err.kind,
            status = err.status_code,
            error = %err,
            "accounts operation failed"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn new_rejects_invalid_base_url() {
        let err = AccountsClient::new("boom").unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidConfiguration);
        assert_eq!(err.message, "invalid URL provided");
    }

    #[test]
    fn trailing_slash_is_stripped() {
        let client = AccountsClient::new("http://localhost:8080/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:8080");
    }

    #[test]
    fn fetch_rejects_non_uuid_id() {
        let client = AccountsClient::new("https://abc.com").unwrap();
        let err = client.fetch("blah").unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidArgument);
        assert_eq!(err.message, "id must be a valid uuid");
        assert_eq!(err.status_code, 0);
        assert!(err.payload.is_none());
        assert!(err.cause.is_none());
    }

    #[test]
    fn delete_rejects_non_uuid_id() {
        let client = AccountsClient::new("https://abc.com").unwrap();
        let err = client.delete("blah", 2).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidArgument);
        assert_eq!(err.message, "id must be a valid uuid");
    }

    #[test]
    fn decode_account_extracts_data() {
        let account = decode_account(
            br#"{"data":{"id":"abc","organisation_id":"org","type":"accounts","version":3}}"#
                .to_vec(),
        )
        .unwrap();
        assert_eq!(account.id, "abc");
        assert_eq!(account.version, Some(3));
        assert!(account.attributes.is_none());
    }

    #[test]
    fn decode_account_flags_empty_envelopes() {
        for body in [&b"{}"[..], &br#"{"data":null}"#[..], &br#"{"data":{}}"#[..]] {
            let err = decode_account(body.to_vec()).unwrap_err();
            assert_eq!(err.kind, ErrorKind::EmptyPayload);
            assert_eq!(err.payload.as_deref(), Some(body));
            assert!(err.cause.is_none());
        }
    }

    #[test]
    fn decode_account_flags_malformed_json() {
        let err = decode_account(b"blah".to_vec()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::DeserializationFailure);
        assert_eq!(err.message, "Error deserializing json");
        assert_eq!(err.status_code, 0);
        assert_eq!(err.payload.as_deref(), Some(&b"blah"[..]));
        assert!(err.cause.is_some());
    }

    #[test]
    fn decode_account_flags_mistyped_data() {
        let err = decode_account(br#"{"data":{"version":"seven"}}"#.to_vec()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::DeserializationFailure);
    }

    #[test]
    fn decode_account_rejects_non_object_data() {
        let bodies = [
            &br#"{"data":[]}"#[..],
            &br#"{"data":["a","b","c"]}"#[..],
            &br#"{"data":"abc"}"#[..],
            &br#"{"data":7}"#[..],
            &br#"{"data":true}"#[..],
        ];
        for body in bodies {
            let err = decode_account(body.to_vec()).unwrap_err();
            assert_eq!(err.kind, ErrorKind::DeserializationFailure, "{body:?}");
            assert_eq!(err.message, "Error deserializing json");
            assert_eq!(err.status_code, 0);
            assert_eq!(err.payload.as_deref(), Some(body));
            assert!(err.cause.is_some());
        }
    }

    #[test]
    fn decode_account_rejects_non_object_envelope() {
        for body in [&b"[]"[..], &b"null"[..], &b"\"data\""[..], &b"42"[..]] {
            let err = decode_account(body.to_vec()).unwrap_err();
            assert_eq!(err.kind, ErrorKind::DeserializationFailure, "{body:?}");
            assert_eq!(err.payload.as_deref(), Some(body));
        }
    }

    #[test]
    fn default_client_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<AccountsClient<UreqTransport>>();
    }
}
