//! HTTP transport seam for the accounts client.
//!
//! # Design
//! Requests are described as plain data (`HttpRequest`) and handed to a
//! `Transport`, which returns an `HttpResponse` whose body is still an open
//! stream. The client owns that response for the rest of the pipeline, so
//! the body is released by drop on every exit path.
//!
//! Each primitive of `Transport` can be overridden on its own. `get` and
//! `post` default to `build_request` + `execute`, and `read_all` and
//! `serialize` default to `std::io` and `serde_json`. A test double wraps a
//! real transport and replaces exactly the primitive it wants to fail.

use std::fmt;
use std::io::Read;
use std::time::Duration;

use crate::error::BoxError;
use crate::types::{Account, Envelope};

pub const CONTENT_TYPE: &str = "Content-Type";
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An HTTP request described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

/// A received HTTP response with an unread body.
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Box<dyn Read + Send>,
}

impl HttpResponse {
    /// Value of the first header named `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

impl fmt::Debug for HttpResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

/// The low-level HTTP capabilities the client depends on.
pub trait Transport: Send + Sync {
    /// Assemble a request for an arbitrary method.
    fn build_request(
        &self,
        method: HttpMethod,
        url: &str,
        body: Option<Vec<u8>>,
    ) -> Result<HttpRequest, BoxError>;

    /// Send a built request and return the response with its body unread.
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, BoxError>;

    fn get(&self, url: &str) -> Result<HttpResponse, BoxError> {
        let request = self.build_request(HttpMethod::Get, url, None)?;
        self.execute(request)
    }

    fn post(&self, url: &str, content_type: &str, body: Vec<u8>) -> Result<HttpResponse, BoxError> {
        let mut request = self.build_request(HttpMethod::Post, url, Some(body))?;
        request
            .headers
            .push((CONTENT_TYPE.to_string(), content_type.to_string()));
        self.execute(request)
    }

    fn read_all(&self, body: &mut dyn Read) -> Result<Vec<u8>, BoxError> {
        let mut buf = Vec::new();
        body.read_to_end(&mut buf)?;
        Ok(buf)
    }

    fn serialize(&self, envelope: &Envelope<&Account>) -> Result<Vec<u8>, BoxError> {
        Ok(serde_json::to_vec(envelope)?)
    }
}

/// Blocking transport backed by a `ureq` agent.
///
/// Non-2xx statuses are returned as responses, never as errors, so the
/// client alone decides how a status is interpreted.
#[derive(Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
    timeout: Option<Duration>,
}

impl UreqTransport {
    pub fn new(timeout: Option<Duration>) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(timeout)
            .build()
            .new_agent();
        Self { agent, timeout }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new(None)
    }
}

impl fmt::Debug for UreqTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UreqTransport")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl Transport for UreqTransport {
    fn build_request(
        &self,
        method: HttpMethod,
        url: &str,
        body: Option<Vec<u8>>,
    ) -> Result<HttpRequest, BoxError> {
        let uri: ureq::http::Uri = url.parse()?;
        if uri.scheme().is_none() || uri.authority().is_none() {
            return Err(format!("request url is not absolute: {url}").into());
        }
        Ok(HttpRequest {
            method,
            url: url.to_string(),
            headers: Vec::new(),
            body,
        })
    }

    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, BoxError> {
        let HttpRequest {
            method,
            url,
            headers,
            body,
        } = request;

        let response = match method {
            HttpMethod::Get => with_headers(self.agent.get(url.as_str()), &headers).call(),
            HttpMethod::Delete => with_headers(self.agent.delete(url.as_str()), &headers).call(),
            HttpMethod::Post => with_headers(self.agent.post(url.as_str()), &headers)
                .send(body.as_deref().unwrap_or_default()),
        }?;

        let status = response.status().as_u16();
        let headers = collect_headers(response.headers());
        let body = response.into_body().into_reader();

        Ok(HttpResponse {
            status,
            headers,
            body: Box::new(body),
        })
    }
}

/// Copy response headers, keeping non-ASCII values lossily.
fn collect_headers(headers: &ureq::http::HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect()
}

fn with_headers<B>(
    mut builder: ureq::RequestBuilder<B>,
    headers: &[(String, String)],
) -> ureq::RequestBuilder<B> {
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}
