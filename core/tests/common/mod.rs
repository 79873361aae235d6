//! Scripted transport used to drive every branch of the client pipeline
//! without a server.
//!
//! `FakeTransport` answers every request with a canned response (or echoes
//! the request body back) and can be told to fail exactly one primitive.
//! It counts network calls, records the requests it executed, and notes
//! when the response body is dropped.

#![allow(dead_code)]

use std::io::{Cursor, Read};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use accounts_core::{
    Account, AccountsClient, BoxError, Envelope, HttpMethod, HttpRequest, HttpResponse, Transport,
};

pub const BASE_URL: &str = "http://accounts.test";

/// The primitive a `FakeTransport` should fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    Get,
    Post,
    BuildRequest,
    Execute,
    ReadAll,
    Serialize,
}

impl Fault {
    pub fn error(self) -> BoxError {
        format!("injected {self:?} failure").into()
    }
}

pub struct FakeTransport {
    status: u16,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
    echo: bool,
    fault: Option<Fault>,
    calls: AtomicUsize,
    released: Arc<AtomicBool>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl FakeTransport {
    pub fn responding(status: u16, content_type: Option<&str>, body: &[u8]) -> Self {
        Self {
            status,
            headers: content_type
                .map(|ct| vec![("Content-Type".to_string(), ct.to_string())])
                .unwrap_or_default(),
            body: body.to_vec(),
            echo: false,
            fault: None,
            calls: AtomicUsize::new(0),
            released: Arc::new(AtomicBool::new(false)),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Respond with the request's own body, as a server echoing a create.
    pub fn echoing(status: u16, content_type: Option<&str>) -> Self {
        Self {
            echo: true,
            ..Self::responding(status, content_type, b"")
        }
    }

    pub fn with_fault(mut self, fault: Fault) -> Self {
        self.fault = Some(fault);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn body_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn fails(&self, fault: Fault) -> bool {
        self.fault == Some(fault)
    }
}

impl Transport for FakeTransport {
    fn build_request(
        &self,
        method: HttpMethod,
        url: &str,
        body: Option<Vec<u8>>,
    ) -> Result<HttpRequest, BoxError> {
        if self.fails(Fault::BuildRequest) {
            return Err(Fault::BuildRequest.error());
        }
        Ok(HttpRequest {
            method,
            url: url.to_string(),
            headers: Vec::new(),
            body,
        })
    }

    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, BoxError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fails(Fault::Execute) {
            return Err(Fault::Execute.error());
        }
        let body = if self.echo {
            request.body.clone().unwrap_or_default()
        } else {
            self.body.clone()
        };
        self.requests.lock().unwrap().push(request);
        Ok(HttpResponse {
            status: self.status,
            headers: self.headers.clone(),
            body: Box::new(TrackedBody {
                inner: Cursor::new(body),
                released: Arc::clone(&self.released),
            }),
        })
    }

    fn get(&self, url: &str) -> Result<HttpResponse, BoxError> {
        if self.fails(Fault::Get) {
            self.calls.fetch_add(1, Ordering::SeqCst);
            return Err(Fault::Get.error());
        }
        let request = self.build_request(HttpMethod::Get, url, None)?;
        self.execute(request)
    }

    fn post(&self, url: &str, content_type: &str, body: Vec<u8>) -> Result<HttpResponse, BoxError> {
        if self.fails(Fault::Post) {
            self.calls.fetch_add(1, Ordering::SeqCst);
            return Err(Fault::Post.error());
        }
        let mut request = self.build_request(HttpMethod::Post, url, Some(body))?;
        request
            .headers
            .push(("Content-Type".to_string(), content_type.to_string()));
        self.execute(request)
    }

    fn read_all(&self, body: &mut dyn Read) -> Result<Vec<u8>, BoxError> {
        if self.fails(Fault::ReadAll) {
            return Err(Fault::ReadAll.error());
        }
        let mut buf = Vec::new();
        body.read_to_end(&mut buf)?;
        Ok(buf)
    }

    fn serialize(&self, envelope: &Envelope<&Account>) -> Result<Vec<u8>, BoxError> {
        if self.fails(Fault::Serialize) {
            return Err(Fault::Serialize.error());
        }
        Ok(serde_json::to_vec(envelope)?)
    }
}

/// Response body that records when it is dropped.
struct TrackedBody {
    inner: Cursor<Vec<u8>>,
    released: Arc<AtomicBool>,
}

impl Read for TrackedBody {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.inner.read(buf)
    }
}

impl Drop for TrackedBody {
    fn drop(&mut self) {
        self.released.store(true, Ordering::SeqCst);
    }
}

pub fn client(transport: FakeTransport) -> AccountsClient<FakeTransport> {
    AccountsClient::with_transport(BASE_URL, transport).unwrap()
}
