//! Handshake rejection responses.
//!
//! # Responsibilities
//! - Describe a refused handshake (status, headers, body)
//! - Normalize bare integer status codes into `StatusCode`
//! - Build the fixed response for unmatched paths
//!
//! # Design Decisions
//! - Hooks may hand back a plain `u16`; it is checked once, at the gate,
//!   and an invalid code is a `StatusError` instead of a broken response
//! - Rejections never carry a body type other than bytes

use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::Response;
use thiserror::Error;

/// Body sent with the 404 for unmatched paths.
pub const NOT_FOUND_BODY: &[u8] = b"not found\n";

/// A status code returned by a hook, possibly not yet validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Code(StatusCode),
    Raw(u16),
}

impl Status {
    /// Convert to a `StatusCode`, validating raw integers.
    pub fn normalize(self) -> Result<StatusCode, StatusError> {
        match self {
            Status::Code(code) => Ok(code),
            Status::Raw(raw) => StatusCode::from_u16(raw).map_err(|_| StatusError(raw)),
        }
    }
}

impl From<StatusCode> for Status {
    fn from(code: StatusCode) -> Self {
        Status::Code(code)
    }
}

impl From<u16> for Status {
    fn from(raw: u16) -> Self {
        Status::Raw(raw)
    }
}

/// A hook produced a status code outside 100..=999.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("invalid handshake status code {0}")]
pub struct StatusError(pub u16);

/// A refused handshake: the connection is answered over HTTP and never upgrades.
#[derive(Debug, Clone)]
pub struct Rejection {
    status: Status,
    headers: HeaderMap,
    body: Bytes,
}

impl Rejection {
    pub fn new(status: impl Into<Status>, body: impl Into<Bytes>) -> Self {
        Self {
            status: status.into(),
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    /// Add a response header.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Replace all response headers.
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Validate the status and build the HTTP response.
    pub fn try_into_response(self) -> Result<Response, StatusError> {
        let status = self.status.normalize()?;
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = status;
        *response.headers_mut() = self.headers;
        Ok(response)
    }
}

/// The response for a path that matched no route.
pub fn not_found() -> Response {
    let mut response = Response::new(Body::from(NOT_FOUND_BODY));
    *response.status_mut() = StatusCode::NOT_FOUND;
    response
}
