use std::collections::HashMap;

use bytes::Bytes;

use crate::http::writer::serialize_response;
use crate::server::registry::ConnectionId;

/// HTTP status codes the response model knows how to render.
///
/// - `Ok` (200): Request successful
/// - `NoContent` (204): Successful request with no content
/// - `BadRequest` (400): Malformed request
/// - `NotFound` (404): Resource not found
/// - `MethodNotAllowed` (405): HTTP method not supported
/// - `PayloadTooLarge` (413): Request exceeds the configured size limit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    /// 200 OK
    Ok,
    /// 204 No Content
    NoContent,
    /// 400 Bad Request
    BadRequest,
    /// 404 Not Found
    NotFound,
    /// 405 Method Not Allowed
    MethodNotAllowed,
    /// 413 Payload Too Large
    PayloadTooLarge,
}

impl StatusCode {
    /// Returns the numeric HTTP status code.
    ///
    /// # Example
    ///
    /// ```
    /// # use rawframe::http::response::StatusCode;
    /// assert_eq!(StatusCode::Ok.as_u16(), 200);
    /// assert_eq!(StatusCode::PayloadTooLarge.as_u16(), 413);
    /// ```
    pub fn as_u16(&self) -> u16 {
        match self {
            StatusCode::Ok => 200,
            StatusCode::NoContent => 204,
            StatusCode::BadRequest => 400,
            StatusCode::NotFound => 404,
            StatusCode::MethodNotAllowed => 405,
            StatusCode::PayloadTooLarge => 413,
        }
    }

    /// Returns the standard HTTP reason phrase for this status code.
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::NoContent => "No Content",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::NotFound => "Not Found",
            StatusCode::MethodNotAllowed => "Method Not Allowed",
            StatusCode::PayloadTooLarge => "Payload Too Large",
        }
    }
}

/// A structured HTTP response, rendered to bytes on dispatch.
#[derive(Debug, Clone)]
pub struct Response {
    /// The HTTP status code
    pub status: StatusCode,
    /// HTTP headers as key-value pairs
    pub headers: HashMap<String, String>,
    /// Response body as bytes
    pub body: Vec<u8>,
}

/// Builder for constructing HTTP responses in a fluent style.
///
/// # Example
///
/// ```
/// # use rawframe::http::response::{ResponseBuilder, StatusCode};
/// let response = ResponseBuilder::new(StatusCode::Ok)
///     .header("Content-Type", "application/json")
///     .body(b"{}".to_vec())
///     .build();
/// assert_eq!(response.headers.get("Content-Length").unwrap(), "2");
/// ```
pub struct ResponseBuilder {
    status: StatusCode,
    headers: HashMap<String, String>,
    body: Vec<u8>,
}

impl ResponseBuilder {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: Vec::new(),
        }
    }

    /// Adds or replaces a header.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Builds the final Response.
    ///
    /// Adds a Content-Length header matching the body unless one was set.
    pub fn build(mut self) -> Response {
        self.headers
            .entry("Content-Length".to_string())
            .or_insert_with(|| self.body.len().to_string());

        Response {
            status: self.status,
            headers: self.headers,
            body: self.body,
        }
    }
}

impl Response {
    /// Creates a simple 200 OK response with the given body.
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        ResponseBuilder::new(StatusCode::Ok).body(body).build()
    }

    pub fn bad_request() -> Self {
        ResponseBuilder::new(StatusCode::BadRequest)
            .body(b"400 Bad Request".to_vec())
            .build()
    }

    pub fn not_found() -> Self {
        ResponseBuilder::new(StatusCode::NotFound)
            .body(b"404 Not Found".to_vec())
            .build()
    }
}

/// Anything the dispatcher can deliver: a target connection plus the exact
/// bytes to write to it.
pub trait Deliverable {
    /// Connection this response answers.
    fn id(&self) -> ConnectionId;

    /// Wire bytes written verbatim before the connection is closed.
    fn render(&self) -> Bytes;
}

/// A response whose wire bytes were produced elsewhere.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub id: ConnectionId,
    pub payload: Bytes,
}

impl RawResponse {
    pub fn new(id: ConnectionId, payload: impl Into<Bytes>) -> Self {
        Self {
            id,
            payload: payload.into(),
        }
    }
}

impl Deliverable for RawResponse {
    fn id(&self) -> ConnectionId {
        self.id
    }

    fn render(&self) -> Bytes {
        self.payload.clone()
    }
}

/// A structured [`Response`] addressed to a connection.
#[derive(Debug, Clone)]
pub struct Reply {
    pub id: ConnectionId,
    pub response: Response,
}

impl Reply {
    pub fn new(id: ConnectionId, response: Response) -> Self {
        Self { id, response }
    }
}

impl Deliverable for Reply {
    fn id(&self) -> ConnectionId {
        self.id
    }

    fn render(&self) -> Bytes {
        Bytes::from(serialize_response(&self.response))
    }
}
