use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::http::mime;
use crate::http::request::{HTTP_VERSION, Request};
use crate::vhost::ResolvedFile;

/// HTTP status codes the server emits.
///
/// - `Ok` (200): the requested file is sent as the body
/// - `BadRequest` (400): the request was malformed or unsupported
/// - `NotFound` (404): no file for that host and target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    /// 200 OK
    Ok,
    /// 400 Bad Request
    BadRequest,
    /// 404 Not Found
    NotFound,
}

impl StatusCode {
    /// Returns the numeric HTTP status code.
    ///
    /// # Example
    ///
    /// ```
    /// # use porter::http::response::StatusCode;
    /// assert_eq!(StatusCode::Ok.as_u16(), 200);
    /// assert_eq!(StatusCode::NotFound.as_u16(), 404);
    /// ```
    pub fn as_u16(&self) -> u16 {
        match self {
            StatusCode::Ok => 200,
            StatusCode::BadRequest => 400,
            StatusCode::NotFound => 404,
        }
    }

    /// Returns the standard HTTP reason phrase for this status code.
    ///
    /// # Example
    ///
    /// ```
    /// # use porter::http::response::StatusCode;
    /// assert_eq!(StatusCode::Ok.reason_phrase(), "OK");
    /// assert_eq!(StatusCode::BadRequest.reason_phrase(), "Bad Request");
    /// ```
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::NotFound => "Not Found",
        }
    }
}

/// Formats a timestamp as an HTTP date (`Sun, 06 Nov 1994 08:49:37 GMT`).
pub fn http_date(time: SystemTime) -> String {
    httpdate::fmt_http_date(time)
}

/// A complete HTTP response, ready for the [`ResponseWriter`].
///
/// The body is never held here: `file` names the document to send and the
/// writer reads it when the response goes out.
///
/// [`ResponseWriter`]: crate::http::writer::ResponseWriter
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    headers: BTreeMap<String, String>,
    request: Option<Request>,
    file: Option<PathBuf>,
}

impl Response {
    /// A 400 response. It is not tied to any request and carries only a
    /// `Date` header.
    pub fn bad_request() -> Self {
        let mut headers = BTreeMap::new();
        headers.insert("Date".to_string(), http_date(SystemTime::now()));

        Self {
            status: StatusCode::BadRequest,
            headers,
            request: None,
            file: None,
        }
    }

    pub fn version(&self) -> &'static str {
        HTTP_VERSION
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Headers in the order they are written: ascending by name.
    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key).map(|v| v.as_str())
    }

    /// The request this response answers, if it answers a valid one.
    pub fn request(&self) -> Option<&Request> {
        self.request.as_ref()
    }

    /// The file whose contents form the body, if any.
    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    /// True if the client asked for the connection to be closed after this
    /// response.
    pub fn closes_connection(&self) -> bool {
        self.request.as_ref().is_some_and(Request::close)
    }
}

/// Accumulates the headers for the answer to one request.
///
/// `Date` and, when the request carries the close-flag, `Connection: close`
/// are set up front. Exactly one of [`ok`](Self::ok) or
/// [`not_found`](Self::not_found) consumes the builder and yields the
/// finished [`Response`].
///
/// # Example
///
/// ```
/// # use porter::http::request::{RequestBuilder, RequestLine};
/// # use porter::http::response::{ResponseBuilder, StatusCode};
/// let req = RequestBuilder::new(RequestLine::parse("GET /nope HTTP/1.1").unwrap())
///     .header("Host", "a.com")
///     .header("Connection", "close")
///     .build()
///     .unwrap();
///
/// let response = ResponseBuilder::new(req).not_found();
///
/// assert_eq!(response.status(), StatusCode::NotFound);
/// assert_eq!(response.header("Connection"), Some("close"));
/// assert!(response.file().is_none());
/// ```
#[derive(Debug)]
pub struct ResponseBuilder {
    request: Request,
    headers: BTreeMap<String, String>,
}

impl ResponseBuilder {
    pub fn new(request: Request) -> Self {
        let mut headers = BTreeMap::new();
        headers.insert("Date".to_string(), http_date(SystemTime::now()));
        if request.close() {
            headers.insert("Connection".to_string(), "close".to_string());
        }

        Self { request, headers }
    }

    /// 200 with the resolved file as body.
    pub fn ok(mut self, file: ResolvedFile) -> Response {
        self.headers
            .insert("Last-Modified".to_string(), http_date(file.modified));
        self.headers
            .insert("Content-Type".to_string(), mime::content_type(&file.path));
        self.headers
            .insert("Content-Length".to_string(), file.len.to_string());

        self.finish(StatusCode::Ok, Some(file.path))
    }

    /// 404 without a body.
    pub fn not_found(self) -> Response {
        self.finish(StatusCode::NotFound, None)
    }

    fn finish(self, status: StatusCode, file: Option<PathBuf>) -> Response {
        Response {
            status,
            headers: self.headers,
            request: Some(self.request),
            file,
        }
    }
}
