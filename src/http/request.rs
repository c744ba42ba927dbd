use std::collections::HashMap;

use crate::http::headers::canonical_header_key;
use crate::http::parser::ParseError;

/// The only protocol version the server speaks.
pub const HTTP_VERSION: &str = "HTTP/1.1";

/// HTTP request methods.
///
/// The server only retrieves documents, so GET is the single supported verb.
/// Anything else is rejected while parsing the start line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// GET - Retrieve a resource
    GET,
}

impl Method {
    /// Parses an HTTP method from a string.
    ///
    /// Matching is case-sensitive, as required for method tokens.
    ///
    /// # Example
    ///
    /// ```
    /// # use porter::http::request::Method;
    /// assert_eq!(Method::from_str("GET"), Some(Method::GET));
    /// assert_eq!(Method::from_str("get"), None);
    /// assert_eq!(Method::from_str("POST"), None);
    /// ```
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "GET" => Some(Method::GET),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::GET => "GET",
        }
    }
}

/// A validated request start line (`GET /path HTTP/1.1`).
///
/// The only way to obtain one is [`RequestLine::parse`], so every
/// [`Request`] is built on a line whose method, target and version have
/// already been checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine {
    method: Method,
    target: String,
    version: String,
}

impl RequestLine {
    /// Parses and validates a start line.
    ///
    /// The line must consist of exactly three tokens separated by single
    /// spaces. A different token count is a [`ParseError::MalformedStartLine`];
    /// a well-formed line with an unsupported method, a target not starting
    /// with `/`, or a version other than `HTTP/1.1` gets its own variant.
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        let parts: Vec<&str> = line.split(' ').collect();
        let [method, target, version] = parts[..] else {
            return Err(ParseError::MalformedStartLine(line.to_string()));
        };

        let method = Method::from_str(method)
            .ok_or_else(|| ParseError::UnsupportedMethod(method.to_string()))?;

        if !target.starts_with('/') {
            return Err(ParseError::InvalidTarget(target.to_string()));
        }

        if version != HTTP_VERSION {
            return Err(ParseError::UnsupportedVersion(version.to_string()));
        }

        Ok(Self {
            method,
            target: target.to_string(),
            version: version.to_string(),
        })
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn target(&self) -> &str {
        &self.target
    }
}

/// A parsed, validated HTTP request.
///
/// `Host` and `Connection: close` are lifted out of the header map into
/// [`Request::host`] and [`Request::close`]. Once built a request is never
/// modified; the resolver and response builder only borrow it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    method: Method,
    target: String,
    version: String,
    headers: HashMap<String, String>,
    host: String,
    close: bool,
}

/// Builder for constructing Request objects.
///
/// Headers are fed one line at a time while the parser walks the header
/// block; [`RequestBuilder::build`] checks the host requirement once the
/// block is complete.
///
/// # Example
///
/// ```
/// # use porter::http::request::{RequestBuilder, RequestLine};
/// let line = RequestLine::parse("GET /index.html HTTP/1.1").unwrap();
/// let req = RequestBuilder::new(line)
///     .header("host", "a.com")
///     .header("accept", "*/*")
///     .build()
///     .unwrap();
///
/// assert_eq!(req.host(), "a.com");
/// assert_eq!(req.header("Accept"), Some("*/*"));
/// ```
#[derive(Debug)]
pub struct RequestBuilder {
    line: RequestLine,
    headers: HashMap<String, String>,
    host: Option<String>,
    duplicate_host: bool,
    close: bool,
}

impl RequestBuilder {
    pub fn new(line: RequestLine) -> Self {
        Self {
            line,
            headers: HashMap::new(),
            host: None,
            duplicate_host: false,
            close: false,
        }
    }

    /// Records one header. Key and value are trimmed and the key is
    /// canonicalized before it is stored.
    pub fn header(mut self, key: &str, value: &str) -> Self {
        let key = canonical_header_key(key.trim());
        let value = value.trim();

        match key.as_str() {
            "Host" => {
                if self.host.replace(value.to_string()).is_some() {
                    self.duplicate_host = true;
                }
            }
            "Connection" if value.eq_ignore_ascii_case("close") => {
                self.close = true;
            }
            _ => {
                self.headers.insert(key, value.to_string());
            }
        }
        self
    }

    pub fn build(self) -> Result<Request, ParseError> {
        if self.duplicate_host {
            return Err(ParseError::DuplicateHost);
        }
        let host = self.host.ok_or(ParseError::MissingHost)?;

        Ok(Request {
            method: self.line.method,
            target: self.line.target,
            version: self.line.version,
            headers: self.headers,
            host,
            close: self.close,
        })
    }
}

impl Request {
    pub fn method(&self) -> Method {
        self.method
    }

    /// The request target as sent, e.g. `/docs/` or `/index.html`.
    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// The `Host` header value, used to pick the virtual host.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// True if the client sent `Connection: close`.
    pub fn close(&self) -> bool {
        self.close
    }

    /// All headers except `Host` and `Connection: close`, keyed by
    /// canonical name.
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Retrieves a header value by name, ignoring case.
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .get(&canonical_header_key(key))
            .map(|v| v.as_str())
    }
}
