use std::io;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};
use tokio::time::{Instant, timeout_at};

use crate::http::request::{Request, RequestBuilder, RequestLine};

/// Longest request line (start line or header) accepted, excluding CRLF.
pub const MAX_LINE_LEN: usize = 8 * 1024;

/// Why a request could not be read.
///
/// Protocol variants describe a request the client did send but that the
/// server refuses; they carry the offending text for logging. Transport
/// variants record whether any byte of the request had arrived before the
/// read failed, which decides between a silent close and a 400.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("malformed start line {0:?}")]
    MalformedStartLine(String),
    #[error("unsupported method {0:?}")]
    UnsupportedMethod(String),
    #[error("invalid request target {0:?}")]
    InvalidTarget(String),
    #[error("unsupported protocol version {0:?}")]
    UnsupportedVersion(String),
    #[error("malformed header line {0:?}")]
    MalformedHeader(String),
    #[error("missing Host header")]
    MissingHost,
    #[error("more than one Host header")]
    DuplicateHost,
    #[error("read timed out")]
    Timeout { content_received: bool },
    #[error("connection closed by peer")]
    Eof { content_received: bool },
    #[error("read failed: {source}")]
    Io {
        source: io::Error,
        content_received: bool,
    },
}

impl ParseError {
    /// True for socket-level failures (timeout, EOF, I/O), false for
    /// requests that arrived but were rejected.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ParseError::Timeout { .. } | ParseError::Eof { .. } | ParseError::Io { .. }
        )
    }

    /// Whether any part of the request had been received when the error
    /// occurred. Always true for protocol errors.
    pub fn content_received(&self) -> bool {
        match self {
            ParseError::Timeout { content_received }
            | ParseError::Eof { content_received }
            | ParseError::Io {
                content_received, ..
            } => *content_received,
            _ => true,
        }
    }
}

enum LineError {
    TooLong(Vec<u8>),
    Transport(ParseError),
}

impl LineError {
    fn into_parse_error(self, malformed: fn(String) -> ParseError) -> ParseError {
        match self {
            LineError::TooLong(prefix) => malformed(lossy_prefix(&prefix)),
            LineError::Transport(e) => e,
        }
    }
}

fn lossy_prefix(bytes: &[u8]) -> String {
    const SHOWN: usize = 64;
    let mut text = String::from_utf8_lossy(&bytes[..bytes.len().min(SHOWN)]).into_owned();
    if bytes.len() > SHOWN {
        text.push_str("...");
    }
    text
}

/// Reads one CRLF-terminated line and strips the terminator.
///
/// A lone `\n` does not end a line. `received` is set as soon as any byte
/// has been read, including bytes of a line cut short by a timeout.
async fn read_line<R>(
    reader: &mut R,
    deadline: Instant,
    received: &mut bool,
) -> Result<Vec<u8>, LineError>
where
    R: AsyncBufRead + Unpin,
{
    let cap = MAX_LINE_LEN + 2;
    let mut line = Vec::new();

    loop {
        let limit = (cap - line.len()) as u64;
        let read = timeout_at(
            deadline,
            (&mut *reader).take(limit).read_until(b'\n', &mut line),
        )
        .await;

        // read_until appends partial data even when it is cut short
        *received |= !line.is_empty();

        match read {
            Err(_elapsed) => {
                return Err(LineError::Transport(ParseError::Timeout {
                    content_received: *received,
                }));
            }
            Ok(Err(source)) => {
                return Err(LineError::Transport(ParseError::Io {
                    source,
                    content_received: *received,
                }));
            }
            Ok(Ok(0)) => {
                return Err(LineError::Transport(ParseError::Eof {
                    content_received: *received,
                }));
            }
            Ok(Ok(_)) => {}
        }

        if line.ends_with(b"\r\n") {
            line.truncate(line.len() - 2);
            return Ok(line);
        }

        if line.len() >= cap {
            return Err(LineError::TooLong(line));
        }
    }
}

/// Splits a header line on its first colon and trims both halves.
///
/// # Example
///
/// ```
/// # use porter::http::parser::parse_header_line;
/// assert_eq!(parse_header_line("Host:  a.com ").unwrap(), ("Host", "a.com"));
/// assert!(parse_header_line("no colon here").is_err());
/// ```
pub fn parse_header_line(line: &str) -> Result<(&str, &str), ParseError> {
    let (key, value) = line
        .split_once(':')
        .ok_or_else(|| ParseError::MalformedHeader(line.to_string()))?;

    let key = key.trim();
    if key.is_empty() {
        return Err(ParseError::MalformedHeader(line.to_string()));
    }

    Ok((key, value.trim()))
}

/// Reads and validates one request from `reader`.
///
/// Every read must finish before `deadline`. Parsing stops at the first
/// malformed line; a missing `Host` is only reported once the blank line
/// closing the header block has been read.
pub async fn read_request<R>(reader: &mut R, deadline: Instant) -> Result<Request, ParseError>
where
    R: AsyncBufRead + Unpin,
{
    let mut received = false;

    let start = read_line(reader, deadline, &mut received)
        .await
        .map_err(|e| e.into_parse_error(ParseError::MalformedStartLine))?;
    let start = String::from_utf8(start)
        .map_err(|e| ParseError::MalformedStartLine(lossy_prefix(e.as_bytes())))?;

    let mut builder = RequestBuilder::new(RequestLine::parse(&start)?);

    loop {
        let line = read_line(reader, deadline, &mut received)
            .await
            .map_err(|e| e.into_parse_error(ParseError::MalformedHeader))?;

        if line.is_empty() {
            break;
        }

        let line = String::from_utf8(line)
            .map_err(|e| ParseError::MalformedHeader(lossy_prefix(e.as_bytes())))?;
        let (key, value) = parse_header_line(&line)?;
        builder = builder.header(key, value);
    }

    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn deadline() -> Instant {
        Instant::now() + Duration::from_secs(5)
    }

    #[tokio::test]
    async fn parse_simple_get() {
        let mut req: &[u8] = b"GET / HTTP/1.1\r\nHost: example.com\r\n\r\n";

        let parsed = read_request(&mut req, deadline()).await.unwrap();

        assert_eq!(parsed.target(), "/");
        assert_eq!(parsed.host(), "example.com");
        assert!(parsed.headers().is_empty());
        assert!(req.is_empty());
    }

    #[tokio::test]
    async fn bare_newline_does_not_end_a_line() {
        let mut req: &[u8] = b"GET / HTTP/1.1\r\nX-Odd: a\nb\r\nHost: h\r\n\r\n";

        let parsed = read_request(&mut req, deadline()).await.unwrap();

        assert_eq!(parsed.header("X-Odd"), Some("a\nb"));
    }

    #[tokio::test]
    async fn overlong_header_is_malformed() {
        let mut raw = b"GET / HTTP/1.1\r\nX-Big: ".to_vec();
        raw.extend(std::iter::repeat_n(b'a', MAX_LINE_LEN + 10));
        raw.extend_from_slice(b"\r\nHost: h\r\n\r\n");
        let mut req: &[u8] = &raw;

        let err = read_request(&mut req, deadline()).await.unwrap_err();

        assert!(matches!(err, ParseError::MalformedHeader(ref l) if l.ends_with("...")));
    }

    #[tokio::test]
    async fn eof_before_anything_is_not_content() {
        let mut req: &[u8] = b"";

        let err = read_request(&mut req, deadline()).await.unwrap_err();

        assert!(matches!(err, ParseError::Eof { content_received: false }));
        assert!(err.is_transport());
    }

    #[test]
    fn header_without_key_is_malformed() {
        assert!(matches!(
            parse_header_line(": value"),
            Err(ParseError::MalformedHeader(_))
        ));
    }
}
