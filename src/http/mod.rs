//! HTTP protocol implementation.
//!
//! This module implements the HTTP/1.1 side of a static file server with
//! support for keep-alive connections.
//!
//! # Architecture
//!
//! The HTTP layer is organized into several submodules:
//!
//! - **`connection`**: The per-connection request/response state machine
//! - **`parser`**: Reads CRLF lines off the stream and parses them into a request
//! - **`request`**: HTTP request representation and start line validation
//! - **`headers`**: Header name canonicalization
//! - **`response`**: HTTP response representation with builder pattern
//! - **`writer`**: Serializes and writes HTTP responses to the client
//! - **`mime`**: MIME type detection based on file extensions
//!
//! # Connection State Machine
//!
//! Each client connection goes through a state machine:
//!
//! ```text
//!        ┌──────────────────┐
//!        │  AwaitRequest    │ ← Arm read deadline, parse one request
//!        └──────┬───────────┘
//!               │ Request parsed        (nothing received → Closed)
//!               ▼                        (bad request → 400, RespondAndClose)
//!        ┌──────────────────┐
//!        │   Processing     │ ← Resolve file, build 200/404
//!        └──────┬───────────┘
//!               │ Response ready
//!               ├─ RespondAndContinue → write → AwaitRequest (same connection)
//!               └─ RespondAndClose    → write → Closed
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//! use porter::config::DEFAULT_READ_TIMEOUT_SECS;
//! use porter::http::connection::Connection;
//! use porter::vhost::VirtualHosts;
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let hosts = Arc::new(VirtualHosts::validate([("a.com", "/srv/a")])?);
//!     let listener = TcpListener::bind("127.0.0.1:8080").await?;
//!     let read_timeout = Duration::from_secs(DEFAULT_READ_TIMEOUT_SECS);
//!
//!     loop {
//!         let (socket, _addr) = listener.accept().await?;
//!         let conn = Connection::new(socket, hosts.clone(), read_timeout);
//!         tokio::spawn(async move {
//!             if let Err(e) = conn.run().await {
//!                 eprintln!("Connection error: {}", e);
//!             }
//!         });
//!     }
//! }
//! ```

pub mod request;
pub mod response;
pub mod parser;
pub mod connection;
pub mod writer;
pub mod headers;
pub mod mime;
