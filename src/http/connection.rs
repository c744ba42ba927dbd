use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::time::Instant;

use crate::http::parser::read_request;
use crate::http::request::Request;
use crate::http::response::Response;
use crate::http::writer::ResponseWriter;
use crate::vhost::{self, VirtualHosts};

pub struct Connection<S> {
    stream: BufReader<S>,
    hosts: Arc<VirtualHosts>,
    read_timeout: Duration,
    state: ConnectionState,
}

#[derive(Debug)]
pub enum ConnectionState {
    AwaitRequest,
    Processing(Request),
    RespondAndContinue(Response),
    RespondAndClose(Response),
    Closed,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, hosts: Arc<VirtualHosts>, read_timeout: Duration) -> Self {
        Self {
            stream: BufReader::new(stream),
            hosts,
            read_timeout,
            state: ConnectionState::AwaitRequest,
        }
    }

    /// Serves requests until the connection is done, then shuts the stream
    /// down. The stream is closed exactly once whichever way the loop ends;
    /// an error means a response could not be written.
    pub async fn run(mut self) -> anyhow::Result<()> {
        let result = self.drive().await;

        if let Err(e) = self.stream.get_mut().shutdown().await {
            tracing::debug!(error = %e, "Shutdown failed");
        }

        result
    }

    async fn drive(&mut self) -> anyhow::Result<()> {
        loop {
            let state = std::mem::replace(&mut self.state, ConnectionState::Closed);

            self.state = match state {
                ConnectionState::AwaitRequest => self.await_request().await,

                ConnectionState::Processing(req) => {
                    let response = vhost::respond(req, &self.hosts).await;
                    if response.closes_connection() {
                        ConnectionState::RespondAndClose(response)
                    } else {
                        ConnectionState::RespondAndContinue(response)
                    }
                }

                ConnectionState::RespondAndContinue(response) => {
                    self.write_response(&response).await?;
                    ConnectionState::AwaitRequest // go back for next request
                }

                ConnectionState::RespondAndClose(response) => {
                    self.write_response(&response).await?;
                    ConnectionState::Closed
                }

                ConnectionState::Closed => return Ok(()),
            };
        }
    }

    async fn await_request(&mut self) -> ConnectionState {
        let deadline = Instant::now() + self.read_timeout;

        match read_request(&mut self.stream, deadline).await {
            Ok(req) => {
                tracing::debug!(
                    host = %req.host(),
                    target = %req.target(),
                    close = req.close(),
                    "Request received"
                );
                ConnectionState::Processing(req)
            }

            // Nothing arrived: idle timeout or the client hung up
            Err(e) if e.is_transport() && !e.content_received() => {
                tracing::debug!(error = %e, "Closing connection without response");
                ConnectionState::Closed
            }

            Err(e) => {
                tracing::warn!(error = %e, "Bad request");
                ConnectionState::RespondAndClose(Response::bad_request())
            }
        }
    }

    async fn write_response(&mut self, response: &Response) -> anyhow::Result<()> {
        let mut writer = ResponseWriter::prepare(response)
            .await
            .context("failed to read response body")?;

        writer
            .write_to_stream(self.stream.get_mut())
            .await
            .context("failed to write response")?;

        match response.request() {
            Some(req) => tracing::info!(
                status = response.status().as_u16(),
                host = %req.host(),
                target = %req.target(),
                "Response sent"
            ),
            None => tracing::info!(status = response.status().as_u16(), "Response sent"),
        }

        Ok(())
    }
}
