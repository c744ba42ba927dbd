use bytes::{Buf, BufMut, BytesMut};
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::http::response::Response;

/// Serializes the status line and header block, up to and including the
/// blank line that ends it.
pub fn serialize_head(resp: &Response) -> BytesMut {
    let mut buf = BytesMut::with_capacity(256);

    // Status line
    let status_line = format!(
        "{} {} {}\r\n",
        resp.version(),
        resp.status().as_u16(),
        resp.status().reason_phrase()
    );
    buf.put_slice(status_line.as_bytes());

    // Headers, already sorted by key
    for (k, v) in resp.headers() {
        buf.put_slice(k.as_bytes());
        buf.put_slice(b": ");
        buf.put_slice(v.as_bytes());
        buf.put_slice(b"\r\n");
    }

    // Header/body separator
    buf.put_slice(b"\r\n");

    buf
}

/// The full wire bytes of one response.
///
/// The body file is read into memory when the writer is prepared, so a file
/// that vanished after it was resolved fails here, before a single byte of
/// the response has been sent.
#[derive(Debug)]
pub struct ResponseWriter {
    buffer: BytesMut,
}

impl ResponseWriter {
    pub async fn prepare(response: &Response) -> std::io::Result<Self> {
        let mut buffer = serialize_head(response);

        if let Some(path) = response.file() {
            let body = tokio::fs::read(path).await?;
            buffer.put_slice(&body);
        }

        Ok(Self { buffer })
    }

    pub async fn write_to_stream<W>(&mut self, stream: &mut W) -> anyhow::Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        while self.buffer.has_remaining() {
            let n = stream.write(&self.buffer).await?;

            if n == 0 {
                return Err(anyhow::anyhow!("connection closed while writing"));
            }

            self.buffer.advance(n);
        }

        stream.flush().await?;
        Ok(())
    }
}
