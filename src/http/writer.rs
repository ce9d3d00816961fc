use bytes::Bytes;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::http::framer::FramingError;
use crate::http::response::Response;

const HTTP_VERSION: &str = "HTTP/1.0";

/// Sent verbatim when a client asks for a persistent connection.
pub const KEEP_ALIVE_REJECTION: &[u8] = b"HTTP/1.0 200 OK\r\n\r\n\
This server does not support keep-alive requests and is meant to be reached through a reverse proxy";

/// Sent when the Content-Length header cannot be honoured.
pub const BAD_REQUEST_REJECTION: &[u8] = b"HTTP/1.0 400 Bad Request\r\n\r\n\
Invalid Content-Length";

/// Sent when the request grows past the configured limit.
pub const TOO_LARGE_REJECTION: &[u8] = b"HTTP/1.0 413 Payload Too Large\r\n\r\n\
Request too large";

/// Fixed reply for a request the framer refused.
pub fn rejection_for(error: &FramingError) -> Bytes {
    match error {
        FramingError::TooLarge { .. } => Bytes::from_static(TOO_LARGE_REJECTION),
        FramingError::NegativeContentLength(_) | FramingError::ContentLengthOutOfRange => {
            Bytes::from_static(BAD_REQUEST_REJECTION)
        }
    }
}

/// Renders `resp` as HTTP/1.0 wire bytes.
///
/// Every rendered response carries `Connection: close`; headers are written
/// in name order so the output is stable.
pub fn serialize_response(resp: &Response) -> Vec<u8> {
    let mut buf = Vec::with_capacity(128 + resp.body.len());

    // Status line
    let status_line = format!(
        "{} {} {}\r\n",
        HTTP_VERSION,
        resp.status.as_u16(),
        resp.status.reason_phrase()
    );
    buf.extend_from_slice(status_line.as_bytes());

    let mut headers: Vec<_> = resp
        .headers
        .iter()
        .filter(|(k, _)| !k.eq_ignore_ascii_case("Connection"))
        .collect();
    headers.sort_by(|a, b| a.0.cmp(b.0));

    for (k, v) in headers {
        buf.extend_from_slice(k.as_bytes());
        buf.extend_from_slice(b": ");
        buf.extend_from_slice(v.as_bytes());
        buf.extend_from_slice(b"\r\n");
    }
    buf.extend_from_slice(b"Connection: close\r\n");

    // Header/body separator
    buf.extend_from_slice(b"\r\n");

    buf.extend_from_slice(&resp.body);

    buf
}

/// Writes a fixed payload to a stream, tracking partial progress.
pub struct ResponseWriter {
    buffer: Bytes,
    written: usize,
}

impl ResponseWriter {
    pub fn new(payload: Bytes) -> Self {
        Self {
            buffer: payload,
            written: 0,
        }
    }

    pub fn written(&self) -> usize {
        self.written
    }

    pub async fn write_to_stream<W>(&mut self, stream: &mut W) -> anyhow::Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        while self.written < self.buffer.len() {
            let n = stream.write(&self.buffer[self.written..]).await?;

            if n == 0 {
                return Err(anyhow::anyhow!("connection closed while writing"));
            }

            self.written += n;
        }

        stream.flush().await?;
        Ok(())
    }
}
