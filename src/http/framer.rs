//! Incremental HTTP/1.x request framing.
//!
//! [`RequestBuffer`] accumulates the raw bytes of a single connection and
//! decides, after every chunk, whether a complete request (headers plus the
//! body announced by `Content-Length`) has arrived. It performs no I/O; the
//! connection task feeds it and acts on the returned [`Framing`].
//!
//! Header inspection works on raw bytes. Header syntax is pure ASCII, so
//! matching bytes is equivalent to matching an ASCII decoding of the buffer
//! and never trips over a multibyte UTF-8 sequence split across two reads.
//! The emitted request, on the other hand, is the UTF-8 decoding of the whole
//! buffer, taken once the request is complete.

use bytes::BytesMut;

/// Why a buffered request was refused without being emitted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FramingError {
    #[error("negative Content-Length: {0}")]
    NegativeContentLength(i64),
    #[error("Content-Length out of range")]
    ContentLengthOutOfRange,
    #[error("request exceeds {limit} bytes")]
    TooLarge { limit: usize },
}

/// Result of feeding a chunk into a [`RequestBuffer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Framing {
    /// Headers or body still incomplete.
    Incomplete,
    /// A full request arrived. Carries the UTF-8 request text.
    Complete(String),
    /// The client asked for `Connection: keep-alive`.
    KeepAliveRejected,
    /// The request cannot be framed.
    Rejected(FramingError),
    /// A result was already produced for this connection; the chunk was dropped.
    Ignored,
}

/// Position of the blank line separating headers from body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderEnd {
    /// Index of the first byte of the terminator.
    pub offset: usize,
    /// Terminator width: 4 for `\r\n\r\n`, 2 for `\n\n`.
    pub line_break: usize,
}

impl HeaderEnd {
    /// Number of bytes buffered past the terminator.
    pub fn body_len(&self, buffered: usize) -> usize {
        buffered.saturating_sub(self.offset + self.line_break)
    }
}

/// Per-connection request accumulator.
#[derive(Debug)]
pub struct RequestBuffer {
    raw: BytesMut,
    max_bytes: usize,
    done: bool,
}

impl RequestBuffer {
    pub fn new(max_bytes: usize) -> Self {
        Self {
            raw: BytesMut::with_capacity(4096),
            max_bytes,
            done: false,
        }
    }

    /// Appends `chunk` and re-evaluates the framing state.
    ///
    /// At most one non-`Incomplete` outcome is ever returned; every later
    /// call yields [`Framing::Ignored`] without touching the buffer.
    pub fn push(&mut self, chunk: &[u8]) -> Framing {
        if self.done {
            return Framing::Ignored;
        }

        self.raw.extend_from_slice(chunk);

        let outcome = self.evaluate();
        if outcome != Framing::Incomplete {
            self.done = true;
        }
        outcome
    }

    /// Bytes buffered so far.
    pub fn buffered_len(&self) -> usize {
        self.raw.len()
    }

    /// Whether a final outcome has already been produced.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Lossy ASCII view of the buffer, used as context in log lines.
    pub fn ascii_lossy(&self) -> String {
        self.raw
            .iter()
            .map(|&b| if b.is_ascii() { b as char } else { '?' })
            .collect()
    }

    fn evaluate(&self) -> Framing {
        let Some(end) = find_header_end(&self.raw) else {
            if self.raw.len() > self.max_bytes {
                return Framing::Rejected(FramingError::TooLarge {
                    limit: self.max_bytes,
                });
            }
            return Framing::Incomplete;
        };

        let headers = &self.raw[..end.offset];

        if wants_keep_alive(headers) {
            return Framing::KeepAliveRejected;
        }

        let declared = match declared_content_length(headers) {
            None => return self.complete(),
            Some(Ok(n)) if n < 0 => {
                return Framing::Rejected(FramingError::NegativeContentLength(n));
            }
            Some(Ok(n)) => n as u64,
            Some(Err(e)) => return Framing::Rejected(e),
        };

        let head_len = (end.offset + end.line_break) as u64;
        if head_len.saturating_add(declared) > self.max_bytes as u64 {
            return Framing::Rejected(FramingError::TooLarge {
                limit: self.max_bytes,
            });
        }

        if end.body_len(self.raw.len()) as u64 >= declared {
            self.complete()
        } else {
            Framing::Incomplete
        }
    }

    fn complete(&self) -> Framing {
        Framing::Complete(String::from_utf8_lossy(&self.raw).into_owned())
    }
}

/// Finds the first header terminator, accepting both CRLF and bare LF framing.
pub fn find_header_end(buf: &[u8]) -> Option<HeaderEnd> {
    (0..buf.len()).find_map(|i| {
        let rest = &buf[i..];
        if rest.starts_with(b"\r\n\r\n") {
            Some(HeaderEnd {
                offset: i,
                line_break: 4,
            })
        } else if rest.starts_with(b"\n\n") {
            Some(HeaderEnd {
                offset: i,
                line_break: 2,
            })
        } else {
            None
        }
    })
}

/// True if the header block contains `Connection: keep-alive`.
///
/// Header name and value are matched case-insensitively; at most one
/// whitespace byte may follow the colon. Only `headers` is searched, so a
/// body that happens to contain the same text is not treated as a
/// keep-alive request, unlike a scan over the whole buffered request.
pub fn wants_keep_alive(headers: &[u8]) -> bool {
    header_values(headers, b"connection")
        .any(|value| starts_with_ignore_case(value, b"keep-alive"))
}

/// Value of the first well-formed `Content-Length` header.
///
/// Returns `None` when no `Content-Length` line carries a number. Negative
/// values are passed through for the caller to judge.
pub fn declared_content_length(headers: &[u8]) -> Option<Result<i64, FramingError>> {
    header_values(headers, b"content-length").find_map(|value| {
        let digits_from = usize::from(value.first() == Some(&b'-'));
        let digits = value[digits_from..]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count();
        if digits == 0 {
            return None;
        }

        let text = &value[..digits_from + digits];
        // ASCII digits with an optional sign are always valid UTF-8
        let parsed = std::str::from_utf8(text)
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
            .ok_or(FramingError::ContentLengthOutOfRange);
        Some(parsed)
    })
}

/// Iterates the raw values of every header line named `name`.
///
/// A header line must start right after a `\n`, so the request line never
/// matches. The yielded slice starts after the colon and at most one
/// whitespace byte, and runs to the end of `headers`.
fn header_values<'a>(headers: &'a [u8], name: &'a [u8]) -> impl Iterator<Item = &'a [u8]> + 'a {
    headers
        .iter()
        .enumerate()
        .filter(|&(_, &b)| b == b'\n')
        .filter_map(move |(i, _)| {
            let line = &headers[i + 1..];
            if !starts_with_ignore_case(line, name) {
                return None;
            }
            let after_name = &line[name.len()..];
            let value = after_name.strip_prefix(b":")?;
            match value.first() {
                Some(b) if is_regex_space(*b) => Some(&value[1..]),
                _ => Some(value),
            }
        })
}

fn starts_with_ignore_case(haystack: &[u8], prefix: &[u8]) -> bool {
    haystack.len() >= prefix.len() && haystack[..prefix.len()].eq_ignore_ascii_case(prefix)
}

fn is_regex_space(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | b'\n' | 0x0b | 0x0c)
}
