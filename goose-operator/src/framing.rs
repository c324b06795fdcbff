//! Line framing for the stdio streams.
//!
//! [`FrameReader`] turns an async byte stream into a sequence of
//! [`Frame`]s: one decode attempt per line, blank lines skipped, undecodable
//! lines surfaced as [`Frame::Opaque`]. Nothing is buffered across lines.

use tokio::io::AsyncBufRead;
use tokio::io::AsyncBufReadExt;

use goose_operator_core::StreamDirection;
use goose_operator_core::protocol::{DecodeError, Frame, strip_terminator};

use crate::error::FramingError;

/// Maximum NDJSON line size (10 MiB).
///
/// Lines exceeding this limit are drained and skipped before JSON parsing.
pub const MAX_MESSAGE_BYTES: usize = 10 * 1024 * 1024;

/// Lazy frame decoder over one stream.
pub struct FrameReader<R> {
    reader: R,
    direction: StreamDirection,
    max_bytes: usize,
    buf: Vec<u8>,
}

impl<R: AsyncBufRead + Unpin> FrameReader<R> {
    pub fn new(reader: R, direction: StreamDirection) -> Self {
        Self::with_limit(reader, direction, MAX_MESSAGE_BYTES)
    }

    pub fn with_limit(reader: R, direction: StreamDirection, max_bytes: usize) -> Self {
        Self {
            reader,
            direction,
            max_bytes,
            buf: Vec::new(),
        }
    }

    /// Read the next non-blank frame.
    ///
    /// Returns `Ok(None)` at end of stream. Oversized lines are skipped with a
    /// warning; only IO failures are returned as errors.
    pub async fn next_frame(&mut self) -> Result<Option<Frame>, FramingError> {
        loop {
            self.buf.clear();
            match bounded_read_line(&mut self.reader, &mut self.buf, self.max_bytes).await {
                Ok(0) => return Ok(None),
                Ok(_) => {}
                Err(FramingError::MessageTooLarge { max_bytes }) => {
                    tracing::warn!(
                        direction = %self.direction,
                        max_bytes,
                        "message exceeded size limit, skipping"
                    );
                    continue;
                }
                Err(e) => return Err(e),
            }

            if let Some(frame) = decode_bytes(&self.buf, self.direction) {
                return Ok(Some(frame));
            }
        }
    }
}

/// Decode one raw line. `None` for blank lines.
fn decode_bytes(raw: &[u8], direction: StreamDirection) -> Option<Frame> {
    match std::str::from_utf8(raw) {
        Ok(text) => Frame::decode(text),
        Err(e) => {
            let lossy = String::from_utf8_lossy(raw);
            if lossy.trim().is_empty() {
                return None;
            }
            let text = strip_terminator(&lossy).to_string();
            tracing::warn!(
                direction = %direction,
                len = raw.len(),
                "invalid UTF-8, treating line as opaque"
            );
            Some(Frame::Opaque {
                text,
                error: DecodeError::NotJson {
                    reason: e.to_string(),
                },
            })
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Bounded Line Reading
// ─────────────────────────────────────────────────────────────────────────────

/// Read a single line from an async buffered reader, enforcing a byte limit.
///
/// Unlike bare `read_line`, this will not allocate unbounded memory if the
/// peer sends a continuous stream of bytes without a newline. Raw bytes are
/// accumulated so multi-byte UTF-8 characters straddling internal buffer
/// boundaries stay intact.
///
/// # Returns
///
/// - `Ok(n)` where `n > 0`: a line (possibly unterminated at EOF) was read
/// - `Ok(0)`: EOF reached
/// - `Err(FramingError::MessageTooLarge)`: line exceeded `max_bytes`
/// - `Err(FramingError::Io)`: underlying IO error
pub async fn bounded_read_line<R: AsyncBufRead + Unpin>(
    reader: &mut R,
    buf: &mut Vec<u8>,
    max_bytes: usize,
) -> Result<usize, FramingError> {
    let mut total = 0usize;
    loop {
        let available = reader.fill_buf().await.map_err(FramingError::Io)?;

        if available.is_empty() {
            return Ok(total);
        }

        match available.iter().position(|&b| b == b'\n') {
            Some(pos) => {
                let to_consume = pos + 1;
                if total + to_consume > max_bytes {
                    reader.consume(to_consume);
                    return Err(FramingError::MessageTooLarge { max_bytes });
                }

                buf.extend_from_slice(&available[..to_consume]);
                total += to_consume;
                reader.consume(to_consume);
                return Ok(total);
            }
            None => {
                let len = available.len();
                if total + len > max_bytes {
                    reader.consume(len);
                    drain_until_newline(reader).await;
                    return Err(FramingError::MessageTooLarge { max_bytes });
                }

                buf.extend_from_slice(available);
                total += len;
                reader.consume(len);
            }
        }
    }
}

/// Drain bytes until a newline or EOF so the reader sits at the next line.
///
/// Bounded by a 30-second timeout against stalled peers.
async fn drain_until_newline<R: AsyncBufRead + Unpin>(reader: &mut R) {
    let drain = async {
        loop {
            match reader.fill_buf().await {
                Ok([]) => return,
                Ok(buf) => {
                    if let Some(pos) = buf.iter().position(|&b| b == b'\n') {
                        reader.consume(pos + 1);
                        return;
                    }
                    let len = buf.len();
                    reader.consume(len);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "IO error while draining oversized message");
                    return;
                }
            }
        }
    };
    if tokio::time::timeout(std::time::Duration::from_secs(30), drain)
        .await
        .is_err()
    {
        tracing::warn!("drain_until_newline timed out after 30s");
    }
}
