//! Shared client writer and small logging helpers.

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

/// Longest prefix of an opaque line kept in log events.
pub(super) const LOG_PREVIEW_CHARS: usize = 200;

/// Atomically write data to the shared client stdout and flush.
///
/// Both pumps write to the client: the agent→client pump forwards agent
/// output, the client→agent pump emits admission notices. Writes go through
/// one `Mutex` so NDJSON lines are never interleaved.
pub(super) async fn write_client<W: AsyncWrite + Unpin>(
    out: &Mutex<W>,
    data: &[u8],
) -> Result<(), std::io::Error> {
    let mut guard = out.lock().await;
    guard.write_all(data).await?;
    guard.flush().await
}

/// Truncate `text` for log output on a char boundary.
pub(super) fn preview(text: &str) -> &str {
    match text.char_indices().nth(LOG_PREVIEW_CHARS) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_short() {
        assert_eq!(preview("abc"), "abc");
    }

    #[test]
    fn test_preview_truncates_on_char_boundary() {
        let long = "é".repeat(LOG_PREVIEW_CHARS + 10);
        let p = preview(&long);
        assert_eq!(p.chars().count(), LOG_PREVIEW_CHARS);
    }

    #[tokio::test]
    async fn test_write_client_flushes() {
        let out = Mutex::new(Vec::new());
        write_client(&out, b"one\n").await.unwrap();
        write_client(&out, b"two\n").await.unwrap();
        assert_eq!(out.into_inner(), b"one\ntwo\n");
    }
}
