//! Helpers for draining child process pipes with bounded memory.

use tokio::io::{AsyncRead, AsyncReadExt};

/// Bytes captured from a pipe, plus how many were discarded past the limit.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LimitedOutput {
    pub bytes: Vec<u8>,
    pub truncated: usize,
}

impl LimitedOutput {
    /// Captured bytes as text, with a truncation note when bytes were dropped.
    pub fn to_text(&self, label: &str) -> String {
        let mut text = String::from_utf8_lossy(&self.bytes).trim_end().to_string();
        if self.truncated > 0 {
            text.push_str(&format!("\n[{label} truncated {} bytes]", self.truncated));
        }
        text
    }
}

/// Read `reader` to the end, keeping at most `limit` bytes.
///
/// Bytes past the limit are still drained so the writer never blocks on a full
/// pipe.
pub async fn read_stream_limited<R: AsyncRead + Unpin>(
    mut reader: R,
    limit: usize,
) -> std::io::Result<LimitedOutput> {
    let mut out = LimitedOutput::default();
    let mut chunk = [0u8; 8192];

    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        let remaining = limit.saturating_sub(out.bytes.len());
        if remaining > 0 {
            let keep = n.min(remaining);
            out.bytes.extend_from_slice(&chunk[..keep]);
            out.truncated += n.saturating_sub(keep);
        } else {
            out.truncated += n;
        }
    }

    Ok(out)
}
