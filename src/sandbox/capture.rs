// src/sandbox/capture.rs — Bounded stdout/stderr capture

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::task::JoinHandle;

/// Captured bytes plus whether anything past the limit was discarded.
#[derive(Default)]
pub(crate) struct Captured {
    pub bytes: Vec<u8>,
    pub truncated: bool,
}

/// A background task draining one pipe into a shared buffer.
pub(crate) struct OutputReader {
    buffer: Arc<Mutex<Captured>>,
    task: JoinHandle<()>,
}

impl OutputReader {
    pub fn spawn<R>(reader: R, limit: usize) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let buffer = Arc::new(Mutex::new(Captured::default()));
        let task = tokio::spawn(read_bounded(reader, limit, buffer.clone()));
        Self { buffer, task }
    }

    /// Wait up to `grace` for EOF. A reader still blocked after that (a
    /// descendant escaped the process group and kept the pipe open) is
    /// aborted and whatever it read so far is returned.
    pub async fn finish(mut self, grace: Duration) -> String {
        if tokio::time::timeout(grace, &mut self.task).await.is_err() {
            tracing::warn!("Output reader did not finish within {:?}", grace);
            self.task.abort();
        }
        let captured = std::mem::take(&mut *lock(&self.buffer));
        decode(captured)
    }
}

/// Finish an optional reader; a missing pipe yields empty output.
pub(crate) async fn collect(reader: Option<OutputReader>, grace: Duration) -> String {
    match reader {
        Some(reader) => reader.finish(grace).await,
        None => String::new(),
    }
}

/// Read `reader` to EOF, keeping at most `limit` bytes in `sink`. The
/// remainder is drained so the child never blocks on a full pipe.
pub(crate) async fn read_bounded<R>(mut reader: R, limit: usize, sink: Arc<Mutex<Captured>>)
where
    R: AsyncRead + Unpin,
{
    let mut buf = [0u8; 8192];

    loop {
        match reader.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                let mut captured = lock(&sink);
                let room = limit.saturating_sub(captured.bytes.len());
                if room > 0 {
                    captured.bytes.extend_from_slice(&buf[..n.min(room)]);
                }
                if n > room {
                    captured.truncated = true;
                }
            }
        }
    }
}

fn lock(buffer: &Mutex<Captured>) -> std::sync::MutexGuard<'_, Captured> {
    buffer.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn decode(captured: Captured) -> String {
    let mut text = String::from_utf8_lossy(&captured.bytes).into_owned();
    if captured.truncated {
        text.push_str(&format!(
            "\n[output truncated at {} bytes]",
            captured.bytes.len()
        ));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn read_all(input: &'static [u8], limit: usize) -> Captured {
        let sink = Arc::new(Mutex::new(Captured::default()));
        read_bounded(input, limit, sink.clone()).await;
        let captured = std::mem::take(&mut *lock(&sink));
        captured
    }

    #[tokio::test]
    async fn test_read_bounded_under_limit() {
        let captured = read_all(b"hello", 64).await;
        assert_eq!(captured.bytes, b"hello");
        assert!(!captured.truncated);
    }

    #[tokio::test]
    async fn test_read_bounded_over_limit() {
        let data: &'static [u8] = Box::leak(vec![b'x'; 20_000].into_boxed_slice());
        let captured = read_all(data, 100).await;
        assert_eq!(captured.bytes.len(), 100);
        assert!(captured.truncated);
    }

    #[test]
    fn test_decode_marks_truncation() {
        let text = decode(Captured {
            bytes: b"abc".to_vec(),
            truncated: true,
        });
        assert_eq!(text, "abc\n[output truncated at 3 bytes]");
    }

    #[tokio::test]
    async fn test_collect_missing_reader() {
        assert_eq!(collect(None, Duration::from_millis(10)).await, "");
    }

    #[tokio::test]
    async fn test_stalled_reader_keeps_partial_output() {
        use tokio::io::AsyncWriteExt;

        let (mut writer, reader) = tokio::io::duplex(64);
        let output = OutputReader::spawn(reader, 1024);
        writer.write_all(b"partial line\n").await.unwrap();
        // The writer stays open, so the reader never sees EOF.
        tokio::time::sleep(Duration::from_millis(50)).await;

        let text = output.finish(Duration::from_millis(100)).await;
        assert_eq!(text, "partial line\n");
        drop(writer);
    }
}
