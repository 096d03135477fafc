// ABOUTME: Chunked stream copy that reports byte progress.
// ABOUTME: Guarantees non-decreasing progress and a terminal event equal to the bytes moved.

use super::TransferOptions;
use crate::error::{Error, Result};
use crate::types::ProgressEvent;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;

/// Copy `reader` into `writer`, reporting progress after every chunk.
///
/// `expected` is the size known before the copy started. If the source
/// turns out longer or shorter, events report the larger of the two and
/// the final event is rebased so that it is complete. The writer is flushed
/// but not shut down.
///
/// Each chunk read, chunk write and the final flush must finish within
/// `options.io_timeout`.
pub(crate) async fn copy_with_progress<R, W, F>(
    reader: &mut R,
    writer: &mut W,
    endpoints: (&str, &str),
    expected: u64,
    options: &TransferOptions,
    mut on_progress: F,
) -> Result<u64>
where
    R: AsyncRead + Unpin + ?Sized,
    W: AsyncWrite + Unpin + ?Sized,
    F: FnMut(ProgressEvent),
{
    let (source, destination) = endpoints;
    let limit = options.io_timeout;
    let mut buf = vec![0u8; options.chunk_size.max(1)];
    let mut transferred = 0u64;

    loop {
        let n = timeout(limit, reader.read(&mut buf))
            .await
            .map_err(|_| stalled("read", source, limit))?
            .map_err(|e| Error::io(source, e))?;
        if n == 0 {
            break;
        }
        timeout(limit, writer.write_all(&buf[..n]))
            .await
            .map_err(|_| stalled("write", destination, limit))?
            .map_err(|e| Error::io(destination, e))?;
        transferred += n as u64;
        on_progress(ProgressEvent {
            bytes_transferred: transferred,
            total_bytes: expected.max(transferred),
        });
    }

    timeout(limit, writer.flush())
        .await
        .map_err(|_| stalled("flush", destination, limit))?
        .map_err(|e| Error::io(destination, e))?;

    if transferred == 0 || transferred < expected {
        on_progress(ProgressEvent {
            bytes_transferred: transferred,
            total_bytes: transferred,
        });
    }

    Ok(transferred)
}

fn stalled(operation: &'static str, path: &str, after: Duration) -> Error {
    Error::IoTimeout {
        operation,
        path: path.to_string(),
        after,
    }
}
