use std::sync::Arc;

use outfeed_core::api::StreamPort;
use outfeed_core::util::incomplete_utf8_tail;
use tokio::io::AsyncReadExt;
use tokio::task::JoinHandle;

use crate::error::CliError;

/// Copies a child's pipe into a stream port, so writer-hooked streams see
/// the child's output. Returns the number of bytes copied.
///
/// Reads are cut at UTF-8 character boundaries; a trailing partial character
/// waits for the next read.
pub fn pump_into_port<R>(mut rd: R, port: Arc<StreamPort>) -> JoinHandle<Result<u64, CliError>>
where
    R: tokio::io::AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = vec![0u8; 16 * 1024];
        let mut pending: Vec<u8> = Vec::with_capacity(16 * 1024 + 4);
        let mut total = 0u64;

        loop {
            let n = rd.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            total += n as u64;

            pending.extend_from_slice(&buf[..n]);
            let ready = pending.len() - incomplete_utf8_tail(&pending);
            if ready > 0 {
                port.write(&pending[..ready]);
                pending.drain(..ready);
            }
        }

        // EOF flush: whatever is left goes through as-is.
        if !pending.is_empty() {
            port.write(&pending);
        }

        Ok(total)
    })
}
