use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;
use tracing::{debug, error};

const CHUNK_SIZE: usize = 8192;

/// Copies bytes from `src` to `dst` until EOF, an idle period of
/// `idle_timeout` with no incoming data, or an I/O error. Bytes are
/// forwarded in arrival order with one in-flight chunk at most. The
/// destination write half is shut down on every exit path.
async fn forward<R, W>(mut src: R, mut dst: W, idle_timeout: Duration)
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        match timeout(idle_timeout, src.read(&mut buf)).await {
            Ok(Ok(0)) => break,
            Ok(Ok(n)) => {
                if let Err(err) = dst.write_all(&buf[..n]).await {
                    error!("relay write failed: {err}");
                    break;
                }
            }
            Ok(Err(err)) => {
                error!("relay read failed: {err}");
                break;
            }
            Err(_) => {
                debug!("relay direction idle, shutting down");
                break;
            }
        }
    }
    let _ = dst.shutdown().await;
}

/// Runs the two relay directions as independently scheduled tasks and
/// completes when both have ended. One direction finishing does not
/// cancel the sibling; it runs on until its own EOF, idle expiry or
/// error.
pub async fn relay<C, U>(client: C, upstream: U, idle_timeout: Duration)
where
    C: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    U: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (client_read, client_write) = tokio::io::split(client);
    let (upstream_read, upstream_write) = tokio::io::split(upstream);

    let client_to_upstream = tokio::spawn(forward(client_read, upstream_write, idle_timeout));
    let upstream_to_client = tokio::spawn(forward(upstream_read, client_write, idle_timeout));

    let _ = tokio::join!(client_to_upstream, upstream_to_client);
}
