use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio_rustls::TlsAcceptor;
use tracing::{debug, error, info, warn};

use crate::acl::AllowList;
use crate::config::Settings;
use crate::errors::ProxyError;

pub mod protocol;
pub mod relay;
pub mod upstream;

use protocol::ReplyCode;

/// Accept loop: one spawned task per connection. The allowlist gate
/// runs on the TCP peer address before the TLS handshake starts, so a
/// denied client never receives a single byte.
pub async fn start(
    settings: Arc<Settings>,
    allowlist: Arc<AllowList>,
    acceptor: TlsAcceptor,
    listener: TcpListener,
) -> anyhow::Result<()> {
    info!("listening on {}", listener.local_addr()?);
    info!("{} client address(es) allowed", allowlist.len());

    loop {
        let (socket, addr) = listener.accept().await?;

        let acceptor = acceptor.clone();
        let settings = settings.clone();
        let allowlist = allowlist.clone();

        tokio::spawn(async move {
            if !allowlist.permits(addr.ip()) {
                warn!("unauthorized access attempt from {}", addr.ip());
                return;
            }

            match acceptor.accept(socket).await {
                Ok(stream) => {
                    if let Err(e) = serve_socks5(stream, addr, settings.idle_timeout).await {
                        error!("proxy error from {addr}: {e}");
                    }
                }
                Err(e) => {
                    error!("TLS handshake failed from {addr}: {e:?}");
                }
            }
        });
    }
}

/// Drives one connection through greeting, request and reply, then
/// hands it to the relay when a CONNECT succeeded. Errors returned
/// from here have already followed their reply policy: unsupported
/// commands replied before erroring, unsupported address types and
/// malformed messages close with no reply at all.
pub async fn serve_socks5<S>(
    mut stream: S,
    peer: SocketAddr,
    idle_timeout: Duration,
) -> Result<(), ProxyError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    protocol::read_greeting(&mut stream).await?;
    stream.write_all(&protocol::GREETING_ACK).await?;

    let request = protocol::read_request(&mut stream).await?;

    if request.command != protocol::CMD_CONNECT {
        debug!("unsupported command {:#04x} from {peer}", request.command);
        let reply = protocol::encode_reply(ReplyCode::CommandNotSupported, protocol::UNBOUND);
        stream.write_all(&reply).await?;
        return Err(ProxyError::Command(request.command));
    }

    let (upstream, bound) = match upstream::connect_to_target(&request).await {
        Ok(connected) => connected,
        Err(err) => {
            error!(
                "failed to connect to {}:{}: {err}",
                request.host, request.port
            );
            let reply = protocol::encode_reply(ReplyCode::GeneralFailure, protocol::UNBOUND);
            stream.write_all(&reply).await?;
            return Ok(());
        }
    };

    info!("{peer} connected to {}:{}", request.host, request.port);
    let reply = protocol::encode_reply(ReplyCode::Succeeded, bound);
    stream.write_all(&reply).await?;

    relay::relay(stream, upstream, idle_timeout).await;

    Ok(())
}
