use std::net::SocketAddr;

use tokio::net::TcpStream;

use crate::proxy::protocol::{ProxyRequest, TargetHost};

/// Opens the outbound connection for a CONNECT request. Returns the
/// stream together with the locally bound endpoint, which the reply
/// echoes back to the client. No timeout is applied to the connect
/// attempt itself; the caller treats any failure as a generic connect
/// failure regardless of its subtype.
pub async fn connect_to_target(request: &ProxyRequest) -> std::io::Result<(TcpStream, SocketAddr)> {
    let stream = match &request.host {
        TargetHost::Ipv4(ip) => TcpStream::connect((*ip, request.port)).await?,
        TargetHost::Domain(name) => TcpStream::connect((name.as_str(), request.port)).await?,
    };
    let bound = stream.local_addr()?;
    Ok((stream, bound))
}
