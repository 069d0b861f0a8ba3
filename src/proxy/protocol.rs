use std::fmt;
use std::net::{Ipv4Addr, SocketAddr};

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::errors::ProxyError;

pub const SOCKS_VERSION: u8 = 0x05;
pub const METHOD_NO_AUTH: u8 = 0x00;
pub const CMD_CONNECT: u8 = 0x01;
pub const ATYP_IPV4: u8 = 0x01;
pub const ATYP_DOMAIN: u8 = 0x03;

/// The fixed method-selection answer: version 5, no authentication.
/// Sent unconditionally; the gateway supports exactly one auth mode.
pub const GREETING_ACK: [u8; 2] = [SOCKS_VERSION, METHOD_NO_AUTH];

/// Bound address reported in failure replies, where no outbound
/// connection exists.
pub const UNBOUND: SocketAddr = SocketAddr::new(std::net::IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetHost {
    Ipv4(Ipv4Addr),
    Domain(String),
}

impl fmt::Display for TargetHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetHost::Ipv4(ip) => ip.fmt(f),
            TargetHost::Domain(name) => name.fmt(f),
        }
    }
}

/// A client's parsed CONNECT request. Constructed only by
/// [`read_request`] and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyRequest {
    pub command: u8,
    pub host: TargetHost,
    pub port: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ReplyCode {
    Succeeded = 0x00,
    GeneralFailure = 0x05,
    CommandNotSupported = 0x07,
}

/// Reads the client greeting and discards the offered methods. The
/// method count is trusted only to bound the read; neither the version
/// byte nor the methods themselves are inspected.
pub async fn read_greeting<R: AsyncRead + Unpin>(stream: &mut R) -> Result<(), ProxyError> {
    let mut head = [0u8; 2];
    stream.read_exact(&mut head).await?;

    let nmethods = head[1] as usize;
    let mut methods = [0u8; 255];
    stream.read_exact(&mut methods[..nmethods]).await?;

    Ok(())
}

/// Reads the request following the greeting: a fixed 4-byte header,
/// then an address whose shape depends on the address-type byte, then
/// the big-endian target port.
pub async fn read_request<R: AsyncRead + Unpin>(stream: &mut R) -> Result<ProxyRequest, ProxyError> {
    let mut header = [0u8; 4];
    stream.read_exact(&mut header).await?;
    let command = header[1];

    let host = match header[3] {
        ATYP_IPV4 => {
            let mut octets = [0u8; 4];
            stream.read_exact(&mut octets).await?;
            TargetHost::Ipv4(Ipv4Addr::from(octets))
        }
        ATYP_DOMAIN => {
            let len = stream.read_u8().await? as usize;
            let mut name = vec![0u8; len];
            stream.read_exact(&mut name).await?;
            let name = String::from_utf8(name)
                .map_err(|_| ProxyError::Protocol("domain name is not valid UTF-8"))?;
            TargetHost::Domain(name)
        }
        other => return Err(ProxyError::AddressType(other)),
    };

    let port = stream.read_u16().await?;

    Ok(ProxyRequest {
        command,
        host,
        port,
    })
}

/// Encodes the fixed 10-byte reply. The address type is always
/// reported as IPv4; should the outbound socket be bound to an IPv6
/// address, the address field is zeroed to keep the reply well-formed.
pub fn encode_reply(code: ReplyCode, bound: SocketAddr) -> [u8; 10] {
    let mut reply = [0u8; 10];
    reply[0] = SOCKS_VERSION;
    reply[1] = code as u8;
    reply[3] = ATYP_IPV4;
    if let SocketAddr::V4(addr) = bound {
        reply[4..8].copy_from_slice(&addr.ip().octets());
    }
    reply[8..10].copy_from_slice(&bound.port().to_be_bytes());
    reply
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddrV4;

    #[tokio::test]
    async fn test_greeting_consumes_exactly_the_advertised_methods() {
        let mut input: &[u8] = &[0x05, 0x02, 0x00, 0x02, 0xAA];
        read_greeting(&mut input).await.unwrap();
        // The trailing byte belongs to whatever comes next.
        assert_eq!(input, &[0xAA]);
    }

    #[tokio::test]
    async fn test_greeting_with_zero_methods() {
        let mut input: &[u8] = &[0x05, 0x00];
        read_greeting(&mut input).await.unwrap();
        assert!(input.is_empty());
    }

    #[tokio::test]
    async fn test_truncated_greeting_fails() {
        let mut input: &[u8] = &[0x05, 0x03, 0x00];
        let err = read_greeting(&mut input).await.unwrap_err();
        assert!(matches!(err, ProxyError::Io(_)));
    }

    #[tokio::test]
    async fn test_read_ipv4_request() {
        let mut input: &[u8] = &[0x05, 0x01, 0x00, 0x01, 192, 168, 1, 7, 0x01, 0xBB];
        let request = read_request(&mut input).await.unwrap();
        assert_eq!(request.command, CMD_CONNECT);
        assert_eq!(request.host, TargetHost::Ipv4(Ipv4Addr::new(192, 168, 1, 7)));
        assert_eq!(request.port, 443);
        assert!(input.is_empty());
    }

    #[tokio::test]
    async fn test_read_domain_request() {
        let mut bytes = vec![0x05, 0x01, 0x00, 0x03, 11];
        bytes.extend_from_slice(b"example.com");
        bytes.extend_from_slice(&80u16.to_be_bytes());
        let mut input: &[u8] = &bytes;

        let request = read_request(&mut input).await.unwrap();
        assert_eq!(request.host, TargetHost::Domain("example.com".to_owned()));
        assert_eq!(request.port, 80);
    }

    #[tokio::test]
    async fn test_domain_length_prefix_is_honored_exactly() {
        // A zero-length name consumes nothing beyond the prefix.
        let mut input: &[u8] = &[0x05, 0x01, 0x00, 0x03, 0, 0x00, 0x50, 0xFF];
        let request = read_request(&mut input).await.unwrap();
        assert_eq!(request.host, TargetHost::Domain(String::new()));
        assert_eq!(request.port, 80);
        assert_eq!(input, &[0xFF]);

        // A 255-byte name consumes all 255 bytes and nothing more.
        let mut bytes = vec![0x05, 0x01, 0x00, 0x03, 255];
        bytes.extend_from_slice(&[b'a'; 255]);
        bytes.extend_from_slice(&443u16.to_be_bytes());
        bytes.push(0xEE);
        let mut input: &[u8] = &bytes;
        let request = read_request(&mut input).await.unwrap();
        assert_eq!(request.host, TargetHost::Domain("a".repeat(255)));
        assert_eq!(request.port, 443);
        assert_eq!(input, &[0xEE]);
    }

    #[tokio::test]
    async fn test_non_utf8_domain_is_a_protocol_error() {
        let mut input: &[u8] = &[0x05, 0x01, 0x00, 0x03, 2, 0xFF, 0xFE, 0x00, 0x50];
        let err = read_request(&mut input).await.unwrap_err();
        assert!(matches!(err, ProxyError::Protocol(_)));
    }

    #[tokio::test]
    async fn test_unsupported_address_type() {
        // ATYP 4 (IPv6) is not supported.
        let mut input: &[u8] = &[0x05, 0x01, 0x00, 0x04];
        let err = read_request(&mut input).await.unwrap_err();
        assert!(matches!(err, ProxyError::AddressType(0x04)));
    }

    #[tokio::test]
    async fn test_truncated_request_fails() {
        let mut input: &[u8] = &[0x05, 0x01, 0x00, 0x01, 127, 0];
        let err = read_request(&mut input).await.unwrap_err();
        assert!(matches!(err, ProxyError::Io(_)));
    }

    #[test]
    fn test_encode_success_reply() {
        let bound = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::new(10, 1, 2, 3), 51000));
        let reply = encode_reply(ReplyCode::Succeeded, bound);
        assert_eq!(
            reply,
            [0x05, 0x00, 0x00, 0x01, 10, 1, 2, 3, 0xC7, 0x38]
        );
    }

    #[test]
    fn test_encode_failure_replies_use_zeroed_endpoint() {
        assert_eq!(
            encode_reply(ReplyCode::GeneralFailure, UNBOUND),
            [0x05, 0x05, 0x00, 0x01, 0, 0, 0, 0, 0, 0]
        );
        assert_eq!(
            encode_reply(ReplyCode::CommandNotSupported, UNBOUND),
            [0x05, 0x07, 0x00, 0x01, 0, 0, 0, 0, 0, 0]
        );
    }
}
