use thiserror::Error;

/// Everything that can go wrong while driving a single client
/// connection through the greeting/request/reply pipeline. All of
/// these are local to one connection; none is fatal to the process.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// Malformed message content. Truncated reads surface as `Io` with
    /// `UnexpectedEof`; this variant covers content that read fine but
    /// does not decode.
    #[error("protocol error: {0}")]
    Protocol(&'static str),

    /// Address type other than IPv4 or domain name. The connection is
    /// closed without sending a reply.
    #[error("unsupported address type {0:#04x}")]
    AddressType(u8),

    /// Command other than CONNECT. A command-not-supported reply has
    /// already been sent when this is raised.
    #[error("unsupported command {0:#04x}")]
    Command(u8),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
