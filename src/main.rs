use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use swiftgate::{acl::AllowList, config, proxy, tls};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "./config.toml".to_owned());
    let settings = Arc::new(config::load(Path::new(&config_path))?);

    let allowlist = Arc::new(AllowList::new(settings.allowed_clients.iter().copied()));
    let acceptor =
        tls::build_tls_acceptor(&settings).context("while building the TLS acceptor")?;

    let listener = TcpListener::bind(settings.bind_address)
        .await
        .with_context(|| format!("while binding to {}", settings.bind_address))?;

    info!("starting gateway");
    proxy::start(settings, allowlist, acceptor, listener).await
}
