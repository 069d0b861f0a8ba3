use std::{
    net::{IpAddr, SocketAddr},
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context;
use serde::{Deserialize, Serialize};

#[serde_with::serde_as]
#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Settings {
    /// Address and port the TLS listener binds to.
    pub bind_address: SocketAddr,

    /// Client source addresses permitted to use the gateway. Anyone
    /// else is dropped before the TLS handshake.
    pub allowed_clients: Vec<IpAddr>,

    /// The TLS key material presented to connecting clients.
    pub tls_certificate: PathBuf,
    pub tls_privkey: PathBuf,

    /// How long a relay direction may sit without data before it is
    /// shut down, in seconds.
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout: Duration,
}

fn default_idle_timeout() -> Duration {
    Duration::from_secs(300)
}

pub fn load(path: &Path) -> anyhow::Result<Settings> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("while reading config file {}", path.display()))?;
    toml::from_str(&contents).context("while parsing config file")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_settings() {
        let settings: Settings = toml::from_str(
            r#"
            bind-address = "0.0.0.0:59485"
            allowed-clients = ["192.168.0.101", "192.168.1.110"]
            tls-certificate = "cert.pem"
            tls-privkey = "key.pem"
            idle-timeout = 60
            "#,
        )
        .unwrap();

        assert_eq!(settings.bind_address, "0.0.0.0:59485".parse().unwrap());
        assert_eq!(settings.allowed_clients.len(), 2);
        assert_eq!(settings.idle_timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_idle_timeout_defaults_to_five_minutes() {
        let settings: Settings = toml::from_str(
            r#"
            bind-address = "127.0.0.1:1080"
            allowed-clients = []
            tls-certificate = "cert.pem"
            tls-privkey = "key.pem"
            "#,
        )
        .unwrap();

        assert_eq!(settings.idle_timeout, Duration::from_secs(300));
    }
}
