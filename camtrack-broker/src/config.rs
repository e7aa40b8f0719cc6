use std::path::PathBuf;
use std::time::Duration;

/// Broker connection parameters. TLS fields are all optional; when none are
/// set, the client connects in plaintext. Mutual TLS is enabled by setting
/// all three of `ca_cert_path`, `client_cert_path`, `client_key_path`.
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    pub ca_cert_path: Option<PathBuf>,
    pub client_cert_path: Option<PathBuf>,
    pub client_key_path: Option<PathBuf>,
    pub verify_server: bool,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub drain_timeout: Duration,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 1883,
            client_id: "camtrack".to_string(),
            ca_cert_path: None,
            client_cert_path: None,
            client_key_path: None,
            verify_server: true,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(30),
            drain_timeout: Duration::from_secs(2),
        }
    }
}
