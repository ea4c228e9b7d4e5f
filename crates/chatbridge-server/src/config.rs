//! Server configuration: HTTP bind address plus the embedded helper config.

use chatbridge_helper::HelperConfig;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;

/// Top-level bridge configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// HTTP bind address
    pub host: IpAddr,
    /// HTTP port
    pub port: u16,
    /// Permissive CORS for local development clients
    pub cors_enabled: bool,
    /// Helper bridge configuration
    pub helper: HelperConfig,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)),
            port: 1234,
            cors_enabled: true,
            helper: HelperConfig::default(),
        }
    }
}

impl BridgeConfig {
    /// Load configuration: defaults, overlaid by a JSON file when given,
    /// overlaid by environment variables.
    ///
    /// Recognized variables: `CHATBRIDGE_HTTP_HOST`, `CHATBRIDGE_HTTP_PORT`,
    /// `CHATBRIDGE_SOCKET_PATH`.
    pub fn load(path: Option<&Path>) -> Result<Self, ServerConfigError> {
        let mut config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .map_err(|e| ServerConfigError::Io(path.display().to_string(), e))?;
                serde_json::from_str(&raw)?
            }
            None => Self::default(),
        };

        if let Ok(host) = std::env::var("CHATBRIDGE_HTTP_HOST") {
            config.host = host
                .parse()
                .map_err(|_| ServerConfigError::Invalid(format!("bad host: {host}")))?;
        }
        if let Ok(port) = std::env::var("CHATBRIDGE_HTTP_PORT") {
            config.port = port
                .parse()
                .map_err(|_| ServerConfigError::Invalid(format!("bad port: {port}")))?;
        }
        if let Ok(socket) = std::env::var("CHATBRIDGE_SOCKET_PATH") {
            config.helper.socket_path = socket.into();
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ServerConfigError> {
        if self.port == 0 {
            return Err(ServerConfigError::Invalid("port cannot be 0".into()));
        }
        self.helper
            .validate()
            .map_err(|e| ServerConfigError::Invalid(e.to_string()))
    }

    /// HTTP bind address
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// Configuration loading/validation errors
#[derive(Debug, thiserror::Error)]
pub enum ServerConfigError {
    #[error("cannot read config file {0}: {1}")]
    Io(String, #[source] std::io::Error),
    #[error("cannot parse config file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        assert!(BridgeConfig::default().validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "port": 9999, "helper": {{ "default_timeout": "3s" }} }}"#
        )
        .unwrap();

        let config = BridgeConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.port, 9999);
        assert_eq!(
            config.helper.default_timeout,
            std::time::Duration::from_secs(3)
        );
        // Unspecified fields keep their defaults.
        assert!(config.cors_enabled);
    }

    #[test]
    fn test_zero_port_rejected() {
        let config = BridgeConfig {
            port: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ServerConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_env_overrides_bind_address() {
        std::env::set_var("CHATBRIDGE_HTTP_HOST", "0.0.0.0");
        std::env::set_var("CHATBRIDGE_HTTP_PORT", "8765");

        let config = BridgeConfig::load(None).unwrap();
        assert_eq!(config.bind_addr().to_string(), "0.0.0.0:8765");

        std::env::remove_var("CHATBRIDGE_HTTP_HOST");
        std::env::remove_var("CHATBRIDGE_HTTP_PORT");
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let result = BridgeConfig::load(Some(Path::new("/nonexistent/chatbridge.json")));
        assert!(matches!(result, Err(ServerConfigError::Io(_, _))));
    }
}
