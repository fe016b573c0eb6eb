use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::bundle::{
    ConfigBundle, ENA_FTP_HOST, ENA_FTP_PASSWORD, ENA_FTP_PORT, ENA_FTP_USER_ID,
};
use crate::error::ConfigError;

/// Everything needed to open an FTP session against the ENA server.
///
/// Built once at startup and never mutated; a configuration change means
/// building a new descriptor.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionFactoryDescriptor {
    host: String,
    port: u16,
    username: String,
    password: String,
}

impl ConnectionFactoryDescriptor {
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for ConnectionFactoryDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionFactoryDescriptor")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Reads `enaFtpHost`, `enaFtpPort`, `enaFtpUserId` and `enaFtpPassword`
/// from `config`. No network I/O happens here.
pub fn build(config: &ConfigBundle) -> Result<ConnectionFactoryDescriptor, ConfigError> {
    let host = config.get_str(ENA_FTP_HOST)?;
    if host.trim().is_empty() {
        return Err(ConfigError::InvalidValue {
            key: ENA_FTP_HOST,
            reason: "host cannot be empty".into(),
        });
    }

    let raw_port = config.get_int(ENA_FTP_PORT)?;
    let port = u16::try_from(raw_port)
        .ok()
        .filter(|p| *p != 0)
        .ok_or_else(|| ConfigError::InvalidValue {
            key: ENA_FTP_PORT,
            reason: format!("{raw_port} is outside 1-65535"),
        })?;

    let username = config.get_str(ENA_FTP_USER_ID)?;
    let password = config.get_str(ENA_FTP_PASSWORD)?;

    log::info!("ENA FTP connection configured for {host}:{port} as {username:?}");

    Ok(ConnectionFactoryDescriptor {
        host: host.to_owned(),
        port,
        username: username.to_owned(),
        password: password.to_owned(),
    })
}

/// Settings for the agent process itself.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub bind_addr: SocketAddr,
    pub ftp_dir: PathBuf,
    pub pool_size: usize,
    pub connect_timeout: Duration,
    /// JSON bundle to read instead of the environment.
    pub bundle_file: Option<PathBuf>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            ftp_dir: PathBuf::from("./ftp"),
            pool_size: num_cpus::get(),
            connect_timeout: Duration::from_secs(30),
            bundle_file: None,
        }
    }
}

impl AgentConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_vars(std::env::vars())
    }

    pub fn from_vars<I, K, V>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut cfg = Self::default();
        for (name, value) in vars {
            let value = value.as_ref();
            match name.as_ref() {
                "FTP_AGENT_BIND" => {
                    cfg.bind_addr = value.parse().map_err(|e| ConfigError::InvalidValue {
                        key: "FTP_AGENT_BIND",
                        reason: format!("{value:?}: {e}"),
                    })?;
                }
                "EVA_FTP_DIR" => cfg.ftp_dir = PathBuf::from(value),
                "FTP_POOL_SIZE" => cfg.pool_size = positive("FTP_POOL_SIZE", value)? as usize,
                "FTP_CONNECT_TIMEOUT_SECS" => {
                    cfg.connect_timeout =
                        Duration::from_secs(positive("FTP_CONNECT_TIMEOUT_SECS", value)?);
                }
                "ENA_FTP_CONFIG" if !value.is_empty() => {
                    cfg.bundle_file = Some(PathBuf::from(value));
                }
                _ => {}
            }
        }
        Ok(cfg)
    }
}

fn positive(key: &'static str, value: &str) -> Result<u64, ConfigError> {
    match value.trim().parse::<u64>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::InvalidValue {
            key,
            reason: format!("{value:?} must be a positive integer"),
        }),
    }
}
