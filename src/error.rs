use thiserror::Error;

/// Configuration errors. Every variant is fatal at startup.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required key: {key}")]
    MissingKey { key: &'static str },

    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: &'static str, reason: String },

    #[error("failed to read configuration file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse configuration: {0}")]
    Parse(#[source] serde_json::Error),
}

/// Errors raised while opening or driving an FTP control connection.
#[derive(Error, Debug)]
pub enum FtpError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("timed out connecting to {addr}")]
    ConnectTimeout { addr: String },

    #[error("no reply to {command} in time")]
    ReplyTimeout { command: &'static str },

    #[error("connection closed by server")]
    ConnectionClosed,

    #[error("malformed reply: {0}")]
    Malformed(String),

    #[error("unexpected reply {code}: {message}")]
    UnexpectedReply { code: u16, message: String },

    #[error("authentication failed ({code}): {message}")]
    AuthFailed { code: u16, message: String },

    #[error("unsupported: {0}")]
    Unsupported(&'static str),

    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    #[error("session pool closed")]
    PoolClosed,
}

#[derive(Error, Debug)]
pub enum DepositBoxError {
    #[error("deposit box eva-box-{ftp_box:02} not found")]
    BoxNotFound { ftp_box: u32 },

    #[error("deposit box eva-box-{ftp_box:02} has no user {username}")]
    UserNotFound { ftp_box: u32, username: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
