pub mod client;
pub mod pool;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{FtpConnector, FtpSession, SessionFactory};
pub use pool::{FtpPool, FtpSessionGuard};
