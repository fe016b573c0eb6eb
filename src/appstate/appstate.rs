use crate::config::ConnectionFactoryDescriptor;
use crate::ftp::{FtpConnector, FtpPool};
use std::path::PathBuf;
use std::sync::Arc;

pub struct AppState {
    pub descriptor: Arc<ConnectionFactoryDescriptor>,
    pub pool: Arc<FtpPool<FtpConnector>>,
    pub ftp_dir: PathBuf,
}
