use serde::Serialize;

use crate::config::ConnectionFactoryDescriptor;

/// Public view of the descriptor. The password is never included.
#[derive(Serialize, Debug, PartialEq, Eq)]
pub struct ConnectionSummary {
    pub host: String,
    pub port: u16,
    pub username: String,
}

impl From<&ConnectionFactoryDescriptor> for ConnectionSummary {
    fn from(d: &ConnectionFactoryDescriptor) -> Self {
        Self {
            host: d.host().to_owned(),
            port: d.port(),
            username: d.username().to_owned(),
        }
    }
}
