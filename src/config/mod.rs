pub mod bundle;
#[allow(clippy::module_inception)]
pub mod config;

pub use bundle::ConfigBundle;
pub use config::{AgentConfig, ConnectionFactoryDescriptor, build};
