//! ENA FTP connection agent for EVA submissions.
//!
//! [`config::build`] turns a [`config::ConfigBundle`] into an immutable
//! [`config::ConnectionFactoryDescriptor`]; anything implementing
//! [`ftp::SessionFactory`] opens sessions from it.

pub mod api;
pub mod appstate;
pub mod config;
pub mod error;
pub mod ftp;
pub mod inspect;
