//! Diff sync domain: configuration, interest windows and the pending signal.

pub mod config;
pub mod pending;
pub mod request;

pub use config::SyncConfig;
pub use pending::PendingFlag;
pub use request::DataRequest;
