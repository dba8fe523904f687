//! Shared process plumbing for plugin-state binaries and libraries
//!
//! - logging bootstrap (`tracing` + `tracing-subscriber`)
//! - layered configuration loading (`figment`)

pub mod config_loader;
pub mod logging;

pub use config_loader::{load_layered, non_blank};
pub use logging::{init_logging, LogConfig};
