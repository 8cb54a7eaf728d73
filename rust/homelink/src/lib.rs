pub mod capture;
pub mod config;
pub mod devices;
pub mod error;
pub mod logging;
pub mod telemetry;
pub mod topics;

pub use error::{HomelinkError, Result};
pub use logging::init_logger;
