pub mod annotations;
pub mod config;
pub mod container;
pub mod error;
pub mod log;
pub mod query;
pub mod test_utils;

pub use config::Config;
pub use error::{ConfigError, Result};
