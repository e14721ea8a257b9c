//! Configuration: environment-variable settings for the server.

mod settings;

pub use settings::{ConfigError, Settings};
