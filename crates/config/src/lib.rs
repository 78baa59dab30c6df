// Configuration loading

pub mod settings;

pub use settings::{parse_hex_color, ConfigError, Settings};
