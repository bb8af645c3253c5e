//! Configuration loading for the reader.
//!
//! Tunables live in `conf/config.toml` (or the path given with `--config`).
//! Missing or invalid entries fall back to defaults so narration still works.

mod defaults;
mod io;
mod models;
mod tables;

pub use io::{load_config, parse_config, serialize_config};
pub use models::{AppConfig, LogLevel};
