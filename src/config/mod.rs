//! Configuration loading and schema.

pub mod loader;
mod structs;

#[cfg(test)]
mod tests;

pub use loader::{get_config_dir, load_config};
pub use structs::*;
