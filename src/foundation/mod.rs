/// Session configuration.
pub mod config;
/// Frame indices, windows and viewport geometry.
pub mod core;
/// Error taxonomy.
pub mod error;
