//! Client-side engine for browsing a remote file tree.

// Declare all modules as public so they can be used by the binary and tests.
pub mod app;
pub mod backend;
pub mod config;
pub mod core;
pub mod utils;
