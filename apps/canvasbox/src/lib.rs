//! # Canvasbox Library
//!
//! This library exposes the canvasbox modules for testing and integration.
//!
//! The main binary uses these modules through the `main.rs` entry point.

pub mod api;
pub mod cli;
pub mod client;
pub mod config;
pub mod live;
pub mod store;

// Re-export canvasbox_core for convenience
pub use canvasbox_core;
