//! Tabio: organizes a browser window's tabs into named, colored groups with a language model.
//!
//! This library crate exposes all modules for use by the binary and integration tests.

pub mod app;
pub mod database;
pub mod managers;
pub mod services;
pub mod types;
