//! Tabio persistence layer.
//!
//! Provides SQLite connection management, schema migrations and the
//! key-value store the panel keeps its history and settings in.
//!
//! # Usage
//!
//! ```no_run
//! use tabio::database::{KeyValueStore, SqliteStore};
//!
//! let store = SqliteStore::open("tabio.db").expect("failed to open database");
//! store.set("customInstruction", serde_json::json!("Keep docs together")).unwrap();
//! ```

pub mod connection;
pub mod kv_store;
pub mod migrations;

pub use connection::Database;
pub use kv_store::{KeyValueStore, MemoryStore, SqliteStore};
