//! Persistence for the encoding job service.
//!
//! This crate defines the [`Storage`] gateway contract and its backends:
//! an in-process map store and a SurrealDB store. Both report the same
//! [`DbError`] variants for the same situations.
//!
//! # Features
//!
//! - `memory` (default): embedded in-memory SurrealDB engine
//! - `rocksdb`: RocksDB for persistent file-based storage
//! - `remote`: WebSocket client for a shared SurrealDB server

mod connection;
mod memory;
mod schema;
mod storage;
mod surreal;
pub mod repositories;

pub use connection::{
    Database, DbConfig, StorageBackend, connect_surreal, get, init, open,
};
pub use memory::MemoryStorage;
pub use schema::init_schema;
pub use storage::{DbError, Storage};
pub use surreal::SurrealStorage;
