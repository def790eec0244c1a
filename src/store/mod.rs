//! Persistence layer: libSQL-backed storage for preferences and checkpoints.

pub mod libsql_backend;
pub mod memory;
mod migrations;
pub mod traits;

pub use libsql_backend::LibSqlBackend;
pub use memory::{MemoryStore, Namespace};
pub use traits::Database;
