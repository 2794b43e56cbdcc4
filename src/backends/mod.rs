//! Execution engine implementations
//!
//! Concrete [`Engine`](crate::core::engine::Engine) implementations for
//! the supported drivers. Only SQLite ships in-tree; server drivers plug
//! in through [`Store::with_engine`](crate::core::store::Store::with_engine).

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "sqlite")]
pub use sqlite::{SqliteEngine, SqliteSession};
