//! Core persistence types and traits
//!
//! This module provides the building blocks of the store: the value and
//! descriptor model, the discovery registry, configuration, the engine
//! capability, and the store plus query builder that sit on top of them.

pub mod config;
pub mod driver;
pub mod engine;
pub mod entity;
pub mod error;
pub mod query;
pub mod registry;
pub mod store;
pub mod value;

// Re-export commonly used types
pub use config::{DatabaseSection, StoreConfig};
pub use driver::DriverKind;
pub use engine::{Engine, EngineQuery, EngineSettings, SessionHandle};
pub use entity::{EntityDef, FieldDef, FieldKind, IdentityPolicy, Persistable};
pub use error::{Result, StoreError};
pub use query::{eq, lt, Condition, Operator, PendingQuery, QueryBuilder};
pub use store::Store;
pub use value::{Row, Rows, Value};
