//! # minorm
//!
//! A minimal object-relational persistence layer: a configuration-driven
//! store that discovers persistable types at startup, manages their
//! schema, and exposes transactional save/update/fetch plus a small
//! fluent query builder.
//!
//! ## Features
//!
//! - **Init-time discovery**: entity types announce themselves before
//!   `main` via [`register_entity!`]; nothing maintains a hand-written
//!   list of what is persistable
//! - **Descriptor-driven schema**: each type carries a static
//!   [`EntityDef`](core::entity::EntityDef) naming its table, identity,
//!   fields, and column defaults
//! - **Transactional sessions**: every operation opens a scoped session
//!   that is released on every exit path, with rollback on failure
//! - **Typed queries**: conditions are built from a small expression
//!   DSL ([`eq`](core::query::eq), [`lt`](core::query::lt)) and rendered
//!   to named-parameter text, never spliced from caller strings
//! - **Async throughout**: engines run on Tokio; the bundled SQLite
//!   engine offloads its synchronous driver to the blocking pool
//!
//! ## Quick Start
//!
//! Add this to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! minorm = { version = "0.1", features = ["sqlite"] }
//! tokio = { version = "1", features = ["full"] }
//! ```
//!
//! Point the store at a TOML configuration file:
//!
//! ```toml
//! [database]
//! driver = "sqlite"
//! url = "sqlite:app.db"
//! ddl = "update"
//! ```
//!
//! ### Basic Usage
//!
//! ```rust,no_run
//! use minorm::prelude::*;
//!
//! struct Employee {
//!     id: Option<i64>,
//!     name: String,
//! }
//!
//! static EMPLOYEE: EntityDef = EntityDef {
//!     name: "Employee",
//!     table: "employees",
//!     identity: "id",
//!     identity_policy: IdentityPolicy::Engine,
//!     fields: &[FieldDef {
//!         name: "name",
//!         column: "name",
//!         kind: FieldKind::Text,
//!         default: None,
//!     }],
//! };
//!
//! impl Persistable for Employee {
//!     fn descriptor() -> &'static EntityDef {
//!         &EMPLOYEE
//!     }
//!
//!     fn to_row(&self) -> Row {
//!         let mut row = Row::new();
//!         row.insert("name".to_string(), Value::from(self.name.clone()));
//!         row
//!     }
//!
//!     fn from_row(row: &Row) -> Result<Self> {
//!         Ok(Employee {
//!             id: row.get("id").and_then(Value::as_long),
//!             name: row.get("name").map(Value::as_string).unwrap_or_default(),
//!         })
//!     }
//!
//!     fn identity(&self) -> Option<i64> {
//!         self.id
//!     }
//!
//!     fn set_identity(&mut self, id: i64) {
//!         self.id = Some(id);
//!     }
//! }
//!
//! minorm::register_entity!(Employee);
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let store = Store::open("store.toml").await?;
//!
//!     let mut employee = Employee {
//!         id: None,
//!         name: "Ada".to_string(),
//!     };
//!     store.save(&mut employee).await?;
//!
//!     if let Some(everyone) = store.get_all::<Employee>().await {
//!         for person in everyone {
//!             println!("employee: {}", person.name);
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ### Queries
//!
//! ```rust,no_run
//! use minorm::prelude::*;
//! # struct Employee { id: Option<i64>, name: String, age: i32 }
//! # static EMPLOYEE: EntityDef = EntityDef {
//! #     name: "Employee",
//! #     table: "employees",
//! #     identity: "id",
//! #     identity_policy: IdentityPolicy::Engine,
//! #     fields: &[
//! #         FieldDef { name: "name", column: "name", kind: FieldKind::Text, default: None },
//! #         FieldDef { name: "age", column: "age", kind: FieldKind::Int, default: None },
//! #     ],
//! # };
//! # impl Persistable for Employee {
//! #     fn descriptor() -> &'static EntityDef { &EMPLOYEE }
//! #     fn to_row(&self) -> Row {
//! #         let mut row = Row::new();
//! #         row.insert("name".to_string(), Value::from(self.name.clone()));
//! #         row.insert("age".to_string(), Value::Int(self.age));
//! #         row
//! #     }
//! #     fn from_row(row: &Row) -> Result<Self> {
//! #         Ok(Employee {
//! #             id: row.get("id").and_then(Value::as_long),
//! #             name: row.get("name").map(Value::as_string).unwrap_or_default(),
//! #             age: row.get("age").and_then(Value::as_int).unwrap_or(0),
//! #         })
//! #     }
//! #     fn identity(&self) -> Option<i64> { self.id }
//! #     fn set_identity(&mut self, id: i64) { self.id = Some(id); }
//! # }
//! # minorm::register_entity!(Employee);
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let store = Store::open("store.toml").await?;
//!
//!     // Reads accumulate clauses, then collect.
//!     let juniors = store
//!         .query::<Employee>()
//!         .from()
//!         .where_cond(lt("age", 30))
//!         .collect()
//!         .await?;
//!     println!("found {} juniors", juniors.map_or(0, |found| found.len()));
//!
//!     // Deletions use the same builder with the delete marker set.
//!     let gone = store
//!         .query::<Employee>()
//!         .from()
//!         .delete()
//!         .where_cond(eq("name", "Ada"))
//!         .execute()
//!         .await?;
//!     println!("removed {} rows", gone);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Project Structure
//!
//! ```text
//! minorm/
//! ├── src/
//! │   ├── core/              # Core types and traits
//! │   │   ├── config.rs      # Configuration document and resolution
//! │   │   ├── driver.rs      # Driver kind and dialect mapping
//! │   │   ├── engine.rs      # Engine and session capabilities
//! │   │   ├── entity.rs      # Descriptors and the Persistable trait
//! │   │   ├── error.rs       # Error types
//! │   │   ├── query.rs       # Fluent query builder
//! │   │   ├── registry.rs    # Init-time type discovery
//! │   │   ├── store.rs       # The persistence store
//! │   │   ├── value.rs       # Value types
//! │   │   └── mod.rs
//! │   ├── backends/          # Execution engine implementations
//! │   │   ├── sqlite.rs      # SQLite engine
//! │   │   └── mod.rs
//! │   └── lib.rs
//! ├── demos/                 # Example programs
//! ├── tests/                 # Integration tests
//! ├── Cargo.toml
//! └── README.md
//! ```

/// Core persistence types and traits
pub mod core;

/// Execution engine implementations
pub mod backends;

#[doc(hidden)]
pub mod __reexports {
    pub use ctor;
}

/// Prelude for convenient imports
///
/// ```rust
/// use minorm::prelude::*;
///
/// let condition = eq("name", "Ada");
/// assert_eq!(condition.field(), "name");
/// ```
pub mod prelude {
    pub use crate::core::{
        eq, lt, Condition, DatabaseSection, DriverKind, Engine, EngineQuery, EngineSettings,
        EntityDef, FieldDef, FieldKind, IdentityPolicy, Operator, PendingQuery, Persistable,
        QueryBuilder, Result, Row, Rows, SessionHandle, Store, StoreConfig, StoreError, Value,
    };

    #[cfg(feature = "sqlite")]
    pub use crate::backends::SqliteEngine;
}

// Re-export at root level for convenience
pub use crate::core::{
    eq, lt, Condition, DatabaseSection, DriverKind, Engine, EngineQuery, EngineSettings, EntityDef,
    FieldDef, FieldKind, IdentityPolicy, Operator, PendingQuery, Persistable, QueryBuilder, Result,
    Row, Rows, SessionHandle, Store, StoreConfig, StoreError, Value,
};

#[cfg(feature = "sqlite")]
pub use crate::backends::SqliteEngine;
