//! Engine abstraction
//!
//! An [`Engine`] owns connectivity to one database and hands out
//! [`SessionHandle`]s, the unit-of-work surface the store drives. The
//! split mirrors how the store uses them: the engine is configured once
//! with the discovered entity set, sessions are opened per operation and
//! closed when the operation ends, successfully or not.
//!
//! Queries cross this boundary as [`EngineQuery`]: entity-level text plus
//! named parameters. Translating field and entity names into SQL is the
//! engine's job, which keeps dialect knowledge out of the query builder.

use async_trait::async_trait;
use indexmap::IndexMap;

use super::entity::EntityDef;
use super::error::Result;
use super::value::{Row, Rows, Value};

/// Resolved connection settings handed to an engine
///
/// Produced by [`StoreConfig::resolve`](super::config::StoreConfig::resolve).
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// SQL dialect the driver speaks
    pub dialect: &'static str,
    /// Crate providing connectivity
    pub driver: &'static str,
    /// Connection URL including the `db:` scheme
    pub url: String,
    /// Username, absent for embedded databases
    pub username: Option<String>,
    /// Password, absent for embedded databases
    pub password: Option<String>,
    /// Schema management mode, interpreted by the engine
    pub ddl: Option<String>,
}

/// An entity-level query with named parameters
///
/// The text speaks in entity and field names; engines translate those to
/// table and column names when executing. Parameters keep their insertion
/// order so diagnostics read the way the query was built.
#[derive(Debug, Clone)]
pub struct EngineQuery {
    entity: Option<&'static EntityDef>,
    text: String,
    params: IndexMap<String, Value>,
}

impl EngineQuery {
    /// Create a query with no entity association
    pub fn new<S: Into<String>>(text: S) -> Self {
        Self {
            entity: None,
            text: text.into(),
            params: IndexMap::new(),
        }
    }

    /// Create a query scoped to one entity
    pub fn for_entity<S: Into<String>>(entity: &'static EntityDef, text: S) -> Self {
        Self {
            entity: Some(entity),
            text: text.into(),
            params: IndexMap::new(),
        }
    }

    /// Bind a named parameter
    #[must_use]
    pub fn set_parameter<S: Into<String>, V: Into<Value>>(mut self, name: S, value: V) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Entity this query is scoped to, if any
    pub fn entity(&self) -> Option<&'static EntityDef> {
        self.entity
    }

    /// Entity-level query text
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Bound parameters in insertion order
    pub fn parameters(&self) -> &IndexMap<String, Value> {
        &self.params
    }
}

/// Connectivity to one database
#[async_trait]
pub trait Engine: Send + Sync {
    /// SQL dialect this engine speaks
    fn dialect(&self) -> &'static str;

    /// Connect and prepare schema for the discovered entities
    ///
    /// Called once at store construction. The engine connects to the
    /// database named by `settings`, records the entity set for later
    /// name translation, and applies whatever schema management the
    /// configured `ddl` mode calls for.
    async fn register(
        &self,
        entities: &[&'static EntityDef],
        settings: &EngineSettings,
    ) -> Result<()>;

    /// Open a session for one unit of work
    async fn open_session(&self) -> Result<Box<dyn SessionHandle>>;
}

/// One unit of work against an engine
///
/// Sessions are single-owner and not reentrant: at most one transaction
/// is open at a time, and [`close`](SessionHandle::close) must be called
/// exactly once when the work ends. Closing with a transaction still open
/// rolls it back.
#[async_trait]
pub trait SessionHandle: Send {
    /// Begin a transaction
    ///
    /// Fails if a transaction is already open on this session.
    async fn begin(&mut self) -> Result<()>;

    /// Commit the open transaction
    async fn commit(&mut self) -> Result<()>;

    /// Roll back the open transaction
    async fn rollback(&mut self) -> Result<()>;

    /// Release the session
    ///
    /// Idempotent; a second close is a no-op.
    async fn close(&mut self) -> Result<()>;

    /// Insert a new record, returning its identity
    async fn persist(&mut self, def: &'static EntityDef, row: Row) -> Result<i64>;

    /// Write a record at its existing identity
    async fn merge(&mut self, def: &'static EntityDef, row: Row) -> Result<()>;

    /// Run a read query and decode the matching rows
    async fn result_list(&mut self, query: &EngineQuery) -> Result<Rows>;

    /// Run a mutating query, returning the affected row count
    async fn execute_update(&mut self, query: &EngineQuery) -> Result<u64>;
}
