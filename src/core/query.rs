//! Fluent query building
//!
//! Queries are assembled clause by clause against entity names, never
//! table names, and executed through the store that produced the builder:
//!
//! ```ignore
//! let adults = store
//!     .query::<Employee>()
//!     .from()
//!     .where_cond(eq("role", "engineer"))
//!     .collect()
//!     .await?;
//! ```
//!
//! A builder is either a read or a deletion, decided by whether
//! [`delete`](QueryBuilder::delete) was called, and the terminal must
//! match: [`collect`](QueryBuilder::collect) for reads,
//! [`execute`](QueryBuilder::execute) for deletions. Calling the wrong
//! terminal is a contract violation and fails before anything reaches
//! the database.

use std::marker::PhantomData;

use indexmap::IndexMap;

use super::entity::{EntityDef, Persistable};
use super::error::{Result, StoreError};
use super::store::Store;
use super::value::Value;

/// Comparison operators available to [`Condition`]s
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// Equality
    Eq,
    /// Strictly less than
    Lt,
}

impl Operator {
    /// SQL symbol for this operator
    pub fn as_sql(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Lt => "<",
        }
    }
}

/// A single field comparison
///
/// Built through [`eq`] and [`lt`] rather than directly, so call sites
/// read like the clause they produce.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    field: String,
    operator: Operator,
    value: Value,
}

impl Condition {
    /// Field name the comparison applies to
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Comparison operator
    pub fn operator(&self) -> Operator {
        self.operator
    }

    /// Value the field is compared against
    pub fn value(&self) -> &Value {
        &self.value
    }
}

/// Equality condition on a field
pub fn eq<S: Into<String>, V: Into<Value>>(field: S, value: V) -> Condition {
    Condition {
        field: field.into(),
        operator: Operator::Eq,
        value: value.into(),
    }
}

/// Less-than condition on a field
pub fn lt<S: Into<String>, V: Into<Value>>(field: S, value: V) -> Condition {
    Condition {
        field: field.into(),
        operator: Operator::Lt,
        value: value.into(),
    }
}

/// Accumulated query state
///
/// Pure bookkeeping with no database access: clauses append text, bind
/// parameters, and flip the deletion flag. The store turns the finished
/// state into an engine query at execution time.
#[derive(Debug, Clone)]
pub struct PendingQuery {
    entity: &'static EntityDef,
    text: String,
    params: IndexMap<String, Value>,
    delete: bool,
}

impl PendingQuery {
    /// Start an empty query against one entity
    pub fn new(entity: &'static EntityDef) -> Self {
        Self {
            entity,
            text: String::new(),
            params: IndexMap::new(),
            delete: false,
        }
    }

    /// Append the `FROM` clause for the entity
    pub fn push_from(&mut self) {
        if self.text.is_empty() {
            self.text = format!("FROM {}", self.entity.name);
        } else {
            self.text.push_str(&format!(" FROM {}", self.entity.name));
        }
    }

    /// Append a `WHERE` clause and bind its parameter
    ///
    /// The parameter is named after the condition's field; a later clause
    /// on the same field rebinds it.
    pub fn push_where(&mut self, condition: Condition) {
        self.text.push_str(&format!(
            " WHERE {} {} :{}",
            condition.field,
            condition.operator.as_sql(),
            condition.field
        ));
        self.params.insert(condition.field, condition.value);
    }

    /// Mark the query as a deletion
    pub fn mark_delete(&mut self) {
        self.text.push_str(" DELETE");
        self.delete = true;
    }

    /// Entity the query targets
    pub fn entity(&self) -> &'static EntityDef {
        self.entity
    }

    /// Entity-level query text accumulated so far
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Parameters bound so far, in binding order
    pub fn parameters(&self) -> &IndexMap<String, Value> {
        &self.params
    }

    /// Whether [`mark_delete`](Self::mark_delete) was called
    pub fn is_delete(&self) -> bool {
        self.delete
    }
}

/// Fluent query builder tied to a store
///
/// Obtained from [`Store::query`]; consumed by its terminal method.
pub struct QueryBuilder<'a, E: Persistable> {
    store: &'a Store,
    pending: PendingQuery,
    _entity: PhantomData<E>,
}

impl<'a, E: Persistable> QueryBuilder<'a, E> {
    pub(crate) fn new(store: &'a Store) -> Self {
        Self {
            store,
            pending: PendingQuery::new(E::descriptor()),
            _entity: PhantomData,
        }
    }

    /// Add the `FROM` clause naming the entity
    #[must_use]
    pub fn from(mut self) -> Self {
        self.pending.push_from();
        self
    }

    /// Turn the query into a deletion
    #[must_use]
    pub fn delete(mut self) -> Self {
        self.pending.mark_delete();
        self
    }

    /// Restrict the query with a condition
    ///
    /// Each call appends its own `WHERE` fragment; conditions are not
    /// merged.
    #[must_use]
    pub fn where_cond(mut self, condition: Condition) -> Self {
        self.pending.push_where(condition);
        self
    }

    /// Accumulated query state
    pub fn pending(&self) -> &PendingQuery {
        &self.pending
    }

    /// Run a read query and hydrate the matching entities
    ///
    /// Returns `Ok(None)` when execution fails; the failure is logged by
    /// the store. A builder marked for deletion refuses this terminal.
    pub async fn collect(self) -> Result<Option<Vec<E>>> {
        if self.pending.is_delete() {
            return Err(StoreError::contract(
                "cannot collect a query marked for deletion; call execute()",
            ));
        }
        Ok(self.store.execute_select::<E>(&self.pending).await)
    }

    /// Run a deletion and report the affected row count
    ///
    /// Returns `Ok(0)` when execution fails; the failure is logged by the
    /// store. A builder not marked for deletion refuses this terminal.
    pub async fn execute(self) -> Result<u64> {
        if !self.pending.is_delete() {
            return Err(StoreError::contract(
                "cannot execute a query not marked for deletion; call collect()",
            ));
        }
        Ok(self.store.execute_delete(&self.pending).await)
    }
}
