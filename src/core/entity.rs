//! Entity descriptors and the persistable trait
//!
//! Structural metadata lives in `&'static` descriptor values instead of
//! runtime reflection: each persistable type declares one [`EntityDef`]
//! describing its storage name, identity, and fields, and the engine is
//! told about those descriptors at store construction.

use serde::{Deserialize, Serialize};

use super::error::Result;
use super::value::Row;

/// Storage classes a field can map to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldKind {
    /// Boolean flag
    Bool,
    /// 32-bit integer
    Int,
    /// 64-bit integer
    Long,
    /// 32-bit floating point
    Float,
    /// 64-bit floating point
    Double,
    /// Text
    Text,
    /// Binary data
    Bytes,
    /// UTC timestamp
    Timestamp,
}

impl FieldKind {
    /// String representation of the field kind
    pub fn to_str(&self) -> &'static str {
        match self {
            FieldKind::Bool => "bool",
            FieldKind::Int => "int",
            FieldKind::Long => "long",
            FieldKind::Float => "float",
            FieldKind::Double => "double",
            FieldKind::Text => "text",
            FieldKind::Bytes => "bytes",
            FieldKind::Timestamp => "timestamp",
        }
    }
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_str())
    }
}

/// How an entity's identity value is produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdentityPolicy {
    /// The engine assigns the identity on insert
    Engine,
    /// The caller supplies the identity before saving
    Caller,
}

/// One declared field of a persistable type
///
/// `default` is an optional storage-side literal, rendered verbatim into
/// the engine's schema statement; it applies when an insert row omits the
/// field entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDef {
    /// Field name as it appears in the entity and in query text
    pub name: &'static str,
    /// Storage column name
    pub column: &'static str,
    /// Storage class of the field
    pub kind: FieldKind,
    /// Optional storage-side default literal
    pub default: Option<&'static str>,
}

/// Structural description of one persistable type
///
/// Descriptors are const-constructible and live for the whole program:
///
/// ```
/// use minorm::core::entity::{EntityDef, FieldDef, FieldKind, IdentityPolicy};
///
/// static EMPLOYEE: EntityDef = EntityDef {
///     name: "Employee",
///     table: "employee",
///     identity: "id",
///     identity_policy: IdentityPolicy::Engine,
///     fields: &[
///         FieldDef { name: "name", column: "name", kind: FieldKind::Text, default: None },
///         FieldDef { name: "age", column: "age", kind: FieldKind::Int, default: Some("18") },
///     ],
/// };
/// ```
///
/// Equality and hashing go by entity name: the name is the identity of the
/// descriptor itself.
#[derive(Debug)]
pub struct EntityDef {
    /// Entity name used in query text
    pub name: &'static str,
    /// Storage table name
    pub table: &'static str,
    /// Name of the identity field (also its column name)
    pub identity: &'static str,
    /// How identity values are produced
    pub identity_policy: IdentityPolicy,
    /// Declared data fields, identity excluded
    pub fields: &'static [FieldDef],
}

impl EntityDef {
    /// Look up a declared field by name
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Check the descriptor for structural problems
    ///
    /// Returns the first problem found: blank names, a field duplicating
    /// another field, or a field shadowing the identity. Discovery skips
    /// descriptors that fail this check.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("entity name is blank".to_string());
        }
        if self.table.trim().is_empty() {
            return Err("table name is blank".to_string());
        }
        if self.identity.trim().is_empty() {
            return Err("identity field name is blank".to_string());
        }
        for (i, field) in self.fields.iter().enumerate() {
            if field.name.trim().is_empty() || field.column.trim().is_empty() {
                return Err(format!("field #{i} has a blank name or column"));
            }
            if field.name == self.identity {
                return Err(format!("field '{}' shadows the identity field", field.name));
            }
            if self.fields[..i].iter().any(|f| f.name == field.name) {
                return Err(format!("duplicate field '{}'", field.name));
            }
        }
        Ok(())
    }
}

impl PartialEq for EntityDef {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for EntityDef {}

impl std::hash::Hash for EntityDef {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

/// A type the store can persist and retrieve
///
/// Implemented manually per entity type; pair every implementation with a
/// [`register_entity!`](crate::register_entity) invocation so discovery
/// can find the descriptor.
///
/// `to_row` covers the data fields only; the store adds the identity to
/// the row when the entity carries one. A field omitted from the row is
/// omitted from the insert, letting a declared storage default apply.
pub trait Persistable: Sized {
    /// The descriptor for this type
    fn descriptor() -> &'static EntityDef;

    /// Convert the entity's data fields into a row
    fn to_row(&self) -> Row;

    /// Rebuild an entity from a row returned by the engine
    fn from_row(row: &Row) -> Result<Self>;

    /// The entity's identity, if it has been persisted or assigned
    fn identity(&self) -> Option<i64>;

    /// Record an engine-assigned identity on the entity
    fn set_identity(&mut self, id: i64);
}
