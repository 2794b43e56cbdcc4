//! Init-time type discovery
//!
//! Persistable types announce themselves before `main` runs: the
//! [`register_entity!`](crate::register_entity) macro emits a constructor
//! that submits the type's descriptor to a process-global registry, and
//! [`discover`] snapshots that registry at store construction. Nothing has
//! to maintain a hand-written list of entity types, and nothing walks the
//! filesystem looking for them.
//!
//! The corresponding scope limitation: only code that actually links into
//! the binary and runs its constructors is discovered. An entity compiled
//! out behind a feature flag, or living in a crate the binary never
//! depends on, will not appear.

use std::collections::HashSet;
use std::sync::LazyLock;

use parking_lot::RwLock;
use tracing::warn;

use super::entity::EntityDef;

static REGISTRY: LazyLock<RwLock<Vec<&'static EntityDef>>> =
    LazyLock::new(|| RwLock::new(Vec::new()));

/// Submit a descriptor for discovery
///
/// Called by the constructors [`register_entity!`](crate::register_entity)
/// emits; safe to call from application code as well when generating
/// descriptors dynamically is unavoidable.
pub fn submit(def: &'static EntityDef) {
    REGISTRY.write().push(def);
}

/// Snapshot every well-formed registered descriptor
///
/// Malformed descriptors are skipped with a warning rather than aborting
/// discovery, and duplicate registrations of one entity name keep the
/// first submission. The returned set carries no ordering guarantee.
pub fn discover() -> HashSet<&'static EntityDef> {
    let mut found = HashSet::new();
    for def in REGISTRY.read().iter() {
        if let Err(reason) = def.validate() {
            warn!("skipping malformed descriptor for '{}': {}", def.name, reason);
            continue;
        }
        if !found.insert(*def) {
            warn!("duplicate registration for '{}' ignored", def.name);
        }
    }
    found
}

/// Mark a type as persistable
///
/// Expands to an init-time constructor that submits the type's descriptor
/// to the discovery registry. Invoke it once, next to the `Persistable`
/// implementation:
///
/// ```ignore
/// impl Persistable for Employee { /* .. */ }
///
/// minorm::register_entity!(Employee);
/// ```
#[macro_export]
macro_rules! register_entity {
    ($entity:ty) => {
        const _: () = {
            #[$crate::__reexports::ctor::ctor(unsafe, anonymous, crate_path = $crate::__reexports::ctor)]
            fn register_persistable() {
                $crate::core::registry::submit(
                    <$entity as $crate::core::entity::Persistable>::descriptor(),
                );
            }
        };
    };
}
