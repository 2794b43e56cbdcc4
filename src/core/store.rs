//! Persistence store
//!
//! [`Store`] is the public face of the crate: construction resolves
//! configuration, snapshots the discovered entity set, and hands both to
//! an engine; afterwards the store exposes entity-level persistence
//! (`save`, `update`, `get_all`) and the query builder.
//!
//! Failure policy follows two rules. Caller mistakes, an unregistered
//! entity type or a mismatched builder terminal, come back as errors
//! before the engine is touched. Operation failures inside the engine
//! are rolled back, logged with the entity name, and absorbed: `save`
//! and `update` return as if nothing happened, reads come back absent,
//! deletions report zero rows. Callers that need stronger signals watch
//! the logs or drive a [`SessionHandle`](super::engine::SessionHandle)
//! directly.

use std::collections::HashSet;
use std::path::Path;

use tracing::{error, info, warn};

use super::config::StoreConfig;
use super::engine::{Engine, EngineQuery, EngineSettings, SessionHandle};
use super::entity::{EntityDef, IdentityPolicy, Persistable};
use super::error::{Result, StoreError};
use super::query::{PendingQuery, QueryBuilder};
use super::registry;
use super::value::{Rows, Value};

#[cfg(feature = "sqlite")]
use crate::backends::sqlite::SqliteEngine;
#[cfg(feature = "sqlite")]
use super::driver::DriverKind;

/// Entity-level persistence over one configured database
pub struct Store {
    engine: Box<dyn Engine>,
    entities: HashSet<&'static EntityDef>,
    settings: EngineSettings,
}

impl Store {
    /// Open a store from a configuration file
    ///
    /// Reads the TOML document at `path`, then proceeds as
    /// [`from_config`](Self::from_config).
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = StoreConfig::from_path(path)?;
        Self::from_config(config).await
    }

    /// Open a store from a parsed configuration
    ///
    /// Picks the built-in engine for the configured driver. Only SQLite
    /// ships with one; other drivers must come through
    /// [`with_engine`](Self::with_engine).
    pub async fn from_config(config: StoreConfig) -> Result<Self> {
        let (kind, settings) = config.resolve()?;
        match kind {
            #[cfg(feature = "sqlite")]
            DriverKind::Sqlite => Self::assemble(Box::new(SqliteEngine::new()), settings).await,
            other => Err(StoreError::configuration(format!(
                "no built-in engine for driver '{}'; supply one with Store::with_engine",
                other.as_str()
            ))),
        }
    }

    /// Open a store over a caller-provided engine
    ///
    /// The configuration still decides credentials and the schema mode;
    /// the engine decides what to do with them.
    pub async fn with_engine(engine: Box<dyn Engine>, config: StoreConfig) -> Result<Self> {
        let (_, settings) = config.resolve()?;
        Self::assemble(engine, settings).await
    }

    async fn assemble(engine: Box<dyn Engine>, settings: EngineSettings) -> Result<Self> {
        let mut discovered: Vec<&'static EntityDef> = registry::discover().into_iter().collect();
        discovered.sort_by_key(|def| def.name);
        engine.register(&discovered, &settings).await?;
        info!(
            "store ready: {} dialect, {} registered entities",
            engine.dialect(),
            discovered.len()
        );
        Ok(Self {
            engine,
            entities: discovered.into_iter().collect(),
            settings,
        })
    }

    /// Registered entity descriptors
    pub fn entities(&self) -> &HashSet<&'static EntityDef> {
        &self.entities
    }

    /// SQL dialect of the underlying engine
    pub fn dialect(&self) -> &'static str {
        self.engine.dialect()
    }

    /// Resolved settings the engine was registered with
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Insert a new entity
    ///
    /// On success the engine-assigned identity is written back into the
    /// entity. Operation failures roll back, log, and leave the entity
    /// untouched; only an unregistered type is an error. Under the
    /// engine-assigned policy an entity that already carries an identity
    /// is absorbed as a failure rather than inserted again;
    /// [`update`](Self::update) is the write-back path.
    pub async fn save<E: Persistable>(&self, entity: &mut E) -> Result<()> {
        let def = E::descriptor();
        self.require_registered(def)?;

        if def.identity_policy == IdentityPolicy::Engine {
            if let Some(id) = entity.identity() {
                error!(
                    "error saving {}: entity already has identity {}; update() writes it back",
                    def.name, id
                );
                return Ok(());
            }
        }

        let mut row = entity.to_row();
        if let Some(id) = entity.identity() {
            row.insert(def.identity.to_string(), Value::Long(id));
        }

        let mut session = match self.engine.open_session().await {
            Ok(session) => session,
            Err(err) => {
                error!("error saving {}: {}", def.name, err);
                return Ok(());
            }
        };

        let mut begun = false;
        let outcome = async {
            session.begin().await?;
            begun = true;
            let id = session.persist(def, row).await?;
            session.commit().await?;
            Ok::<i64, StoreError>(id)
        }
        .await;

        match outcome {
            Ok(id) => {
                entity.set_identity(id);
                Self::finish(session, def, begun, false).await;
            }
            Err(err) => {
                error!("error saving {}: {}", def.name, err);
                Self::finish(session, def, begun, true).await;
            }
        }
        Ok(())
    }

    /// Write an entity back at its current identity
    ///
    /// An entity without an identity is stored as a new record. Failures
    /// follow the same absorb-and-log policy as [`save`](Self::save).
    pub async fn update<E: Persistable>(&self, entity: &E) -> Result<()> {
        let def = E::descriptor();
        self.require_registered(def)?;

        let mut row = entity.to_row();
        if let Some(id) = entity.identity() {
            row.insert(def.identity.to_string(), Value::Long(id));
        }

        let mut session = match self.engine.open_session().await {
            Ok(session) => session,
            Err(err) => {
                error!("error updating {}: {}", def.name, err);
                return Ok(());
            }
        };

        let mut begun = false;
        let outcome = async {
            session.begin().await?;
            begun = true;
            session.merge(def, row).await?;
            session.commit().await?;
            Ok::<(), StoreError>(())
        }
        .await;

        if let Err(err) = outcome {
            error!("error updating {}: {}", def.name, err);
            Self::finish(session, def, begun, true).await;
        } else {
            Self::finish(session, def, begun, false).await;
        }
        Ok(())
    }

    /// Fetch every stored entity of one type
    ///
    /// Runs outside any transaction. Returns `None` when the read fails;
    /// the failure is logged.
    pub async fn get_all<E: Persistable>(&self) -> Option<Vec<E>> {
        let def = E::descriptor();
        let query = EngineQuery::for_entity(def, format!("FROM {}", def.name));

        let mut session = match self.engine.open_session().await {
            Ok(session) => session,
            Err(err) => {
                error!("error retrieving {} rows: {}", def.name, err);
                return None;
            }
        };

        let outcome = async {
            let rows = session.result_list(&query).await?;
            Self::hydrate::<E>(rows)
        }
        .await;

        match outcome {
            Ok(found) => {
                Self::finish(session, def, false, false).await;
                Some(found)
            }
            Err(err) => {
                error!("error retrieving {} rows: {}", def.name, err);
                Self::finish(session, def, false, false).await;
                None
            }
        }
    }

    /// Start a query against one entity type
    pub fn query<E: Persistable>(&self) -> QueryBuilder<'_, E> {
        QueryBuilder::new(self)
    }

    /// Transactional select used by the query builder
    ///
    /// Begins, binds, executes, hydrates, commits. Any failure rolls the
    /// transaction back, logs, and yields `None`. The session is released
    /// on every path.
    pub(crate) async fn execute_select<E: Persistable>(
        &self,
        pending: &PendingQuery,
    ) -> Option<Vec<E>> {
        let def = pending.entity();
        let query = Self::engine_query(pending);

        let mut session = match self.engine.open_session().await {
            Ok(session) => session,
            Err(err) => {
                error!("query against {} failed: {}", def.name, err);
                return None;
            }
        };

        let mut begun = false;
        let outcome = async {
            session.begin().await?;
            begun = true;
            let rows = session.result_list(&query).await?;
            let found = Self::hydrate::<E>(rows)?;
            session.commit().await?;
            Ok::<Vec<E>, StoreError>(found)
        }
        .await;

        match outcome {
            Ok(found) => {
                Self::finish(session, def, begun, false).await;
                Some(found)
            }
            Err(err) => {
                error!("query against {} failed: {}", def.name, err);
                Self::finish(session, def, begun, true).await;
                None
            }
        }
    }

    /// Transactional bulk delete used by the query builder
    ///
    /// Same shape as [`execute_select`](Self::execute_select); failures
    /// yield an affected count of zero.
    pub(crate) async fn execute_delete(&self, pending: &PendingQuery) -> u64 {
        let def = pending.entity();
        let query = Self::engine_query(pending);

        let mut session = match self.engine.open_session().await {
            Ok(session) => session,
            Err(err) => {
                error!("delete against {} failed: {}", def.name, err);
                return 0;
            }
        };

        let mut begun = false;
        let outcome = async {
            session.begin().await?;
            begun = true;
            let affected = session.execute_update(&query).await?;
            session.commit().await?;
            Ok::<u64, StoreError>(affected)
        }
        .await;

        match outcome {
            Ok(affected) => {
                Self::finish(session, def, begun, false).await;
                affected
            }
            Err(err) => {
                error!("delete against {} failed: {}", def.name, err);
                Self::finish(session, def, begun, true).await;
                0
            }
        }
    }

    fn require_registered(&self, def: &'static EntityDef) -> Result<()> {
        if self.entities.contains(def) {
            Ok(())
        } else {
            Err(StoreError::contract(format!(
                "'{}' is not a registered persistable type; mark it with register_entity!",
                def.name
            )))
        }
    }

    fn engine_query(pending: &PendingQuery) -> EngineQuery {
        let mut query = EngineQuery::for_entity(pending.entity(), pending.text());
        for (name, value) in pending.parameters() {
            query = query.set_parameter(name.clone(), value.clone());
        }
        query
    }

    fn hydrate<E: Persistable>(rows: Rows) -> Result<Vec<E>> {
        rows.iter().map(E::from_row).collect()
    }

    /// Roll back if asked, then release the session exactly once
    async fn finish(
        mut session: Box<dyn SessionHandle>,
        def: &'static EntityDef,
        begun: bool,
        failed: bool,
    ) {
        if failed && begun {
            if let Err(err) = session.rollback().await {
                warn!("rollback after failed {} operation also failed: {}", def.name, err);
            }
        }
        if let Err(err) = session.close().await {
            warn!("failed to release session for {}: {}", def.name, err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::engine::SessionHandle;
    use crate::core::entity::{FieldDef, FieldKind, IdentityPolicy};
    use crate::core::query::{eq, lt};
    use crate::core::value::Row;
    use async_trait::async_trait;

    struct NullEngine;

    #[async_trait]
    impl Engine for NullEngine {
        fn dialect(&self) -> &'static str {
            "null"
        }

        async fn register(
            &self,
            _entities: &[&'static EntityDef],
            _settings: &EngineSettings,
        ) -> Result<()> {
            Ok(())
        }

        async fn open_session(&self) -> Result<Box<dyn SessionHandle>> {
            Err(StoreError::connection("null engine holds no sessions"))
        }
    }

    static GADGET: EntityDef = EntityDef {
        name: "StoreGadget",
        table: "store_gadget",
        identity: "id",
        identity_policy: IdentityPolicy::Engine,
        fields: &[FieldDef {
            name: "label",
            column: "label",
            kind: FieldKind::Text,
            default: None,
        }],
    };

    #[derive(Debug)]
    struct Gadget {
        id: Option<i64>,
        label: String,
    }

    impl Persistable for Gadget {
        fn descriptor() -> &'static EntityDef {
            &GADGET
        }

        fn to_row(&self) -> Row {
            let mut row = Row::new();
            row.insert("label".to_string(), Value::from(self.label.clone()));
            row
        }

        fn from_row(row: &Row) -> Result<Self> {
            Ok(Gadget {
                id: row.get("id").and_then(Value::as_long),
                label: row
                    .get("label")
                    .map(Value::as_string)
                    .ok_or_else(|| StoreError::missing_field("label"))?,
            })
        }

        fn identity(&self) -> Option<i64> {
            self.id
        }

        fn set_identity(&mut self, id: i64) {
            self.id = Some(id);
        }
    }

    crate::register_entity!(Gadget);

    static STRAY: EntityDef = EntityDef {
        name: "StrayGadget",
        table: "stray_gadget",
        identity: "id",
        identity_policy: IdentityPolicy::Engine,
        fields: &[],
    };

    struct Stray;

    impl Persistable for Stray {
        fn descriptor() -> &'static EntityDef {
            &STRAY
        }

        fn to_row(&self) -> Row {
            Row::new()
        }

        fn from_row(_row: &Row) -> Result<Self> {
            Ok(Stray)
        }

        fn identity(&self) -> Option<i64> {
            None
        }

        fn set_identity(&mut self, _id: i64) {}
    }

    fn sqlite_config() -> StoreConfig {
        StoreConfig::from_toml(
            r#"
            [database]
            driver = "sqlite"
            url = "sqlite::memory:"
            "#,
        )
        .unwrap()
    }

    async fn null_store() -> Store {
        Store::with_engine(Box::new(NullEngine), sqlite_config())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_with_engine_snapshots_discovered_entities() {
        let store = null_store().await;
        assert!(store.entities().contains(&GADGET));
        assert_eq!(store.dialect(), "null");
        assert_eq!(store.settings().url, "db:sqlite::memory:");
    }

    #[tokio::test]
    async fn test_save_rejects_unregistered_type() {
        let store = null_store().await;
        let mut stray = Stray;
        let err = store.save(&mut stray).await.unwrap_err();
        assert!(err.is_contract());
        assert!(err.to_string().contains("StrayGadget"));
    }

    #[tokio::test]
    async fn test_update_rejects_unregistered_type() {
        let store = null_store().await;
        let err = store.update(&Stray).await.unwrap_err();
        assert!(err.is_contract());
    }

    #[tokio::test]
    async fn test_save_absorbs_engine_failure() {
        let store = null_store().await;
        let mut gadget = Gadget {
            id: None,
            label: "widget".to_string(),
        };
        store.save(&mut gadget).await.unwrap();
        assert_eq!(gadget.id, None);
    }

    #[tokio::test]
    async fn test_get_all_absorbs_engine_failure() {
        let store = null_store().await;
        assert!(store.get_all::<Gadget>().await.is_none());
    }

    #[tokio::test]
    async fn test_collect_rejected_on_delete_builder() {
        let store = null_store().await;
        let err = store
            .query::<Gadget>()
            .from()
            .delete()
            .collect()
            .await
            .unwrap_err();
        assert!(err.is_contract());
    }

    #[tokio::test]
    async fn test_execute_rejected_on_select_builder() {
        let store = null_store().await;
        let err = store.query::<Gadget>().from().execute().await.unwrap_err();
        assert!(err.is_contract());
    }

    #[tokio::test]
    async fn test_select_absorbs_engine_failure() {
        let store = null_store().await;
        let found = store
            .query::<Gadget>()
            .from()
            .where_cond(eq("label", "widget"))
            .collect()
            .await
            .unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_delete_absorbs_engine_failure() {
        let store = null_store().await;
        let affected = store
            .query::<Gadget>()
            .from()
            .where_cond(lt("id", 10i64))
            .delete()
            .execute()
            .await
            .unwrap();
        assert_eq!(affected, 0);
    }

    #[tokio::test]
    async fn test_builder_accumulates_through_store() {
        let store = null_store().await;
        let builder = store
            .query::<Gadget>()
            .from()
            .where_cond(eq("label", "widget"));
        assert_eq!(
            builder.pending().text(),
            "FROM StoreGadget WHERE label = :label"
        );
    }

    #[cfg(not(feature = "sqlite"))]
    #[tokio::test]
    async fn test_from_config_without_builtin_engine() {
        let err = Store::from_config(sqlite_config())
            .await
            .err()
            .expect("configuration error");
        assert!(err.is_configuration());
    }

    #[tokio::test]
    async fn test_from_config_server_driver_needs_custom_engine() {
        let config = StoreConfig::from_toml(
            r#"
            [database]
            driver = "mysql"
            url = "mysql://localhost/app"
            username = "app"
            password = "secret"
            "#,
        )
        .unwrap();
        let err = Store::from_config(config)
            .await
            .err()
            .expect("configuration error");
        assert!(err.is_configuration());
        assert!(err.to_string().contains("with_engine"));
    }
}
