//! SQLite execution engine
//!
//! Serves the embedded driver over a single `rusqlite` connection.
//! rusqlite is synchronous, so every database touch is offloaded to the
//! blocking thread pool and raced against a timeout; the connection
//! lives in an async mutex shared between the engine and the sessions
//! it opens.
//!
//! Queries arrive in entity-level text (`FROM Employee WHERE age < :age`)
//! and are translated against the registered descriptors before
//! execution: entity names become table names, field names become column
//! names, everything else passes through untouched.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::DateTime;
use parking_lot::RwLock;
use rusqlite::{Connection, ToSql};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::core::engine::{Engine, EngineQuery, EngineSettings, SessionHandle};
use crate::core::entity::{EntityDef, FieldKind, IdentityPolicy};
use crate::core::error::{Result, StoreError};
use crate::core::value::{Row, Rows, Value};

/// Default timeout for database operations (30 seconds)
const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection URL prefix this engine understands
const URL_PREFIX: &str = "db:sqlite:";

/// SQLite implementation of the [`Engine`] capability
pub struct SqliteEngine {
    connection: Arc<Mutex<Option<Connection>>>,
    entities: Arc<RwLock<HashMap<&'static str, &'static EntityDef>>>,
}

impl SqliteEngine {
    /// Create an unconnected engine
    pub fn new() -> Self {
        Self {
            connection: Arc::new(Mutex::new(None)),
            entities: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    async fn connect(&self, path: &str) -> Result<()> {
        // Clean up any existing connection first
        {
            let mut connection = self.connection.lock().await;
            *connection = None;
        }

        let path = path.to_string();
        let connection_arc = Arc::clone(&self.connection);

        let mut task = tokio::task::spawn_blocking(move || -> Result<()> {
            let conn = Connection::open(&path)?;

            conn.execute("PRAGMA foreign_keys = ON", [])?;

            let mut connection = connection_arc.blocking_lock();
            *connection = Some(conn);

            Ok(())
        });

        tokio::select! {
            result = &mut task => {
                result.map_err(|e| StoreError::other(format!("task join error: {}", e)))?
            }
            _ = tokio::time::sleep(DEFAULT_OPERATION_TIMEOUT) => {
                task.abort();
                Err(StoreError::timeout(DEFAULT_OPERATION_TIMEOUT.as_millis() as u64))
            }
        }
    }

    async fn apply_schema(
        &self,
        entities: &[&'static EntityDef],
        ddl: Option<&str>,
    ) -> Result<()> {
        let statements: Vec<String> = match ddl {
            Some("create") => entities
                .iter()
                .flat_map(|def| {
                    [
                        format!("DROP TABLE IF EXISTS {}", def.table),
                        Self::create_table_sql(def, false),
                    ]
                })
                .collect(),
            Some("update") => entities
                .iter()
                .map(|def| Self::create_table_sql(def, true))
                .collect(),
            None | Some("none") => Vec::new(),
            Some(other) => {
                warn!("unsupported ddl mode '{}'; leaving schema untouched", other);
                Vec::new()
            }
        };
        if statements.is_empty() {
            return Ok(());
        }

        let connection_arc = Arc::clone(&self.connection);

        let mut task = tokio::task::spawn_blocking(move || -> Result<()> {
            let connection = connection_arc.blocking_lock();
            let conn = connection
                .as_ref()
                .ok_or_else(|| StoreError::connection("not connected to database"))?;

            for statement in &statements {
                debug!("schema: {}", statement);
                conn.execute(statement, [])?;
            }
            Ok(())
        });

        tokio::select! {
            result = &mut task => {
                result.map_err(|e| StoreError::other(format!("task join error: {}", e)))?
            }
            _ = tokio::time::sleep(DEFAULT_OPERATION_TIMEOUT) => {
                task.abort();
                Err(StoreError::timeout(DEFAULT_OPERATION_TIMEOUT.as_millis() as u64))
            }
        }
    }

    /// Render the `CREATE TABLE` statement for one entity
    fn create_table_sql(def: &EntityDef, if_not_exists: bool) -> String {
        let mut columns = Vec::with_capacity(def.fields.len() + 1);
        columns.push(match def.identity_policy {
            IdentityPolicy::Engine => {
                format!("{} INTEGER PRIMARY KEY AUTOINCREMENT", def.identity)
            }
            IdentityPolicy::Caller => format!("{} INTEGER PRIMARY KEY", def.identity),
        });
        for field in def.fields {
            let mut column = format!("{} {}", field.column, column_type(field.kind));
            if let Some(default) = field.default {
                column.push_str(&format!(" DEFAULT {}", default));
            }
            columns.push(column);
        }
        format!(
            "CREATE TABLE {}{} ({})",
            if if_not_exists { "IF NOT EXISTS " } else { "" },
            def.table,
            columns.join(", ")
        )
    }
}

impl Default for SqliteEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Engine for SqliteEngine {
    fn dialect(&self) -> &'static str {
        "sqlite"
    }

    async fn register(
        &self,
        entities: &[&'static EntityDef],
        settings: &EngineSettings,
    ) -> Result<()> {
        if settings.dialect != "sqlite" {
            return Err(StoreError::configuration(format!(
                "sqlite engine cannot serve dialect '{}'",
                settings.dialect
            )));
        }
        let path = settings.url.strip_prefix(URL_PREFIX).ok_or_else(|| {
            StoreError::configuration(format!(
                "expected a connection URL of the form {}<path>, got '{}'",
                URL_PREFIX, settings.url
            ))
        })?;

        self.connect(path).await?;

        {
            let mut known = self.entities.write();
            known.clear();
            for def in entities {
                known.insert(def.name, *def);
            }
        }

        self.apply_schema(entities, settings.ddl.as_deref()).await?;
        info!(
            "sqlite engine ready at '{}' with {} entities",
            path,
            entities.len()
        );
        Ok(())
    }

    async fn open_session(&self) -> Result<Box<dyn SessionHandle>> {
        if self.connection.lock().await.is_none() {
            return Err(StoreError::connection(
                "not connected; register the engine first",
            ));
        }
        Ok(Box::new(SqliteSession {
            connection: Arc::clone(&self.connection),
            entities: self.entities.read().clone(),
            in_transaction: Arc::new(Mutex::new(false)),
            closed: false,
        }))
    }
}

/// One unit of work over the shared SQLite connection
pub struct SqliteSession {
    connection: Arc<Mutex<Option<Connection>>>,
    entities: HashMap<&'static str, &'static EntityDef>,
    in_transaction: Arc<Mutex<bool>>,
    closed: bool,
}

impl SqliteSession {
    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(StoreError::connection("session is closed"));
        }
        Ok(())
    }

    /// Run one connection-bound operation on the blocking pool
    async fn run_blocking<T, F>(&self, operation: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let connection_arc = Arc::clone(&self.connection);

        let mut task = tokio::task::spawn_blocking(move || -> Result<T> {
            let connection = connection_arc.blocking_lock();
            let conn = connection
                .as_ref()
                .ok_or_else(|| StoreError::connection("not connected to database"))?;
            operation(conn)
        });

        tokio::select! {
            result = &mut task => {
                result.map_err(|e| StoreError::other(format!("task join error: {}", e)))?
            }
            _ = tokio::time::sleep(DEFAULT_OPERATION_TIMEOUT) => {
                task.abort();
                Err(StoreError::timeout(DEFAULT_OPERATION_TIMEOUT.as_millis() as u64))
            }
        }
    }

    /// Resolve the entity named in the query text and rewrite its
    /// predicate tokens to column names
    fn parse_query(&self, query: &EngineQuery) -> Result<(&'static EntityDef, String)> {
        let tokens: Vec<&str> = query.text().split_whitespace().collect();
        let from_pos = tokens
            .iter()
            .position(|t| *t == "FROM")
            .ok_or_else(|| StoreError::query(format!("no FROM clause in '{}'", query.text())))?;
        if tokens[..from_pos].iter().any(|t| *t != "DELETE") {
            return Err(StoreError::query(format!(
                "unrecognized clause before FROM in '{}'",
                query.text()
            )));
        }
        let name = tokens
            .get(from_pos + 1)
            .ok_or_else(|| StoreError::query("FROM clause names no entity"))?;
        let def = *self
            .entities
            .get(name)
            .ok_or_else(|| StoreError::query(format!("unknown entity '{}'", name)))?;
        if let Some(expected) = query.entity() {
            if expected.name != def.name {
                return Err(StoreError::query(format!(
                    "query text names '{}' but is scoped to '{}'",
                    def.name, expected.name
                )));
            }
        }

        let mut predicate = Vec::new();
        for token in &tokens[from_pos + 2..] {
            match *token {
                "DELETE" => {}
                "WHERE" => predicate.push("WHERE".to_string()),
                t if t.starts_with(':') => predicate.push(t.to_string()),
                t if t == def.identity => predicate.push(t.to_string()),
                t => match def.field(t) {
                    Some(field) => predicate.push(field.column.to_string()),
                    None => predicate.push(t.to_string()),
                },
            }
        }
        Ok((def, predicate.join(" ")))
    }
}

#[async_trait]
impl SessionHandle for SqliteSession {
    async fn begin(&mut self) -> Result<()> {
        self.ensure_open()?;
        let connection_arc = Arc::clone(&self.connection);
        let in_transaction_arc = Arc::clone(&self.in_transaction);

        let mut task = tokio::task::spawn_blocking(move || -> Result<()> {
            // Both locks held together so the flag cannot race the statement
            let mut in_transaction = in_transaction_arc.blocking_lock();
            let connection = connection_arc.blocking_lock();
            let conn = connection
                .as_ref()
                .ok_or_else(|| StoreError::connection("not connected to database"))?;

            if *in_transaction {
                return Err(StoreError::transaction("already in a transaction"));
            }

            conn.execute("BEGIN TRANSACTION", [])?;
            *in_transaction = true;
            Ok(())
        });

        tokio::select! {
            result = &mut task => {
                result.map_err(|e| StoreError::other(format!("task join error: {}", e)))?
            }
            _ = tokio::time::sleep(DEFAULT_OPERATION_TIMEOUT) => {
                task.abort();
                Err(StoreError::timeout(DEFAULT_OPERATION_TIMEOUT.as_millis() as u64))
            }
        }
    }

    async fn commit(&mut self) -> Result<()> {
        self.ensure_open()?;
        let connection_arc = Arc::clone(&self.connection);
        let in_transaction_arc = Arc::clone(&self.in_transaction);

        let mut task = tokio::task::spawn_blocking(move || -> Result<()> {
            let mut in_transaction = in_transaction_arc.blocking_lock();
            let connection = connection_arc.blocking_lock();
            let conn = connection
                .as_ref()
                .ok_or_else(|| StoreError::connection("not connected to database"))?;

            if !*in_transaction {
                return Err(StoreError::transaction("not in a transaction"));
            }

            conn.execute("COMMIT", [])?;
            *in_transaction = false;
            Ok(())
        });

        tokio::select! {
            result = &mut task => {
                result.map_err(|e| StoreError::other(format!("task join error: {}", e)))?
            }
            _ = tokio::time::sleep(DEFAULT_OPERATION_TIMEOUT) => {
                task.abort();
                Err(StoreError::timeout(DEFAULT_OPERATION_TIMEOUT.as_millis() as u64))
            }
        }
    }

    async fn rollback(&mut self) -> Result<()> {
        self.ensure_open()?;
        let connection_arc = Arc::clone(&self.connection);
        let in_transaction_arc = Arc::clone(&self.in_transaction);

        let mut task = tokio::task::spawn_blocking(move || -> Result<()> {
            let mut in_transaction = in_transaction_arc.blocking_lock();
            let connection = connection_arc.blocking_lock();
            let conn = connection
                .as_ref()
                .ok_or_else(|| StoreError::connection("not connected to database"))?;

            if !*in_transaction {
                return Err(StoreError::transaction("not in a transaction"));
            }

            conn.execute("ROLLBACK", [])?;
            *in_transaction = false;
            Ok(())
        });

        tokio::select! {
            result = &mut task => {
                result.map_err(|e| StoreError::other(format!("task join error: {}", e)))?
            }
            _ = tokio::time::sleep(DEFAULT_OPERATION_TIMEOUT) => {
                task.abort();
                Err(StoreError::timeout(DEFAULT_OPERATION_TIMEOUT.as_millis() as u64))
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        let open = { *self.in_transaction.lock().await };
        if open {
            warn!("session closed with open transaction; rolling back");
            if let Err(err) = self.rollback().await {
                warn!("rollback during close failed: {}", err);
            }
        }
        self.closed = true;
        Ok(())
    }

    async fn persist(&mut self, def: &'static EntityDef, row: Row) -> Result<i64> {
        self.ensure_open()?;

        let mut columns: Vec<&'static str> = Vec::new();
        let mut params: Vec<(String, Value)> = Vec::new();

        // The engine assigns engine-policy identities; caller-policy
        // identities must arrive in the row.
        if def.identity_policy == IdentityPolicy::Caller {
            let id = row
                .get(def.identity)
                .cloned()
                .ok_or_else(|| StoreError::missing_field(def.identity))?;
            columns.push(def.identity);
            params.push((format!(":{}", def.identity), id));
        }
        for field in def.fields {
            if let Some(value) = row.get(field.name) {
                columns.push(field.column);
                params.push((format!(":{}", field.column), value.clone()));
            }
        }

        let sql = if columns.is_empty() {
            format!("INSERT INTO {} DEFAULT VALUES", def.table)
        } else {
            let placeholders: Vec<&str> = params.iter().map(|(name, _)| name.as_str()).collect();
            format!(
                "INSERT INTO {} ({}) VALUES ({})",
                def.table,
                columns.join(", "),
                placeholders.join(", ")
            )
        };
        debug!("persist: {}", sql);

        self.run_blocking(move |conn| {
            let boxed: Vec<(String, Box<dyn ToSql>)> = params
                .iter()
                .map(|(name, value)| (name.clone(), value_to_param(value)))
                .collect();
            let refs: Vec<(&str, &dyn ToSql)> = boxed
                .iter()
                .map(|(name, param)| (name.as_str(), param.as_ref()))
                .collect();
            conn.execute(&sql, &refs[..])?;
            Ok(conn.last_insert_rowid())
        })
        .await
    }

    async fn merge(&mut self, def: &'static EntityDef, row: Row) -> Result<()> {
        self.ensure_open()?;

        let mut columns: Vec<&'static str> = vec![def.identity];
        let mut params: Vec<(String, Value)> = vec![(
            format!(":{}", def.identity),
            row.get(def.identity).cloned().unwrap_or(Value::Null),
        )];
        for field in def.fields {
            if let Some(value) = row.get(field.name) {
                columns.push(field.column);
                params.push((format!(":{}", field.column), value.clone()));
            }
        }

        let placeholders: Vec<&str> = params.iter().map(|(name, _)| name.as_str()).collect();
        let sql = format!(
            "INSERT OR REPLACE INTO {} ({}) VALUES ({})",
            def.table,
            columns.join(", "),
            placeholders.join(", ")
        );
        debug!("merge: {}", sql);

        self.run_blocking(move |conn| {
            let boxed: Vec<(String, Box<dyn ToSql>)> = params
                .iter()
                .map(|(name, value)| (name.clone(), value_to_param(value)))
                .collect();
            let refs: Vec<(&str, &dyn ToSql)> = boxed
                .iter()
                .map(|(name, param)| (name.as_str(), param.as_ref()))
                .collect();
            conn.execute(&sql, &refs[..])?;
            Ok(())
        })
        .await
    }

    async fn result_list(&mut self, query: &EngineQuery) -> Result<Rows> {
        self.ensure_open()?;

        let (def, predicate) = self.parse_query(query)?;
        let (column_list, columns) = select_columns(def);
        let sql = if predicate.is_empty() {
            format!("SELECT {} FROM {}", column_list, def.table)
        } else {
            format!("SELECT {} FROM {} {}", column_list, def.table, predicate)
        };
        debug!("select: {}", sql);
        let params = named_params(query);

        self.run_blocking(move |conn| {
            let boxed: Vec<(String, Box<dyn ToSql>)> = params
                .iter()
                .map(|(name, value)| (name.clone(), value_to_param(value)))
                .collect();
            let refs: Vec<(&str, &dyn ToSql)> = boxed
                .iter()
                .map(|(name, param)| (name.as_str(), param.as_ref()))
                .collect();

            let mut stmt = conn.prepare(&sql)?;
            let mut rows = stmt.query(&refs[..])?;
            let mut results = Rows::new();
            while let Some(row) = rows.next()? {
                let mut decoded = Row::new();
                for (idx, (key, kind)) in columns.iter().enumerate() {
                    decoded.insert(key.clone(), read_value(row, idx, *kind)?);
                }
                results.push(decoded);
            }
            Ok(results)
        })
        .await
    }

    async fn execute_update(&mut self, query: &EngineQuery) -> Result<u64> {
        self.ensure_open()?;

        let (def, predicate) = self.parse_query(query)?;
        let sql = if predicate.is_empty() {
            format!("DELETE FROM {}", def.table)
        } else {
            format!("DELETE FROM {} {}", def.table, predicate)
        };
        debug!("delete: {}", sql);
        let params = named_params(query);

        self.run_blocking(move |conn| {
            let boxed: Vec<(String, Box<dyn ToSql>)> = params
                .iter()
                .map(|(name, value)| (name.clone(), value_to_param(value)))
                .collect();
            let refs: Vec<(&str, &dyn ToSql)> = boxed
                .iter()
                .map(|(name, param)| (name.as_str(), param.as_ref()))
                .collect();

            let mut stmt = conn.prepare(&sql)?;
            let affected = stmt.execute(&refs[..])?;
            Ok(affected as u64)
        })
        .await
    }
}

impl Drop for SqliteSession {
    fn drop(&mut self) {
        // Best-effort cleanup since Drop cannot be async
        if let Ok(in_trans) = self.in_transaction.try_lock() {
            if *in_trans {
                if let Ok(connection) = self.connection.try_lock() {
                    if let Some(conn) = connection.as_ref() {
                        let _ = conn.execute("ROLLBACK", []);
                    }
                }
            }
        }
    }
}

/// SQLite column type for a field kind
fn column_type(kind: FieldKind) -> &'static str {
    match kind {
        FieldKind::Bool | FieldKind::Int | FieldKind::Long => "INTEGER",
        FieldKind::Float | FieldKind::Double => "REAL",
        FieldKind::Text | FieldKind::Timestamp => "TEXT",
        FieldKind::Bytes => "BLOB",
    }
}

/// Convert a value to a rusqlite parameter
///
/// Timestamps are stored as RFC 3339 text so the column stays readable
/// in external tooling.
fn value_to_param(value: &Value) -> Box<dyn ToSql> {
    match value {
        Value::Null => Box::new(None::<i64>),
        Value::Bool(v) => Box::new(*v),
        Value::Int(v) => Box::new(*v),
        Value::Long(v) => Box::new(*v),
        Value::Float(v) => Box::new(*v),
        Value::Double(v) => Box::new(*v),
        Value::String(v) => Box::new(v.clone()),
        Value::Bytes(v) => Box::new(v.clone()),
        Value::Timestamp(_) => Box::new(value.as_string()),
    }
}

/// Decode one column, steered by the declared field kind
fn read_value(row: &rusqlite::Row<'_>, idx: usize, kind: FieldKind) -> rusqlite::Result<Value> {
    use rusqlite::types::ValueRef;

    let value = match row.get_ref(idx)? {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(v) => match kind {
            FieldKind::Bool => Value::Bool(v != 0),
            FieldKind::Int => i32::try_from(v).map(Value::Int).unwrap_or(Value::Long(v)),
            FieldKind::Timestamp => Value::Timestamp(v),
            _ => Value::Long(v),
        },
        ValueRef::Real(v) => match kind {
            FieldKind::Float => Value::Float(v as f32),
            _ => Value::Double(v),
        },
        ValueRef::Text(v) => {
            let text = String::from_utf8_lossy(v).to_string();
            if kind == FieldKind::Timestamp {
                match DateTime::parse_from_rfc3339(&text) {
                    Ok(parsed) => Value::Timestamp(parsed.timestamp_micros()),
                    Err(_) => Value::String(text),
                }
            } else {
                Value::String(text)
            }
        }
        ValueRef::Blob(v) => Value::Bytes(v.to_vec()),
    };
    Ok(value)
}

/// Projection for one entity: column list plus row keys and kinds
fn select_columns(def: &'static EntityDef) -> (String, Vec<(String, FieldKind)>) {
    let mut names = vec![def.identity.to_string()];
    let mut columns = vec![(def.identity.to_string(), FieldKind::Long)];
    for field in def.fields {
        names.push(field.column.to_string());
        columns.push((field.name.to_string(), field.kind));
    }
    (names.join(", "), columns)
}

/// Parameter map with the `:` sigil rusqlite expects
fn named_params(query: &EngineQuery) -> Vec<(String, Value)> {
    query
        .parameters()
        .iter()
        .map(|(name, value)| (format!(":{}", name), value.clone()))
        .collect()
}
