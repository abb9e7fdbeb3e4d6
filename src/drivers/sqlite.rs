/// SQLite Driver Module
///
/// Adapter from the driver contract onto `rusqlite`. Every call into
/// rusqlite goes through one of the translation helpers at the bottom of
/// this file, which map `rusqlite::Error` into the driver error taxonomy
/// with the extended SQLite result code and message.
///
/// ## Result sets
///
/// `rusqlite::Rows` borrows its statement, which borrows the connection.
/// The connection is shared through an `Rc` and a [`SqliteCursor`] owns a
/// clone of it together with the prepared statement and its live rows.
/// `query` steps the first row, so the statement runs there; each later
/// `fetch` steps SQLite for exactly one more. There is no row count and no
/// seeking, and the statement is finalized by `free` or by the next `query`.
use crate::config::{DriverConfig, OptionValue};
use crate::core::error::{DriverError, Result};
use crate::core::meta::{ColumnMeta, ColumnMetaMap};
use crate::core::value::{format_standard, FormattedValue, Row, SemanticType, Value};
use crate::core::{Capability, Driver};
use ouroboros::self_referencing;
use rusqlite::{Connection, OpenFlags, Rows, Statement};
use std::any::Any;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DRIVER_NAME: &str = "sqlite";

const MEMORY_DATABASE: &str = ":memory:";

const JOURNAL_MODES: &[&str] = &["delete", "truncate", "persist", "memory", "wal", "off"];

/// Backend options recognised in `DriverConfig::options`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SqliteOptions {
    pub busy_timeout: Option<Duration>,
    pub foreign_keys: Option<bool>,
    pub read_only: bool,
    pub journal_mode: Option<String>,
}

impl SqliteOptions {
    /// Validates the option map. Unknown keys and wrong value kinds are
    /// configuration errors.
    pub fn from_config(config: &DriverConfig) -> Result<Self> {
        let mut options = SqliteOptions::default();
        for (key, value) in &config.options {
            match (key.as_str(), value) {
                ("busy_timeout", OptionValue::Integer(ms)) if *ms >= 0 => {
                    options.busy_timeout = Some(Duration::from_millis(*ms as u64));
                }
                ("foreign_keys", OptionValue::Bool(enabled)) => {
                    options.foreign_keys = Some(*enabled);
                }
                ("read_only", OptionValue::Bool(read_only)) => {
                    options.read_only = *read_only;
                }
                ("journal_mode", OptionValue::Text(mode))
                    if JOURNAL_MODES.contains(&mode.to_lowercase().as_str()) =>
                {
                    options.journal_mode = Some(mode.to_lowercase());
                }
                ("busy_timeout" | "foreign_keys" | "read_only" | "journal_mode", other) => {
                    return Err(DriverError::Configuration(format!(
                        "invalid value '{}' for sqlite option '{}'",
                        other, key
                    )));
                }
                _ => {
                    return Err(DriverError::Configuration(format!(
                        "unknown sqlite option '{}'",
                        key
                    )));
                }
            }
        }
        Ok(options)
    }

    fn open_flags(&self) -> OpenFlags {
        if self.read_only {
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_URI | OpenFlags::SQLITE_OPEN_NO_MUTEX
        } else {
            OpenFlags::default()
        }
    }
}

/// A prepared statement and the rows it is stepping through, kept
/// alongside the connection they borrow from.
#[self_referencing]
struct LiveRows {
    connection: Rc<Connection>,
    #[borrows(connection)]
    #[not_covariant]
    statement: Statement<'this>,
    #[borrows(mut statement)]
    #[not_covariant]
    rows: Rows<'this>,
}

impl LiveRows {
    /// Prepares `sql` and opens its row stream without stepping it.
    /// Returns the result columns alongside.
    fn open(connection: Rc<Connection>, sql: &str) -> rusqlite::Result<(Self, Vec<ColumnMeta>)> {
        let mut meta = Vec::new();
        let live = LiveRows::try_new(
            connection,
            |conn| conn.prepare(sql),
            |statement| {
                meta = column_meta(statement);
                statement.query([])
            },
        )?;
        Ok((live, meta))
    }

    fn step(&mut self, width: usize) -> rusqlite::Result<Option<Vec<Value>>> {
        self.with_rows_mut(|rows| match rows.next()? {
            Some(row) => (0..width)
                .map(|index| row.get_ref(index).map(Value::from))
                .collect::<rusqlite::Result<Vec<_>>>()
                .map(Some),
            None => Ok(None),
        })
    }
}

fn column_meta(statement: &Statement<'_>) -> Vec<ColumnMeta> {
    statement
        .columns()
        .iter()
        .enumerate()
        .map(|(index, column)| {
            ColumnMeta::new(column.name(), index, column.decl_type().map(str::to_string))
        })
        .collect()
}

/// Forward-only cursor over the rows of the last query.
pub struct SqliteCursor {
    meta: ColumnMetaMap,
    names: Vec<String>,
    sql: String,
    position: u64,
    // First row, stepped by `query` so the statement runs there.
    pending: Option<Vec<Value>>,
    exhausted: bool,
    live: LiveRows,
}

impl SqliteCursor {
    /// Column metadata of the result.
    pub fn meta(&self) -> &ColumnMetaMap {
        &self.meta
    }

    /// Number of rows fetched so far.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// True once the backend reported the end of the result and every row
    /// was fetched.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted && self.pending.is_none()
    }

    fn next_row(&mut self) -> Result<Option<Row>> {
        if let Some(values) = self.pending.take() {
            return Ok(Some(self.emit(values)));
        }
        if self.exhausted {
            return Ok(None);
        }
        match self.live.step(self.names.len()) {
            Ok(Some(values)) => Ok(Some(self.emit(values))),
            Ok(None) => {
                self.exhausted = true;
                Ok(None)
            }
            Err(e) => {
                self.exhausted = true;
                Err(query_error(e, &self.sql))
            }
        }
    }

    fn emit(&mut self, values: Vec<Value>) -> Row {
        self.position += 1;
        Row::new(self.names.iter().cloned().zip(values).collect())
    }
}

impl fmt::Debug for SqliteCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteCursor")
            .field("columns", &self.names)
            .field("sql", &self.sql)
            .field("position", &self.position)
            .field("exhausted", &self.is_exhausted())
            .finish_non_exhaustive()
    }
}

/// The SQLite adapter.
#[derive(Debug, Default)]
pub struct SqliteDriver {
    // Holds a clone of the connection; released before it.
    cursor: Option<SqliteCursor>,
    connection: Option<Rc<Connection>>,
}

impl SqliteDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// The underlying rusqlite connection, for backend-specific calls.
    pub fn connection(&self) -> Option<&Connection> {
        self.connection.as_deref()
    }

    /// The live cursor, if the last query produced a result set.
    pub fn cursor(&self) -> Option<&SqliteCursor> {
        self.cursor.as_ref()
    }

    fn conn(&self) -> Result<&Connection> {
        self.connection.as_deref().ok_or_else(DriverError::not_connected)
    }

    fn cursor_mut(&mut self) -> Result<&mut SqliteCursor> {
        self.cursor
            .as_mut()
            .ok_or_else(|| DriverError::InvalidState("no active result set".to_string()))
    }

    fn open(path: &str, options: &SqliteOptions) -> Result<Connection> {
        let conn = Connection::open_with_flags(path, options.open_flags()).map_err(connection_error)?;

        if let Some(timeout) = options.busy_timeout {
            conn.busy_timeout(timeout).map_err(connection_error)?;
        }
        if let Some(enabled) = options.foreign_keys {
            conn.pragma_update(None, "foreign_keys", enabled)
                .map_err(connection_error)?;
        }
        if let Some(mode) = &options.journal_mode {
            conn.pragma_update(None, "journal_mode", mode)
                .map_err(connection_error)?;
        }
        Ok(conn)
    }

    fn run_transaction_command(&mut self, command: &str) -> Result<()> {
        self.free();
        debug!(command, "transaction boundary");
        self.conn()?
            .execute_batch(command)
            .map_err(transaction_error)
    }
}

impl Driver for SqliteDriver {
    fn name(&self) -> &'static str {
        DRIVER_NAME
    }

    fn supports(&self, capability: Capability) -> bool {
        matches!(capability, Capability::InsertId | Capability::Transactions)
    }

    fn connect(&mut self, config: &DriverConfig) -> Result<()> {
        let path = match config.dsn.split_once(':') {
            Some((DRIVER_NAME, path)) if !path.is_empty() => path,
            Some((DRIVER_NAME, _)) => {
                return Err(DriverError::Configuration(
                    "sqlite DSN is missing a database path".to_string(),
                ))
            }
            _ => {
                return Err(DriverError::Configuration(format!(
                    "DSN '{}' is not a sqlite DSN",
                    config.dsn
                )))
            }
        };
        let options = SqliteOptions::from_config(config)?;

        self.disconnect();
        let conn = Self::open(path, &options)?;
        let database = if path == MEMORY_DATABASE { "in-memory" } else { path };
        info!(database, read_only = options.read_only, "connected to sqlite");
        self.connection = Some(Rc::new(conn));
        Ok(())
    }

    fn disconnect(&mut self) {
        self.cursor = None;
        if let Some(conn) = self.connection.take() {
            match Rc::try_unwrap(conn) {
                Ok(conn) => {
                    if let Err((_, err)) = conn.close() {
                        warn!(error = %err, "sqlite connection did not close cleanly");
                    }
                }
                Err(_) => warn!("sqlite connection still referenced at disconnect"),
            }
            info!("disconnected from sqlite");
        }
    }

    fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    fn query(&mut self, sql: &str) -> Result<bool> {
        self.free();
        let conn = Rc::clone(self.connection.as_ref().ok_or_else(DriverError::not_connected)?);
        debug!(sql, "executing statement");

        let (mut live, meta) = LiveRows::open(conn, sql).map_err(|e| query_error(e, sql))?;
        let first = live.step(meta.len()).map_err(|e| query_error(e, sql))?;
        if meta.is_empty() {
            return Ok(false);
        }

        let names = meta.iter().map(|m| m.name.clone()).collect();
        self.cursor = Some(SqliteCursor {
            meta: ColumnMetaMap::new(meta),
            names,
            sql: sql.to_string(),
            position: 0,
            exhausted: first.is_none(),
            pending: first,
            live,
        });
        Ok(true)
    }

    fn insert_id(&self, _sequence: Option<&str>) -> Result<Option<i64>> {
        let id = self.conn()?.last_insert_rowid();
        Ok(if id == 0 { None } else { Some(id) })
    }

    fn begin(&mut self) -> Result<()> {
        self.run_transaction_command("BEGIN")
    }

    fn commit(&mut self) -> Result<()> {
        self.run_transaction_command("COMMIT")
    }

    fn rollback(&mut self) -> Result<()> {
        self.run_transaction_command("ROLLBACK")
    }

    fn transaction_depth(&self) -> u32 {
        match &self.connection {
            Some(conn) if !conn.is_autocommit() => 1,
            _ => 0,
        }
    }

    /// SQLite has identifier quoting, but this adapter keeps the contract's
    /// pass-through behaviour for identifiers.
    fn format(&self, value: &Value, semantic_type: SemanticType) -> Result<FormattedValue> {
        format_standard(value, semantic_type)
    }

    fn fetch(&mut self) -> Result<Option<Row>> {
        self.cursor_mut()?.next_row()
    }

    fn free(&mut self) {
        self.cursor = None;
    }

    fn build_meta(&self) -> Result<ColumnMetaMap> {
        self.cursor
            .as_ref()
            .map(|cursor| cursor.meta.clone())
            .ok_or_else(|| DriverError::InvalidState("no active result set".to_string()))
    }

    fn resource(&self) -> Option<&dyn Any> {
        self.connection.as_deref().map(|conn| conn as &dyn Any)
    }

    fn result_resource(&self) -> Option<&dyn Any> {
        self.cursor.as_ref().map(|cursor| cursor as &dyn Any)
    }
}

/// Extended result code and message of a rusqlite error.
fn native_error(err: &rusqlite::Error) -> (i32, String) {
    match err {
        rusqlite::Error::SqliteFailure(failure, message) => (
            failure.extended_code,
            message.clone().unwrap_or_else(|| failure.to_string()),
        ),
        rusqlite::Error::SqlInputError { error, msg, .. } => (error.extended_code, msg.clone()),
        other => (-1, other.to_string()),
    }
}

fn connection_error(err: rusqlite::Error) -> DriverError {
    let (code, message) = native_error(&err);
    warn!(code, %message, "sqlite connect failed");
    DriverError::Connection { code, message }
}

fn query_error(err: rusqlite::Error, sql: &str) -> DriverError {
    let (code, message) = native_error(&err);
    warn!(code, %message, sql, "sqlite statement failed");
    DriverError::Query {
        code,
        message,
        sql: sql.to_string(),
    }
}

fn transaction_error(err: rusqlite::Error) -> DriverError {
    let (code, message) = native_error(&err);
    warn!(code, %message, "sqlite transaction command failed");
    DriverError::Transaction { code, message }
}
