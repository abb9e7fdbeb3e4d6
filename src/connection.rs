/// Connection Management Module
///
/// The caller-facing layer above a driver adapter. It owns one adapter,
/// applies the deferred-connect policy, tracks transaction state, wraps the
/// low-level `fetch` primitive into an iterator and supplies what the
/// adapter leaves to its caller: pagination and buffered row counts.
use crate::config::DriverConfig;
use crate::core::{
    ColumnMetaMap, Driver, DriverError, FormattedValue, Result, Row, SemanticType, Value,
};
use crate::drivers;
use tracing::{debug, info, warn};

/// Represents database transaction states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransactionState {
    /// No active transaction (autocommit mode)
    #[default]
    Autocommit,
    /// Transaction in progress
    Transaction,
}

/// A database connection over a driver adapter.
pub struct Connection {
    config: DriverConfig,
    driver: Box<dyn Driver>,
}

impl Connection {
    /// Creates the adapter for the DSN's scheme. Connects immediately unless
    /// the configuration is lazy.
    ///
    /// # Examples
    ///
    /// ```
    /// use dbadapter::{Connection, DriverConfig};
    ///
    /// let mut conn = Connection::open(DriverConfig::from_dsn("sqlite::memory:"))?;
    /// let rows: Vec<_> = conn
    ///     .query("SELECT 1 AS one")?
    ///     .expect("SELECT produces a result set")
    ///     .collect::<Result<_, _>>()?;
    /// assert_eq!(rows.len(), 1);
    /// # Ok::<(), dbadapter::DriverError>(())
    /// ```
    pub fn open(config: DriverConfig) -> Result<Self> {
        let driver = drivers::driver_for(&config)?;
        Self::with_driver(config, driver)
    }

    /// Uses a caller-supplied adapter, e.g. one not known to the registry.
    pub fn with_driver(config: DriverConfig, driver: Box<dyn Driver>) -> Result<Self> {
        let mut conn = Connection { config, driver };
        if !conn.config.lazy {
            conn.connect()?;
        }
        Ok(conn)
    }

    /// Establishes the physical connection if it is not open yet.
    pub fn connect(&mut self) -> Result<()> {
        if self.driver.is_connected() {
            return Ok(());
        }
        info!(driver = self.driver.name(), "connecting");
        self.driver.connect(&self.config)
    }

    /// Closes the physical connection. The next operation reconnects.
    pub fn disconnect(&mut self) {
        if self.driver.is_connected() {
            info!(driver = self.driver.name(), "disconnecting");
        }
        self.driver.disconnect();
    }

    pub fn is_connected(&self) -> bool {
        self.driver.is_connected()
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// The adapter, for backend-specific calls and resource access.
    pub fn driver(&self) -> &dyn Driver {
        self.driver.as_ref()
    }

    /// Read from the adapter, so transactions opened with plain SQL count.
    pub fn transaction_state(&self) -> TransactionState {
        if self.driver.is_connected() && self.driver.transaction_depth() > 0 {
            TransactionState::Transaction
        } else {
            TransactionState::Autocommit
        }
    }

    fn driver_mut(&mut self) -> Result<&mut dyn Driver> {
        self.connect()?;
        Ok(self.driver.as_mut())
    }

    /// Executes `sql`. Returns a result set when the statement produced one.
    ///
    /// The result set borrows the connection, so it has to be dropped before
    /// the next statement can run.
    pub fn query(&mut self, sql: &str) -> Result<Option<ResultSet<'_>>> {
        let driver = self.driver_mut()?;
        if driver.query(sql)? {
            Ok(Some(ResultSet::new(driver)))
        } else {
            Ok(None)
        }
    }

    /// Executes a statement, discarding any rows it produces.
    pub fn execute(&mut self, sql: &str) -> Result<()> {
        let driver = self.driver_mut()?;
        if driver.query(sql)? {
            driver.free();
        }
        Ok(())
    }

    /// Executes `sql` restricted to a window of rows.
    ///
    /// The adapter's own pagination syntax is used when it has one;
    /// otherwise the statement is wrapped in a portable subquery.
    pub fn query_limited(
        &mut self,
        sql: &str,
        limit: Option<u64>,
        offset: Option<u64>,
    ) -> Result<Option<ResultSet<'_>>> {
        let limited = match self.driver_mut()?.apply_limit(sql, limit, offset) {
            Ok(rewritten) => rewritten,
            Err(DriverError::NotImplemented { .. }) => portable_limit(sql, limit, offset),
            Err(e) => return Err(e),
        };
        self.query(&limited)
    }

    pub fn insert_id(&mut self, sequence: Option<&str>) -> Result<Option<i64>> {
        self.driver_mut()?.insert_id(sequence)
    }

    pub fn affected_rows(&mut self) -> Result<u64> {
        self.driver_mut()?.affected_rows()
    }

    pub fn begin(&mut self) -> Result<()> {
        self.driver_mut()?.begin()
    }

    pub fn commit(&mut self) -> Result<()> {
        self.driver_mut()?.commit()
    }

    pub fn rollback(&mut self) -> Result<()> {
        self.driver_mut()?.rollback()
    }

    /// Runs `work` inside a transaction and commits it. When `work` or the
    /// commit fails, the transaction is rolled back and that error returned.
    pub fn transaction<T, F>(&mut self, work: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T>,
    {
        self.begin()?;
        let outcome = work(self).and_then(|value| self.commit().map(|()| value));
        if outcome.is_err() && self.transaction_state() == TransactionState::Transaction {
            if let Err(rollback_err) = self.rollback() {
                warn!(error = %rollback_err, "rollback after failed transaction failed");
            }
        }
        outcome
    }

    /// Renders `value` for inclusion in SQL text.
    pub fn format(&self, value: &Value, semantic_type: SemanticType) -> Result<FormattedValue> {
        self.driver.format(value, semantic_type)
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.driver.disconnect();
    }
}

/// Wraps `sql` as `SELECT * FROM (sql) LIMIT n OFFSET m`.
///
/// `LIMIT -1` stands for "no limit" when only an offset is given.
pub fn portable_limit(sql: &str, limit: Option<u64>, offset: Option<u64>) -> String {
    if limit.is_none() && offset.is_none() {
        return sql.to_string();
    }

    let inner = sql.trim().trim_end_matches(';').trim_end();
    let mut limited = format!("SELECT * FROM ({}) AS limited_rows", inner);
    match limit {
        Some(limit) => limited.push_str(&format!(" LIMIT {}", limit)),
        None => limited.push_str(" LIMIT -1"),
    }
    if let Some(offset) = offset {
        limited.push_str(&format!(" OFFSET {}", offset));
    }
    limited
}

/// Rows of one query, streamed from the adapter's cursor.
///
/// Iterating yields `Result<Row>`; iteration ends at the end of the result
/// or after the first error. Dropping the result set frees the cursor.
pub struct ResultSet<'c> {
    driver: &'c mut dyn Driver,
    finished: bool,
}

impl<'c> ResultSet<'c> {
    fn new(driver: &'c mut dyn Driver) -> Self {
        ResultSet {
            driver,
            finished: false,
        }
    }

    /// Metadata for every column of the result.
    pub fn meta(&self) -> Result<ColumnMetaMap> {
        self.driver.build_meta()
    }

    /// Column names in result order.
    pub fn columns(&self) -> Result<Vec<String>> {
        Ok(self
            .meta()?
            .iter()
            .map(|column| column.name.clone())
            .collect())
    }

    /// Reads every remaining row into memory, which makes row counts and
    /// seeking available.
    pub fn buffered(mut self) -> Result<BufferedResult> {
        let meta = self.meta()?;
        let rows = self.by_ref().collect::<Result<Vec<_>>>()?;
        debug!(rows = rows.len(), "buffered result set");
        Ok(BufferedResult::new(meta, rows))
    }

    /// Releases the cursor now instead of at drop.
    pub fn free(self) {}
}

impl Iterator for ResultSet<'_> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.driver.fetch() {
            Ok(Some(row)) => Some(Ok(row)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}

impl Drop for ResultSet<'_> {
    fn drop(&mut self) {
        self.driver.free();
    }
}

/// A fully materialised result with random access.
#[derive(Debug, Clone, PartialEq)]
pub struct BufferedResult {
    meta: ColumnMetaMap,
    rows: Vec<Row>,
    position: usize,
}

impl BufferedResult {
    pub fn new(meta: ColumnMetaMap, rows: Vec<Row>) -> Self {
        BufferedResult {
            meta,
            rows,
            position: 0,
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Moves to the 0-based `row`. Returns false, leaving the position
    /// unchanged, when the row does not exist.
    pub fn seek(&mut self, row: usize) -> bool {
        if row < self.rows.len() {
            self.position = row;
            true
        } else {
            false
        }
    }

    /// The row at the current position, advancing past it.
    pub fn fetch(&mut self) -> Option<&Row> {
        let row = self.rows.get(self.position)?;
        self.position += 1;
        Some(row)
    }

    pub fn meta(&self) -> &ColumnMetaMap {
        &self.meta
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }
}
