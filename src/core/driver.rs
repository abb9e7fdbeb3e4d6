/// Driver Contract Module
///
/// The capability contract every backend adapter implements. One adapter
/// instance owns at most one open connection and at most one live result
/// cursor; issuing a new query releases the previous cursor.
///
/// ## Unsupported operations
///
/// Operations a backend cannot provide still exist on the trait. Their
/// default bodies return typed errors: `DriverError::Unsupported` for
/// operations impossible on forward-only cursors (`row_count`, `seek`) and
/// `DriverError::NotImplemented` for operations an adapter has not supplied
/// (`affected_rows`, `apply_limit`). Use [`Driver::supports`] to check first.
use crate::config::DriverConfig;
use crate::core::error::{DriverError, Operation, Result};
use crate::core::meta::ColumnMetaMap;
use crate::core::value::{FormattedValue, Row, SemanticType, Value};
use std::any::Any;

/// Optional capabilities an adapter may or may not provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    AffectedRows,
    InsertId,
    Transactions,
    RowCount,
    Seek,
    ApplyLimit,
    QuoteIdentifier,
}

/// Synchronous driver contract. Every call blocks until the backend answers.
pub trait Driver {
    /// Short backend name, e.g. `"sqlite"`.
    fn name(&self) -> &'static str;

    /// Whether the adapter provides `capability`.
    fn supports(&self, capability: Capability) -> bool;

    /// Opens a session. Any previously open session is closed first.
    fn connect(&mut self, config: &DriverConfig) -> Result<()>;

    /// Releases the connection and any cursor. Idempotent, never fails.
    fn disconnect(&mut self);

    fn is_connected(&self) -> bool;

    /// Executes a single statement. Returns whether it produced a result set.
    fn query(&mut self, sql: &str) -> Result<bool>;

    /// Rows changed by the last data-modifying statement.
    fn affected_rows(&self) -> Result<u64> {
        Err(DriverError::not_implemented(self.name(), Operation::AffectedRows))
    }

    /// Last generated identifier. `sequence` is only meaningful to backends
    /// that name their sequences.
    fn insert_id(&self, sequence: Option<&str>) -> Result<Option<i64>>;

    fn begin(&mut self) -> Result<()>;

    fn commit(&mut self) -> Result<()>;

    fn rollback(&mut self) -> Result<()>;

    /// 0 outside a transaction, 1 inside. Nesting is not modelled.
    fn transaction_depth(&self) -> u32;

    /// Renders `value` as an SQL fragment of the given semantic type.
    fn format(&self, value: &Value, semantic_type: SemanticType) -> Result<FormattedValue>;

    /// Rewrites `sql` with backend pagination syntax.
    fn apply_limit(&self, _sql: &str, _limit: Option<u64>, _offset: Option<u64>) -> Result<String> {
        Err(DriverError::not_implemented(self.name(), Operation::ApplyLimit))
    }

    /// Number of rows in the current result set.
    fn row_count(&self) -> Result<u64> {
        Err(DriverError::unsupported(Operation::RowCount))
    }

    /// Returns the row under the cursor and advances it. `Ok(None)` marks
    /// the end of the result and keeps being returned once reached.
    fn fetch(&mut self) -> Result<Option<Row>>;

    /// Moves the cursor to the 0-based `row`.
    fn seek(&mut self, _row: u64) -> Result<bool> {
        Err(DriverError::unsupported(Operation::Seek))
    }

    /// Releases the cursor. Never fails.
    fn free(&mut self);

    /// Metadata for every column of the current result set.
    fn build_meta(&self) -> Result<ColumnMetaMap>;

    /// The raw backend connection handle, if connected.
    fn resource(&self) -> Option<&dyn Any>;

    /// The raw cursor handle, if a result set is live.
    fn result_resource(&self) -> Option<&dyn Any>;
}
