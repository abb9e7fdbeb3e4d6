//! dbadapter - a synchronous database driver contract
//!
//! Backend adapters implement [`Driver`]: connect, single-statement
//! execution, a forward-only result cursor, transactions and value
//! formatting, with every backend failure translated into [`DriverError`].
//! [`Connection`] sits on top of an adapter and adds lazy connects,
//! iterator-based result sets and caller-side pagination.

// Core infrastructure modules
pub mod core;

pub mod config;
pub mod connection;
pub mod drivers;

#[cfg(all(test, feature = "sqlite"))]
mod test_utils;

pub use crate::config::{DriverConfig, OptionValue};
pub use crate::connection::{BufferedResult, Connection, ResultSet, TransactionState};
pub use crate::core::{
    Capability, ColumnMeta, ColumnMetaMap, Driver, DriverError, FormattedValue, Operation, Result,
    Row, SemanticType, Value,
};
