/// # Test Utilities Module
///
/// Fixtures shared by the unit tests: seeded SQLite drivers and
/// connections, and a scripted driver for exercising the contract's
/// optional operations without a backend.

use crate::config::DriverConfig;
use crate::connection::Connection;
use crate::core::{
    Capability, ColumnMetaMap, Driver, FormattedValue, Result, Row, SemanticType, Value,
};
use crate::drivers::SqliteDriver;
use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

pub const SAMPLE_SCHEMA: &[&str] = &[
    "CREATE TABLE users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT,
        score REAL,
        joined DATE
    )",
    "INSERT INTO users (name, score, joined) VALUES ('Alice', 123.45, '2024-01-15')",
    "INSERT INTO users (name, score, joined) VALUES ('Bob', 678.90, '2024-02-01')",
    "INSERT INTO users (name, score, joined) VALUES (NULL, NULL, NULL)",
];

/// A connected in-memory SQLite driver.
pub struct SqliteFixture {
    pub driver: SqliteDriver,
}

impl SqliteFixture {
    pub fn new() -> Self {
        let mut driver = SqliteDriver::new();
        driver
            .connect(&DriverConfig::from_dsn("sqlite::memory:"))
            .expect("in-memory sqlite should open");
        SqliteFixture { driver }
    }

    /// Fixture with the `users` sample table
    pub fn with_sample_data() -> Self {
        let mut fixture = Self::new();
        for statement in SAMPLE_SCHEMA {
            fixture
                .driver
                .query(statement)
                .expect("sample schema should apply");
        }
        fixture
    }
}

/// An eager in-memory connection with the `users` sample table.
pub fn sample_connection() -> Connection {
    let mut conn = Connection::open(DriverConfig::from_dsn("sqlite::memory:"))
        .expect("in-memory sqlite should open");
    for statement in SAMPLE_SCHEMA {
        conn.execute(statement).expect("sample schema should apply");
    }
    conn
}

/// Driver that records statements and never returns rows. Optionally
/// rewrites pagination with `FETCH FIRST`.
#[derive(Default)]
pub struct RecordingDriver {
    connected: bool,
    limit_syntax: bool,
    log: Rc<RefCell<Vec<String>>>,
}

impl RecordingDriver {
    pub fn with_limit_syntax() -> Self {
        RecordingDriver {
            limit_syntax: true,
            ..Default::default()
        }
    }

    /// Shared handle on the executed statements.
    pub fn log(&self) -> Rc<RefCell<Vec<String>>> {
        Rc::clone(&self.log)
    }
}

impl Driver for RecordingDriver {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn supports(&self, capability: Capability) -> bool {
        capability == Capability::ApplyLimit && self.limit_syntax
    }

    fn connect(&mut self, _config: &DriverConfig) -> Result<()> {
        self.connected = true;
        Ok(())
    }

    fn disconnect(&mut self) {
        self.connected = false;
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn query(&mut self, sql: &str) -> Result<bool> {
        self.log.borrow_mut().push(sql.to_string());
        Ok(false)
    }

    fn insert_id(&self, _sequence: Option<&str>) -> Result<Option<i64>> {
        Ok(None)
    }

    fn begin(&mut self) -> Result<()> {
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        Ok(())
    }

    fn transaction_depth(&self) -> u32 {
        0
    }

    fn format(&self, value: &Value, semantic_type: SemanticType) -> Result<FormattedValue> {
        crate::core::value::format_standard(value, semantic_type)
    }

    fn apply_limit(&self, sql: &str, limit: Option<u64>, offset: Option<u64>) -> Result<String> {
        if !self.limit_syntax {
            return Err(crate::core::DriverError::not_implemented(
                self.name(),
                crate::core::Operation::ApplyLimit,
            ));
        }
        let mut rewritten = sql.to_string();
        if let Some(offset) = offset {
            rewritten.push_str(&format!(" OFFSET {} ROWS", offset));
        }
        if let Some(limit) = limit {
            rewritten.push_str(&format!(" FETCH FIRST {} ROWS", limit));
        }
        Ok(rewritten)
    }

    fn fetch(&mut self) -> Result<Option<Row>> {
        Ok(None)
    }

    fn free(&mut self) {}

    fn build_meta(&self) -> Result<ColumnMetaMap> {
        Ok(ColumnMetaMap::default())
    }

    fn resource(&self) -> Option<&dyn Any> {
        None
    }

    fn result_resource(&self) -> Option<&dyn Any> {
        None
    }
}
