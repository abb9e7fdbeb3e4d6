/// Driver Registry
///
/// Resolves the `<scheme>` prefix of a DSN to an adapter compiled into this
/// build. Backends are cargo features; asking for one that is not compiled
/// in is a configuration error, the same as asking for an unknown one.
use crate::config::DriverConfig;
use crate::core::{Driver, DriverError, Result};

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "sqlite")]
pub use self::sqlite::{SqliteCursor, SqliteDriver, SqliteOptions};

/// Every scheme this crate knows about, compiled in or not.
const KNOWN_SCHEMES: &[&str] = &["sqlite"];

/// Schemes whose adapters are available in this build.
pub fn available() -> Vec<&'static str> {
    let mut schemes = Vec::new();
    #[cfg(feature = "sqlite")]
    schemes.push(sqlite::DRIVER_NAME);
    schemes
}

/// Creates an unconnected adapter for the DSN's scheme.
pub fn driver_for(config: &DriverConfig) -> Result<Box<dyn Driver>> {
    let scheme = config.scheme()?;
    match scheme {
        #[cfg(feature = "sqlite")]
        sqlite::DRIVER_NAME => Ok(Box::new(SqliteDriver::new())),
        known if KNOWN_SCHEMES.contains(&known) => Err(DriverError::Configuration(format!(
            "driver '{}' is not available in this build",
            known
        ))),
        unknown => Err(DriverError::Configuration(format!(
            "unknown driver '{}' (available: {})",
            unknown,
            available().join(", ")
        ))),
    }
}

/// Creates the adapter for `config` and connects it.
pub fn connect(config: &DriverConfig) -> Result<Box<dyn Driver>> {
    let mut driver = driver_for(config)?;
    driver.connect(config)?;
    Ok(driver)
}
