/// Core Module
///
/// The backend-agnostic half of the crate: the driver contract, the error
/// taxonomy adapters translate into, the value model and column metadata.

pub mod driver;
pub mod error;
pub mod meta;
pub mod value;

// Re-export commonly used types for convenience
pub use driver::{Capability, Driver};
pub use error::{DriverError, Operation, Result};
pub use meta::{ColumnMeta, ColumnMetaMap};
pub use value::{FormattedValue, Row, SemanticType, Value};
