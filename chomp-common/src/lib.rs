pub mod config;
pub mod error;
pub mod field;
pub mod ingester;
pub mod instance;
pub mod interval;
pub mod scope;
pub mod tracing_init;
pub mod wire;

pub use error::{ChompError, ConfigError};
pub use field::{Field, FieldType, FieldValue};
pub use ingester::{Ingester, IngesterType, ResourceType};
pub use instance::Instance;
pub use interval::{Interval, Unit};
pub use scope::Scope;
