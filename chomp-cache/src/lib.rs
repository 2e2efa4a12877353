pub mod bus;
pub mod claim;
pub mod error;
pub mod registry;

pub use bus::CacheBus;
pub use claim::ClaimService;
pub use error::CacheError;
pub use registry::RegistryService;
