pub mod constants;
pub mod error;
pub mod registry;
pub mod types;

pub use error::{Error, Result};
pub use registry::EntryRegistry;
pub use types::*;

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
