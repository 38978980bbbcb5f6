// Public modules
pub mod apache;
pub mod discovery;
pub mod error;
pub mod gate;
pub mod maintenance;
pub mod notify;
pub mod output;
pub mod probe;
pub mod process;
pub mod settings;
pub mod skip;
pub mod wpcli;

// Internal modules - not part of public API
pub(crate) mod paths;

// Public modules for CLI access
pub mod defaults;

// Re-export common types for convenience
pub use error::{Error, ErrorCode, Result};
pub use output::{ItemOutcome, ItemStatus, OperationReport, Summary};
