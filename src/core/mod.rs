// Public modules
pub mod command;
pub mod context;
pub mod error;
pub mod host;
pub mod inventory;
pub mod shell;
pub mod ssh;

// Re-export common types for convenience
pub use command::{CommandNode, SetOptions};
pub use error::{Error, ErrorCode, Result};
pub use host::{Host, HostRegistry, HostSelector};
pub use inventory::Inventory;
