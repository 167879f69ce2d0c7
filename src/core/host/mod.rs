//! Hosts, the registry they are declared in, and selection over it.

pub mod range;
mod record;
mod registry;
mod selector;

pub use record::{Host, HostAttrs, LOCALHOST};
pub use registry::HostRegistry;
pub use selector::{HostSelector, Roles};
