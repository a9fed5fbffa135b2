//! Adapter implementations for the provider session port.

pub mod config_file;
pub mod memory;
pub mod stdio;

pub use config_file::load_client_config;
pub use memory::{InMemoryProvider, InMemoryProviderConnector, OperationHandler};
pub use stdio::{StdioProviderConnector, StdioProviderSession};
