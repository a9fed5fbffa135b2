//! Domain model for the synchronous tool bridge.
//!
//! Provider identity and transport configuration, discovered operation
//! metadata, schema-derived parameter lists, argument binding and the client
//! lifecycle state machine. No scheduler or I/O concerns live here.

mod arguments;
mod config;
mod error;
mod ids;
mod lifecycle;
mod operation;
mod parameter;
mod schema;
mod transport;

pub use arguments::{ArgumentBindingError, CallArguments};
pub use config::{ClientConfig, ClientConfigError, ClientOptions, ProviderConfig};
pub use error::{BridgeDomainError, ParseClientLifecycleStateError};
pub use ids::{ADAPTER_ID_SEPARATOR, AdapterId, ClientId, ProviderName};
pub use lifecycle::ClientLifecycleState;
pub use operation::RemoteOperation;
pub use parameter::{ParameterList, ParameterSpec, ParameterType, Requirement};
pub use schema::{SchemaError, translate_schema};
pub use transport::{HttpSseTransportConfig, ProviderTransport, StdioTransportConfig};
