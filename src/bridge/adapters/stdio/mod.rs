//! Stdio provider adapter: a child process speaking line-delimited
//! JSON-RPC 2.0.

mod jsonrpc;
mod session;

pub use session::{StdioProviderConnector, StdioProviderSession};
