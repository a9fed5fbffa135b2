//! Application services: the scheduler bridge, adapter synthesis and the
//! synchronous client lifecycle.

mod adapter;
mod client;
mod scheduler;

pub use adapter::{AdapterCallError, OperationDescriptor, SyncAdapter};
pub use client::{
    DisconnectFailure, ProviderStatus, ShutdownReport, SyncClientError, SyncClientResult,
    SyncToolClient,
};
pub use scheduler::{SchedulerBridge, SchedulerError, UsageError};
