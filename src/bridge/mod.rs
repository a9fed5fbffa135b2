//! Synchronous façade over asynchronous tool providers.
//!
//! A [`services::SyncToolClient`] connects every configured provider on a
//! private scheduler, discovers their operations and exposes each one as a
//! blocking [`services::SyncAdapter`]. The module follows hexagonal
//! architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
