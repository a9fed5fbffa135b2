//! Toolbridge: blocking access to asynchronous tool providers.
//!
//! Tool providers speak an asynchronous protocol. Agent frameworks and
//! scripts frequently do not. This crate runs every provider session on one
//! dedicated scheduler thread and hands callers plain synchronous adapters,
//! one per discovered remote operation.
//!
//! # Architecture
//!
//! Toolbridge follows hexagonal architecture principles:
//!
//! - **Domain**: Pure business logic with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for provider sessions
//! - **Adapters**: Concrete implementations of ports (in-memory, stdio)
//!
//! # Modules
//!
//! - [`bridge`]: Client lifecycle, scheduler bridge and adapter synthesis

pub mod bridge;
