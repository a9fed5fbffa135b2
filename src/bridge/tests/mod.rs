//! Unit tests for the synchronous tool bridge.
