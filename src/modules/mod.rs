//! Modules layer - Infrastructure components
//!
//! Contains the primary byte-storage backend, content hashing, and the
//! test-only in-memory persistence used by service tests.

#[cfg(test)]
pub mod memory_store;
pub mod storage;
