//! core
//!
//! Board domain types, the snapshot store, and configuration.
//!
//! # Modules
//!
//! - [`types`] - Strong types: PaperId, StageId, ProjectId, Fingerprint
//! - [`snapshot`] - Pipeline snapshot and its move algebra
//! - [`store`] - Single mutable holder of the current snapshot
//! - [`config`] - Configuration schema and loading
//!
//! # Design Principles
//!
//! - Strong typing keeps malformed ids out of the board
//! - Snapshots are checked on construction and changed only by whole moves
//! - Everything here is synchronous and deterministic

pub mod config;
pub mod snapshot;
pub mod store;
pub mod types;
