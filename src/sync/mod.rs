//! sync
//!
//! Board persistence against the remote REST service.
//!
//! # Modules
//!
//! - [`traits`] - The `BoardSync` trait, wire types, and `SyncError`
//! - [`http`] - reqwest-backed implementation
//! - [`mock`] - In-memory server for tests
//!
//! # Usage
//!
//! ```ignore
//! use paperboard::sync::{BoardSync, HttpBoardSync};
//!
//! let sync = HttpBoardSync::from_config(&config)?;
//! let snapshot = sync.fetch_board(&project).await?;
//! ```

pub mod http;
pub mod mock;
pub mod traits;

pub use http::HttpBoardSync;
pub use traits::{BoardPayload, BoardSync, MoveRequest, ServerPlacement, SyncError};
