//! core::types
//!
//! Strong types for core domain concepts.
//!
//! # Types
//!
//! - [`PaperId`] - Identifier of a paper on a board
//! - [`StageId`] - Identifier of a pipeline stage (board column)
//! - [`ProjectId`] - Identifier of the project that owns a board
//! - [`Fingerprint`] - Board state hash for divergence detection
//!
//! # Validation
//!
//! Identifiers are validated at construction time. They come from the server
//! and from the command line, and end up in request paths, so an id that
//! cannot be routed is rejected before it reaches the store.
//!
//! # Examples
//!
//! ```
//! use paperboard::core::types::{PaperId, StageId};
//!
//! let paper = PaperId::new("paper-42").unwrap();
//! let stage = StageId::new("screening").unwrap();
//! assert_eq!(paper.as_str(), "paper-42");
//! assert_eq!(stage.to_string(), "screening");
//!
//! assert!(PaperId::new("").is_err());
//! assert!(StageId::new("has space").is_err());
//! ```

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Maximum length of an identifier in bytes.
pub const MAX_ID_LEN: usize = 128;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid paper id: {0}")]
    InvalidPaperId(String),

    #[error("invalid stage id: {0}")]
    InvalidStageId(String),

    #[error("invalid project id: {0}")]
    InvalidProjectId(String),
}

/// Shared validation for all identifier newtypes.
///
/// Returns a human-readable reason on failure.
fn validate_id(raw: &str) -> Result<(), String> {
    if raw.is_empty() {
        return Err("id cannot be empty".into());
    }
    if raw.len() > MAX_ID_LEN {
        return Err(format!("id cannot exceed {MAX_ID_LEN} bytes"));
    }
    if raw.chars().any(char::is_whitespace) {
        return Err(format!("'{raw}' cannot contain whitespace"));
    }
    if raw.chars().any(|c| c.is_control()) {
        return Err("id cannot contain control characters".into());
    }
    if raw.contains(&['/', '\\', '?', '#', '%'][..]) {
        return Err(format!("'{raw}' cannot contain '/', '\\', '?', '#' or '%'"));
    }
    // ids are used as URL path segments; "." and ".." would be normalized away
    if raw.chars().all(|c| c == '.') {
        return Err(format!("'{raw}' cannot consist only of dots"));
    }
    Ok(())
}

macro_rules! board_id {
    ($(#[$meta:meta])* $name:ident, $variant:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Create a new validated identifier.
            ///
            /// # Errors
            ///
            /// Returns a [`TypeError`] if the id is empty, too long, or
            /// contains whitespace, control or path characters, or is only dots.
            pub fn new(id: impl Into<String>) -> Result<Self, TypeError> {
                let id = id.into();
                validate_id(&id).map_err(TypeError::$variant)?;
                Ok(Self(id))
            }

            /// Get the id as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = TypeError;

            fn try_from(s: String) -> Result<Self, Self::Error> {
                Self::new(s)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl std::str::FromStr for $name {
            type Err = TypeError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

board_id!(
    /// Identifier of a paper placed on a board.
    PaperId,
    InvalidPaperId
);

board_id!(
    /// Identifier of a pipeline stage.
    ///
    /// Stages are the board's schema: fixed per board and never created or
    /// destroyed by the engine.
    StageId,
    InvalidStageId
);

board_id!(
    /// Identifier of the project a board belongs to.
    ProjectId,
    InvalidProjectId
);

/// A deterministic hash of board layout, used to detect divergence between
/// the local view and a freshly fetched server board.
///
/// # Example
///
/// ```
/// use paperboard::core::types::Fingerprint;
///
/// let a = Fingerprint::compute(["inbox", "p1", "p2"]);
/// let b = Fingerprint::compute(["inbox", "p1", "p2"]);
/// let c = Fingerprint::compute(["inbox", "p2", "p1"]);
/// assert_eq!(a, b);
/// assert_ne!(a, c);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Compute a fingerprint over an ordered sequence of tokens.
    ///
    /// Order matters: the board layout is ordered, so the caller feeds
    /// tokens in canonical stage and position order.
    pub fn compute<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut hasher = Sha256::new();
        for token in tokens {
            hasher.update(token.as_ref().as_bytes());
            hasher.update(b"\0");
        }
        Self(hex::encode(hasher.finalize()))
    }

    /// Get the fingerprint as a hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
