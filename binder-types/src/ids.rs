//! Identifier types for local drafts.
//!
//! Ids are random UUIDs (v4), the same shape the web client mints, so
//! payloads written by either side parse on the other.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! draft_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random identifier.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wraps an existing UUID.
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the underlying UUID.
            #[must_use]
            pub const fn as_uuid(&self) -> Uuid {
                self.0
            }

            /// Parses an identifier from its string form.
            pub fn parse(s: &str) -> Result<Self, uuid::Error> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }
    };
}

draft_id!(
    /// Identifies a book.
    BookId
);

draft_id!(
    /// Identifies a chapter draft.
    ChapterId
);

draft_id!(
    /// Identifies one entry in a chapter's revision history.
    SnapshotId
);

/// Returns the first `len` hex characters of a fresh random UUID.
/// Used for the short suffixes in `d` slugs.
pub(crate) fn short_hex(len: usize) -> String {
    let simple = Uuid::new_v4().simple().to_string();
    simple[..len.min(simple.len())].to_string()
}
