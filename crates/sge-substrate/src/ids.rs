//! Identifier newtypes for the governance core
//!
//! UUIDs identify durable entities owned by the storage layer; ULIDs are
//! used where monotonic comparability matters (timeline events, proposals).

use serde::{Deserialize, Serialize};
use ulid::Ulid;
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        pub struct $name(pub Uuid);

        impl $name {
            /// Generate a new random id
            #[inline]
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_id!(
    /// Workspace identifier (supplied by the membership service)
    WorkspaceId
);
uuid_id!(
    /// Basket identifier
    BasketId
);
uuid_id!(
    /// Identifier of a substrate row (block, dump, context item)
    SubstrateId
);
uuid_id!(
    /// Document identifier
    DocumentId
);

/// Actor identifier, opaque to this core (resolved by the auth collaborator)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActorId(pub String);

impl ActorId {
    /// Wrap an externally resolved actor id
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// True when the id carries no content
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl std::fmt::Display for ActorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Proposal identifier (ULID for sortability)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProposalId(pub Ulid);

impl ProposalId {
    /// Generate a new proposal id
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for ProposalId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ProposalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Timeline event identifier; ordering key together with the timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EventId(pub Ulid);

impl EventId {
    /// Generate a new event id
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }

    /// Parse from its canonical string form
    pub fn parse(s: &str) -> Result<Self, ulid::DecodeError> {
        Ok(Self(Ulid::from_string(s)?))
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Malformed idempotency key
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid request key: {0:?}")]
pub struct InvalidRequestKey(pub String);

/// Caller-supplied idempotency key; must be a well-formed UUID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestKey(pub Uuid);

impl RequestKey {
    /// Generate a fresh key (client side convenience)
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a caller-supplied key, rejecting anything that is not a UUID
    pub fn parse(raw: &str) -> Result<Self, InvalidRequestKey> {
        Uuid::parse_str(raw)
            .map(Self)
            .map_err(|_| InvalidRequestKey(raw.to_string()))
    }
}

impl Default for RequestKey {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
