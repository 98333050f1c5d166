//! Association rows linking pairs of leaf entities.

use rkyv::{Archive, Deserialize, Serialize};

use crate::error::Error;

/// A stored many-to-many link between two leaf entities.
///
/// The relation kind is carried by the storage key, not the row; the row
/// holds only its own surrogate id and the two endpoint ids. There is no
/// soft-delete state and no version history: a row is created by `link`,
/// re-pointed by `patch`, and destroyed by `unlink`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Archive, Serialize, Deserialize)]
pub struct Association {
    /// Surrogate identifier, immutable after creation.
    pub id: [u8; 16],

    /// Left endpoint id.
    pub left_id: [u8; 16],

    /// Right endpoint id.
    pub right_id: [u8; 16],
}

impl Association {
    /// Create a new association with a fresh id.
    pub fn new(left_id: [u8; 16], right_id: [u8; 16]) -> Self {
        Self {
            id: crate::id::generate(),
            left_id,
            right_id,
        }
    }

    /// Serialize the row to bytes using rkyv.
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        rkyv::to_bytes::<rkyv::rancor::Error>(self)
            .map(|v| v.to_vec())
            .map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserialize a row from bytes using rkyv.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        rkyv::from_bytes::<Self, rkyv::rancor::Error>(bytes)
            .map_err(|e| Error::Deserialization(e.to_string()))
    }
}
