//! Leaf entity records.

use rkyv::{Archive, Deserialize, Serialize};

use super::kind::LeafKind;
use crate::error::Error;

/// A stored catalog leaf entity.
///
/// Leaf rows are created and removed independently of associations; the
/// association layer only reads them to validate endpoint references.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
pub struct LeafRecord {
    /// Surrogate identifier, immutable after creation.
    pub id: [u8; 16],

    /// Entity kind.
    pub kind: LeafKind,

    /// Human-readable name, non-empty after trimming.
    pub name: String,

    /// Whether the entity is active in the catalog.
    pub active: bool,
}

impl LeafRecord {
    /// Create a new active record with a fresh id.
    pub fn new(kind: LeafKind, name: impl Into<String>) -> Result<Self, Error> {
        let name = validate_name(name.into())?;
        Ok(Self {
            id: crate::id::generate(),
            kind,
            name,
            active: true,
        })
    }

    /// Serialize the record to bytes using rkyv.
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        rkyv::to_bytes::<rkyv::rancor::Error>(self)
            .map(|v| v.to_vec())
            .map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserialize a record from bytes using rkyv.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        rkyv::from_bytes::<Self, rkyv::rancor::Error>(bytes)
            .map_err(|e| Error::Deserialization(e.to_string()))
    }
}

/// Trim and validate a leaf name.
pub fn validate_name(name: String) -> Result<String, Error> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::Validation("leaf name must not be empty".to_string()));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_roundtrip() {
        let record = LeafRecord::new(LeafKind::Genre, "Platformer").unwrap();
        let bytes = record.to_bytes().unwrap();
        let decoded = LeafRecord::from_bytes(&bytes).unwrap();

        assert_eq!(record, decoded);
    }

    #[test]
    fn test_name_is_trimmed() {
        let record = LeafRecord::new(LeafKind::Product, "  Super Metroid  ").unwrap();
        assert_eq!(record.name, "Super Metroid");
    }

    #[test]
    fn test_empty_name_rejected() {
        let result = LeafRecord::new(LeafKind::Product, "   ");
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[test]
    fn test_new_records_are_active() {
        let record = LeafRecord::new(LeafKind::Company, "Capcom").unwrap();
        assert!(record.active);
    }
}
