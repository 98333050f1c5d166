//! Store for association rows, one bridge collection per relation kind.
//!
//! Three trees back every relation kind, discriminated by a kind prefix in
//! the key:
//! - `links:rows` maps `kind\0association_id` to the encoded row;
//! - `links:pairs` maps `kind\0left_id right_id` to the owning association
//!   id, enforcing pair uniqueness at the storage layer;
//! - `links:endpoints` maps `kind\0side\0leaf_id association_id` to nothing,
//!   so by-left and by-right listings are prefix scans.
//!
//! Every mutation touches all three trees inside one sled transaction, and
//! the pair index is re-checked inside that transaction. Two concurrent
//! inserts of the same pair therefore cannot both commit; the loser aborts
//! with `Error::DuplicateRelation`.

use sled::transaction::{ConflictableTransactionError, TransactionError};
use sled::{Transactional, Tree};
use tracing::debug;

use crate::catalog::{Association, LeafKind, RelationKind};
use crate::error::Error;
use crate::id;

/// Tree name for association rows.
pub const ROWS_TREE: &str = "links:rows";

/// Tree name for the pair uniqueness index.
pub const PAIRS_TREE: &str = "links:pairs";

/// Tree name for the by-endpoint index.
pub const ENDPOINTS_TREE: &str = "links:endpoints";

/// Which side of a pair an endpoint index entry covers.
#[derive(Debug, Clone, Copy)]
enum Side {
    Left,
    Right,
}

impl Side {
    fn byte(self) -> u8 {
        match self {
            Side::Left => b'L',
            Side::Right => b'R',
        }
    }
}

/// Durable storage for association rows across all relation kinds.
pub struct AssociationStore {
    rows: Tree,
    pairs: Tree,
    endpoints: Tree,
}

impl AssociationStore {
    /// Open or create the association store from a sled database.
    pub fn open(db: &sled::Db) -> Result<Self, Error> {
        let rows = db.open_tree(ROWS_TREE)?;
        let pairs = db.open_tree(PAIRS_TREE)?;
        let endpoints = db.open_tree(ENDPOINTS_TREE)?;
        Ok(Self {
            rows,
            pairs,
            endpoints,
        })
    }

    /// Build the row key for an association.
    fn row_key(kind: RelationKind, assoc_id: &[u8; 16]) -> Vec<u8> {
        let label = kind.as_str();
        let mut key = Vec::with_capacity(label.len() + 1 + 16);
        key.extend_from_slice(label.as_bytes());
        key.push(0);
        key.extend_from_slice(assoc_id);
        key
    }

    /// Build the pair index key for an ordered `(left, right)` pair.
    fn pair_key(kind: RelationKind, left: &[u8; 16], right: &[u8; 16]) -> Vec<u8> {
        let label = kind.as_str();
        let mut key = Vec::with_capacity(label.len() + 1 + 32);
        key.extend_from_slice(label.as_bytes());
        key.push(0);
        key.extend_from_slice(left);
        key.extend_from_slice(right);
        key
    }

    /// Build the prefix for scanning one endpoint's index entries.
    fn endpoint_prefix(kind: RelationKind, side: Side, leaf_id: &[u8; 16]) -> Vec<u8> {
        let label = kind.as_str();
        let mut prefix = Vec::with_capacity(label.len() + 3 + 16);
        prefix.extend_from_slice(label.as_bytes());
        prefix.push(0);
        prefix.push(side.byte());
        prefix.push(0);
        prefix.extend_from_slice(leaf_id);
        prefix
    }

    /// Build a full endpoint index key.
    fn endpoint_key(
        kind: RelationKind,
        side: Side,
        leaf_id: &[u8; 16],
        assoc_id: &[u8; 16],
    ) -> Vec<u8> {
        let mut key = Self::endpoint_prefix(kind, side, leaf_id);
        key.extend_from_slice(assoc_id);
        key
    }

    /// Load an association row by id.
    pub fn get(&self, kind: RelationKind, assoc_id: &[u8; 16]) -> Result<Option<Association>, Error> {
        match self.rows.get(Self::row_key(kind, assoc_id))? {
            Some(bytes) => Ok(Some(Association::from_bytes(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Look up the association id owning an ordered pair, if any.
    pub fn lookup_pair(
        &self,
        kind: RelationKind,
        left: &[u8; 16],
        right: &[u8; 16],
    ) -> Result<Option<[u8; 16]>, Error> {
        match self.pairs.get(Self::pair_key(kind, left, right))? {
            Some(bytes) if bytes.len() == 16 => {
                let mut assoc_id = [0u8; 16];
                assoc_id.copy_from_slice(&bytes);
                Ok(Some(assoc_id))
            }
            _ => Ok(None),
        }
    }

    /// List all associations with the given left endpoint.
    pub fn find_by_left(
        &self,
        kind: RelationKind,
        left: &[u8; 16],
    ) -> Result<Vec<Association>, Error> {
        self.scan_endpoint(kind, Side::Left, left)
    }

    /// List all associations with the given right endpoint.
    pub fn find_by_right(
        &self,
        kind: RelationKind,
        right: &[u8; 16],
    ) -> Result<Vec<Association>, Error> {
        self.scan_endpoint(kind, Side::Right, right)
    }

    /// Count the rows of this relation kind referencing a leaf.
    ///
    /// The leaf's own kind decides which side(s) of the pair are inspected.
    pub fn reference_count(
        &self,
        kind: RelationKind,
        leaf_kind: LeafKind,
        leaf_id: &[u8; 16],
    ) -> Result<usize, Error> {
        let mut count = 0;
        if kind.left_kind() == leaf_kind {
            count += self.count_endpoint(kind, Side::Left, leaf_id)?;
        }
        if kind.right_kind() == leaf_kind {
            count += self.count_endpoint(kind, Side::Right, leaf_id)?;
        }
        Ok(count)
    }

    /// Insert a new association row for the pair.
    ///
    /// Atomic across the row, pair, and endpoint trees. If the pair key is
    /// already owned by another row at commit time the insert aborts with
    /// `Error::DuplicateRelation`.
    pub fn insert(
        &self,
        kind: RelationKind,
        left: &[u8; 16],
        right: &[u8; 16],
    ) -> Result<Association, Error> {
        let assoc = Association::new(*left, *right);
        let row_key = Self::row_key(kind, &assoc.id);
        let pair_key = Self::pair_key(kind, left, right);
        let left_key = Self::endpoint_key(kind, Side::Left, left, &assoc.id);
        let right_key = Self::endpoint_key(kind, Side::Right, right, &assoc.id);
        let value = assoc.to_bytes()?;

        let result: Result<(), TransactionError<Error>> =
            (&self.rows, &self.pairs, &self.endpoints).transaction(
                |(rows_tx, pairs_tx, endpoints_tx)| {
                    if let Some(owner) = pairs_tx.get(pair_key.as_slice())? {
                        let mut owner_id = [0u8; 16];
                        if owner.len() == 16 {
                            owner_id.copy_from_slice(&owner);
                        }
                        if owner_id != assoc.id {
                            return Err(ConflictableTransactionError::Abort(
                                Error::DuplicateRelation {
                                    relation: kind.as_str().to_string(),
                                    left: id::hex(left),
                                    right: id::hex(right),
                                },
                            ));
                        }
                    }
                    rows_tx.insert(row_key.as_slice(), value.as_slice())?;
                    pairs_tx.insert(pair_key.as_slice(), &assoc.id)?;
                    endpoints_tx.insert(left_key.as_slice(), &[])?;
                    endpoints_tx.insert(right_key.as_slice(), &[])?;
                    Ok(())
                },
            );

        match result {
            Ok(()) => {
                debug!(
                    relation = %kind,
                    association = %id::hex(&assoc.id),
                    left = %id::hex(left),
                    right = %id::hex(right),
                    "association inserted"
                );
                Ok(assoc)
            }
            Err(TransactionError::Abort(e)) => Err(e),
            Err(TransactionError::Storage(e)) => Err(Error::Storage(e)),
        }
    }

    /// Re-point an existing row to the pair carried by `updated`.
    ///
    /// The old pair and endpoint entries are dropped and the new ones
    /// written together with the row in one transaction, so no observer
    /// ever sees a half-patched row. Aborts with `Error::DuplicateRelation`
    /// if the new pair is owned by a different row at commit time, and with
    /// `Error::NotFound` if the row vanished since it was loaded.
    pub fn repoint(&self, kind: RelationKind, updated: &Association) -> Result<(), Error> {
        let row_key = Self::row_key(kind, &updated.id);
        let new_pair = Self::pair_key(kind, &updated.left_id, &updated.right_id);
        let value = updated.to_bytes()?;

        let result: Result<(), TransactionError<Error>> =
            (&self.rows, &self.pairs, &self.endpoints).transaction(
                |(rows_tx, pairs_tx, endpoints_tx)| {
                    let current = match rows_tx.get(row_key.as_slice())? {
                        Some(bytes) => Association::from_bytes(&bytes)
                            .map_err(ConflictableTransactionError::Abort)?,
                        None => {
                            return Err(ConflictableTransactionError::Abort(Error::not_found(
                                kind.as_str(),
                                &updated.id,
                            )))
                        }
                    };

                    if let Some(owner) = pairs_tx.get(new_pair.as_slice())? {
                        let mut owner_id = [0u8; 16];
                        if owner.len() == 16 {
                            owner_id.copy_from_slice(&owner);
                        }
                        if owner_id != updated.id {
                            return Err(ConflictableTransactionError::Abort(
                                Error::DuplicateRelation {
                                    relation: kind.as_str().to_string(),
                                    left: id::hex(&updated.left_id),
                                    right: id::hex(&updated.right_id),
                                },
                            ));
                        }
                    }

                    let old_pair = Self::pair_key(kind, &current.left_id, &current.right_id);
                    let old_left =
                        Self::endpoint_key(kind, Side::Left, &current.left_id, &current.id);
                    let old_right =
                        Self::endpoint_key(kind, Side::Right, &current.right_id, &current.id);
                    pairs_tx.remove(old_pair.as_slice())?;
                    endpoints_tx.remove(old_left.as_slice())?;
                    endpoints_tx.remove(old_right.as_slice())?;

                    let new_left =
                        Self::endpoint_key(kind, Side::Left, &updated.left_id, &updated.id);
                    let new_right =
                        Self::endpoint_key(kind, Side::Right, &updated.right_id, &updated.id);
                    pairs_tx.insert(new_pair.as_slice(), &updated.id)?;
                    endpoints_tx.insert(new_left.as_slice(), &[])?;
                    endpoints_tx.insert(new_right.as_slice(), &[])?;
                    rows_tx.insert(row_key.as_slice(), value.as_slice())?;
                    Ok(())
                },
            );

        match result {
            Ok(()) => {
                debug!(
                    relation = %kind,
                    association = %id::hex(&updated.id),
                    left = %id::hex(&updated.left_id),
                    right = %id::hex(&updated.right_id),
                    "association re-pointed"
                );
                Ok(())
            }
            Err(TransactionError::Abort(e)) => Err(e),
            Err(TransactionError::Storage(e)) => Err(Error::Storage(e)),
        }
    }

    /// Delete the one row matching the pair, with its index entries.
    ///
    /// Returns whether a row was deleted; an absent pair is not an error.
    pub fn remove_pair(
        &self,
        kind: RelationKind,
        left: &[u8; 16],
        right: &[u8; 16],
    ) -> Result<bool, Error> {
        let pair_key = Self::pair_key(kind, left, right);

        let result: Result<bool, TransactionError<Error>> =
            (&self.rows, &self.pairs, &self.endpoints).transaction(
                |(rows_tx, pairs_tx, endpoints_tx)| {
                    let owner = match pairs_tx.get(pair_key.as_slice())? {
                        Some(bytes) => bytes,
                        None => return Ok(false),
                    };
                    if owner.len() != 16 {
                        return Err(ConflictableTransactionError::Abort(Error::InvalidKey));
                    }
                    let mut assoc_id = [0u8; 16];
                    assoc_id.copy_from_slice(&owner);

                    let row_key = Self::row_key(kind, &assoc_id);
                    let left_key = Self::endpoint_key(kind, Side::Left, left, &assoc_id);
                    let right_key = Self::endpoint_key(kind, Side::Right, right, &assoc_id);
                    rows_tx.remove(row_key.as_slice())?;
                    pairs_tx.remove(pair_key.as_slice())?;
                    endpoints_tx.remove(left_key.as_slice())?;
                    endpoints_tx.remove(right_key.as_slice())?;
                    Ok(true)
                },
            );

        match result {
            Ok(removed) => {
                if removed {
                    debug!(
                        relation = %kind,
                        left = %id::hex(left),
                        right = %id::hex(right),
                        "association removed"
                    );
                }
                Ok(removed)
            }
            Err(TransactionError::Abort(e)) => Err(e),
            Err(TransactionError::Storage(e)) => Err(Error::Storage(e)),
        }
    }

    /// Scan one endpoint's index and load the referenced rows.
    fn scan_endpoint(
        &self,
        kind: RelationKind,
        side: Side,
        leaf_id: &[u8; 16],
    ) -> Result<Vec<Association>, Error> {
        let prefix = Self::endpoint_prefix(kind, side, leaf_id);
        let mut out = Vec::new();
        for entry in self.endpoints.scan_prefix(&prefix) {
            let (key, _) = entry?;
            if key.len() != prefix.len() + 16 {
                return Err(Error::InvalidKey);
            }
            let mut assoc_id = [0u8; 16];
            assoc_id.copy_from_slice(&key[prefix.len()..]);
            if let Some(assoc) = self.get(kind, &assoc_id)? {
                out.push(assoc);
            }
        }
        Ok(out)
    }

    /// Count one endpoint's index entries without loading rows.
    fn count_endpoint(
        &self,
        kind: RelationKind,
        side: Side,
        leaf_id: &[u8; 16],
    ) -> Result<usize, Error> {
        let prefix = Self::endpoint_prefix(kind, side, leaf_id);
        let mut count = 0;
        for entry in self.endpoints.scan_prefix(&prefix) {
            entry?;
            count += 1;
        }
        Ok(count)
    }

    /// Flush pending writes to disk.
    pub fn flush(&self) -> Result<(), Error> {
        self.rows.flush()?;
        self.pairs.flush()?;
        self.endpoints.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KIND: RelationKind = RelationKind::ProductGenre;

    fn test_store() -> AssociationStore {
        let db = sled::Config::new().temporary(true).open().unwrap();
        AssociationStore::open(&db).unwrap()
    }

    #[test]
    fn test_insert_and_get() {
        let store = test_store();
        let assoc = store.insert(KIND, &[1u8; 16], &[2u8; 16]).unwrap();

        let loaded = store.get(KIND, &assoc.id).unwrap().unwrap();
        assert_eq!(loaded, assoc);
        assert_eq!(store.lookup_pair(KIND, &[1u8; 16], &[2u8; 16]).unwrap(), Some(assoc.id));
    }

    #[test]
    fn test_duplicate_pair_rejected() {
        let store = test_store();
        store.insert(KIND, &[1u8; 16], &[2u8; 16]).unwrap();

        let result = store.insert(KIND, &[1u8; 16], &[2u8; 16]);
        assert!(matches!(result, Err(Error::DuplicateRelation { .. })));

        // Only one row exists
        assert_eq!(store.find_by_left(KIND, &[1u8; 16]).unwrap().len(), 1);
    }

    #[test]
    fn test_same_pair_under_other_kind_is_fine() {
        let store = test_store();
        store.insert(KIND, &[1u8; 16], &[2u8; 16]).unwrap();
        store
            .insert(RelationKind::ProductPlatform, &[1u8; 16], &[2u8; 16])
            .unwrap();

        assert_eq!(store.find_by_left(KIND, &[1u8; 16]).unwrap().len(), 1);
        assert_eq!(
            store
                .find_by_left(RelationKind::ProductPlatform, &[1u8; 16])
                .unwrap()
                .len(),
            1
        );
    }

    #[test]
    fn test_find_by_endpoints() {
        let store = test_store();
        let product = [1u8; 16];
        let a = store.insert(KIND, &product, &[2u8; 16]).unwrap();
        let b = store.insert(KIND, &product, &[3u8; 16]).unwrap();
        store.insert(KIND, &[9u8; 16], &[2u8; 16]).unwrap();

        let by_left = store.find_by_left(KIND, &product).unwrap();
        assert_eq!(by_left.len(), 2);
        assert!(by_left.contains(&a));
        assert!(by_left.contains(&b));

        let by_right = store.find_by_right(KIND, &[2u8; 16]).unwrap();
        assert_eq!(by_right.len(), 2);

        assert!(store.find_by_left(KIND, &[7u8; 16]).unwrap().is_empty());
    }

    #[test]
    fn test_remove_pair() {
        let store = test_store();
        let assoc = store.insert(KIND, &[1u8; 16], &[2u8; 16]).unwrap();

        assert!(store.remove_pair(KIND, &[1u8; 16], &[2u8; 16]).unwrap());
        assert!(store.get(KIND, &assoc.id).unwrap().is_none());
        assert!(store.lookup_pair(KIND, &[1u8; 16], &[2u8; 16]).unwrap().is_none());
        assert!(store.find_by_left(KIND, &[1u8; 16]).unwrap().is_empty());
        assert!(store.find_by_right(KIND, &[2u8; 16]).unwrap().is_empty());

        // Absent pair is not an error
        assert!(!store.remove_pair(KIND, &[1u8; 16], &[2u8; 16]).unwrap());
    }

    #[test]
    fn test_repoint_moves_indexes() {
        let store = test_store();
        let mut assoc = store.insert(KIND, &[1u8; 16], &[2u8; 16]).unwrap();

        assoc.right_id = [3u8; 16];
        store.repoint(KIND, &assoc).unwrap();

        let loaded = store.get(KIND, &assoc.id).unwrap().unwrap();
        assert_eq!(loaded.right_id, [3u8; 16]);

        // Old pair key freed, new one mapped
        assert!(store.lookup_pair(KIND, &[1u8; 16], &[2u8; 16]).unwrap().is_none());
        assert_eq!(store.lookup_pair(KIND, &[1u8; 16], &[3u8; 16]).unwrap(), Some(assoc.id));
        assert!(store.find_by_right(KIND, &[2u8; 16]).unwrap().is_empty());
        assert_eq!(store.find_by_right(KIND, &[3u8; 16]).unwrap().len(), 1);
    }

    #[test]
    fn test_repoint_onto_taken_pair_rejected() {
        let store = test_store();
        store.insert(KIND, &[1u8; 16], &[2u8; 16]).unwrap();
        let mut other = store.insert(KIND, &[1u8; 16], &[3u8; 16]).unwrap();

        other.right_id = [2u8; 16];
        let result = store.repoint(KIND, &other);
        assert!(matches!(result, Err(Error::DuplicateRelation { .. })));

        // The losing row is untouched
        let loaded = store.get(KIND, &other.id).unwrap().unwrap();
        assert_eq!(loaded.right_id, [3u8; 16]);
    }

    #[test]
    fn test_repoint_missing_row() {
        let store = test_store();
        let ghost = Association::new([1u8; 16], [2u8; 16]);
        let result = store.repoint(KIND, &ghost);
        assert!(matches!(result, Err(Error::NotFound { .. })));
    }

    #[test]
    fn test_repoint_same_pair_is_noop() {
        let store = test_store();
        let assoc = store.insert(KIND, &[1u8; 16], &[2u8; 16]).unwrap();

        store.repoint(KIND, &assoc).unwrap();
        assert_eq!(store.lookup_pair(KIND, &[1u8; 16], &[2u8; 16]).unwrap(), Some(assoc.id));
        assert_eq!(store.find_by_left(KIND, &[1u8; 16]).unwrap().len(), 1);
    }

    #[test]
    fn test_reference_count_by_leaf_kind() {
        let store = test_store();
        let product = [1u8; 16];
        let genre = [2u8; 16];
        store.insert(KIND, &product, &genre).unwrap();
        store.insert(KIND, &product, &[3u8; 16]).unwrap();

        assert_eq!(
            store.reference_count(KIND, LeafKind::Product, &product).unwrap(),
            2
        );
        assert_eq!(
            store.reference_count(KIND, LeafKind::Genre, &genre).unwrap(),
            1
        );
        // A kind not participating on the matching side sees nothing
        assert_eq!(
            store.reference_count(KIND, LeafKind::Platform, &product).unwrap(),
            0
        );
    }

    #[test]
    fn test_persistence_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let pair_left = [1u8; 16];
        let pair_right = [2u8; 16];
        let assoc_id;

        {
            let db = sled::Config::new().path(dir.path()).open().unwrap();
            let store = AssociationStore::open(&db).unwrap();
            assoc_id = store.insert(KIND, &pair_left, &pair_right).unwrap().id;
            store.flush().unwrap();
        }

        {
            let db = sled::Config::new().path(dir.path()).open().unwrap();
            let store = AssociationStore::open(&db).unwrap();
            assert_eq!(
                store.lookup_pair(KIND, &pair_left, &pair_right).unwrap(),
                Some(assoc_id)
            );
            assert_eq!(store.find_by_left(KIND, &pair_left).unwrap().len(), 1);
        }
    }
}
