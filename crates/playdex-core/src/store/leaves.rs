//! Store for catalog leaf entities.

use sled::Tree;
use tracing::debug;

use crate::catalog::{validate_name, LeafKind, LeafRecord};
use crate::error::Error;
use crate::id;

/// Tree name for leaf entity rows.
pub const LEAF_TREE: &str = "catalog:leaves";

/// Read access to leaf entities, as consumed by the association layer.
///
/// The association layer only ever resolves endpoint references through this
/// trait; it never mutates leaves.
pub trait LeafLookup {
    /// Check whether a leaf of the given kind exists.
    fn exists(&self, kind: LeafKind, id: &[u8; 16]) -> Result<bool, Error>;

    /// Load a leaf of the given kind.
    fn get(&self, kind: LeafKind, id: &[u8; 16]) -> Result<Option<LeafRecord>, Error>;
}

/// Durable storage for leaf entities.
///
/// Rows are keyed by `kind\0id`, so one tree holds every kind and a kind
/// prefix scan lists one kind's rows. Removal here is unguarded; the
/// referenced-by check lives with the association layer, which can see the
/// association indexes.
pub struct LeafStore {
    tree: Tree,
}

impl LeafStore {
    /// Open or create the leaf store from a sled database.
    pub fn open(db: &sled::Db) -> Result<Self, Error> {
        let tree = db.open_tree(LEAF_TREE)?;
        Ok(Self { tree })
    }

    /// Build the row key for a leaf.
    fn leaf_key(kind: LeafKind, id: &[u8; 16]) -> Vec<u8> {
        let label = kind.as_str();
        let mut key = Vec::with_capacity(label.len() + 1 + 16);
        key.extend_from_slice(label.as_bytes());
        key.push(0);
        key.extend_from_slice(id);
        key
    }

    /// Build the prefix for scanning all rows of a kind.
    fn kind_prefix(kind: LeafKind) -> Vec<u8> {
        let label = kind.as_str();
        let mut prefix = Vec::with_capacity(label.len() + 1);
        prefix.extend_from_slice(label.as_bytes());
        prefix.push(0);
        prefix
    }

    /// Insert a new active leaf. Returns the stored record.
    pub fn insert(&self, kind: LeafKind, name: impl Into<String>) -> Result<LeafRecord, Error> {
        let record = LeafRecord::new(kind, name)?;
        self.put(&record)?;
        debug!(kind = %kind, id = %id::hex(&record.id), name = %record.name, "leaf inserted");
        Ok(record)
    }

    /// Insert a new leaf with the active flag cleared.
    pub fn insert_inactive(
        &self,
        kind: LeafKind,
        name: impl Into<String>,
    ) -> Result<LeafRecord, Error> {
        let mut record = LeafRecord::new(kind, name)?;
        record.active = false;
        self.put(&record)?;
        debug!(kind = %kind, id = %id::hex(&record.id), name = %record.name, "inactive leaf inserted");
        Ok(record)
    }

    /// Rename a leaf. Fails with NotFound if the row is absent.
    pub fn rename(
        &self,
        kind: LeafKind,
        id: &[u8; 16],
        name: impl Into<String>,
    ) -> Result<LeafRecord, Error> {
        let mut record = self.require(kind, id)?;
        record.name = validate_name(name.into())?;
        self.put(&record)?;
        Ok(record)
    }

    /// Set a leaf's active flag. Fails with NotFound if the row is absent.
    pub fn set_active(
        &self,
        kind: LeafKind,
        id: &[u8; 16],
        active: bool,
    ) -> Result<LeafRecord, Error> {
        let mut record = self.require(kind, id)?;
        record.active = active;
        self.put(&record)?;
        Ok(record)
    }

    /// Remove a leaf row. Returns whether a row was removed.
    ///
    /// No reference check happens here; callers that need the uniform
    /// block-while-referenced rule go through the association layer.
    pub fn remove(&self, kind: LeafKind, id: &[u8; 16]) -> Result<bool, Error> {
        let removed = self.tree.remove(Self::leaf_key(kind, id))?.is_some();
        if removed {
            debug!(kind = %kind, id = %id::hex(id), "leaf removed");
        }
        Ok(removed)
    }

    /// List all rows of a kind.
    pub fn scan(&self, kind: LeafKind) -> Result<Vec<LeafRecord>, Error> {
        let prefix = Self::kind_prefix(kind);
        let mut out = Vec::new();
        for entry in self.tree.scan_prefix(&prefix) {
            let (_, value) = entry?;
            out.push(LeafRecord::from_bytes(&value)?);
        }
        Ok(out)
    }

    /// Load a leaf, failing with NotFound if absent.
    fn require(&self, kind: LeafKind, id: &[u8; 16]) -> Result<LeafRecord, Error> {
        self.get(kind, id)?
            .ok_or_else(|| Error::not_found(kind.as_str(), id))
    }

    /// Write a record under its key.
    fn put(&self, record: &LeafRecord) -> Result<(), Error> {
        let key = Self::leaf_key(record.kind, &record.id);
        let value = record.to_bytes()?;
        self.tree.insert(key, value)?;
        Ok(())
    }

    /// Flush pending writes to disk.
    pub fn flush(&self) -> Result<(), Error> {
        self.tree.flush()?;
        Ok(())
    }
}

impl LeafLookup for LeafStore {
    fn exists(&self, kind: LeafKind, id: &[u8; 16]) -> Result<bool, Error> {
        Ok(self.tree.contains_key(Self::leaf_key(kind, id))?)
    }

    fn get(&self, kind: LeafKind, id: &[u8; 16]) -> Result<Option<LeafRecord>, Error> {
        match self.tree.get(Self::leaf_key(kind, id))? {
            Some(bytes) => Ok(Some(LeafRecord::from_bytes(&bytes)?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_store() -> LeafStore {
        let db = sled::Config::new().temporary(true).open().unwrap();
        LeafStore::open(&db).unwrap()
    }

    #[test]
    fn test_insert_and_get() {
        let store = test_store();
        let genre = store.insert(LeafKind::Genre, "Metroidvania").unwrap();

        let loaded = store.get(LeafKind::Genre, &genre.id).unwrap().unwrap();
        assert_eq!(loaded, genre);
        assert!(store.exists(LeafKind::Genre, &genre.id).unwrap());
    }

    #[test]
    fn test_kinds_do_not_collide() {
        let store = test_store();
        let product = store.insert(LeafKind::Product, "Hollow Knight").unwrap();

        // Same id under a different kind is a different row
        assert!(!store.exists(LeafKind::Genre, &product.id).unwrap());
        assert!(store.get(LeafKind::Genre, &product.id).unwrap().is_none());
    }

    #[test]
    fn test_rename() {
        let store = test_store();
        let company = store.insert(LeafKind::Company, "Squaresoft").unwrap();

        let renamed = store
            .rename(LeafKind::Company, &company.id, "Square Enix")
            .unwrap();
        assert_eq!(renamed.name, "Square Enix");
        assert_eq!(renamed.id, company.id);

        let loaded = store.get(LeafKind::Company, &company.id).unwrap().unwrap();
        assert_eq!(loaded.name, "Square Enix");
    }

    #[test]
    fn test_rename_missing_row() {
        let store = test_store();
        let result = store.rename(LeafKind::Company, &[9u8; 16], "Anything");
        assert!(matches!(result, Err(Error::NotFound { .. })));
    }

    #[test]
    fn test_set_active() {
        let store = test_store();
        let platform = store.insert(LeafKind::Platform, "Dreamcast").unwrap();
        assert!(platform.active);

        let updated = store
            .set_active(LeafKind::Platform, &platform.id, false)
            .unwrap();
        assert!(!updated.active);
    }

    #[test]
    fn test_insert_inactive() {
        let store = test_store();
        let record = store
            .insert_inactive(LeafKind::Developer, "Defunct Studio")
            .unwrap();
        assert!(!record.active);
    }

    #[test]
    fn test_remove() {
        let store = test_store();
        let genre = store.insert(LeafKind::Genre, "Roguelike").unwrap();

        assert!(store.remove(LeafKind::Genre, &genre.id).unwrap());
        assert!(!store.exists(LeafKind::Genre, &genre.id).unwrap());

        // Second removal is a no-op
        assert!(!store.remove(LeafKind::Genre, &genre.id).unwrap());
    }

    #[test]
    fn test_scan_by_kind() {
        let store = test_store();
        store.insert(LeafKind::Genre, "Action").unwrap();
        store.insert(LeafKind::Genre, "Puzzle").unwrap();
        store.insert(LeafKind::Platform, "Saturn").unwrap();

        let genres = store.scan(LeafKind::Genre).unwrap();
        assert_eq!(genres.len(), 2);
        assert!(genres.iter().all(|g| g.kind == LeafKind::Genre));

        let platforms = store.scan(LeafKind::Platform).unwrap();
        assert_eq!(platforms.len(), 1);
    }

    #[test]
    fn test_empty_name_rejected() {
        let store = test_store();
        let result = store.insert(LeafKind::Genre, "  ");
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[test]
    fn test_persistence_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let genre_id;

        {
            let db = sled::Config::new().path(dir.path()).open().unwrap();
            let store = LeafStore::open(&db).unwrap();
            genre_id = store.insert(LeafKind::Genre, "Survival").unwrap().id;
            store.flush().unwrap();
        }

        {
            let db = sled::Config::new().path(dir.path()).open().unwrap();
            let store = LeafStore::open(&db).unwrap();
            let loaded = store.get(LeafKind::Genre, &genre_id).unwrap().unwrap();
            assert_eq!(loaded.name, "Survival");
        }
    }
}
