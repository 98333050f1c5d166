//! Association manager: link, unlink, and patch for one relation kind.

use tracing::debug;

use playdex_core::id;
use playdex_core::store::AssociationStore;
use playdex_core::{Association, Error, LeafKind, LeafLookup, RelationKind};

/// Manages the associations of one relation kind.
///
/// One generic manager serves all six relation kinds; a value is bound to
/// its kind at construction and resolves endpoint references through the
/// [`LeafLookup`] capability, never mutating leaves. Every mutation commits
/// exactly one storage transaction.
///
/// Duplicate policy: `link` on an existing pair returns the stored row
/// unchanged, for every relation kind alike. The storage layer still raises
/// `DuplicateRelation` when a concurrent insert wins the pair between the
/// existence check and the commit; the manager performs no internal retry,
/// so that surfaces to the caller, for whom the call is safely repeatable.
pub struct AssociationManager<'a, V: LeafLookup> {
    kind: RelationKind,
    leaves: &'a V,
    store: &'a AssociationStore,
}

impl<'a, V: LeafLookup> AssociationManager<'a, V> {
    /// Create a manager bound to one relation kind.
    pub fn new(kind: RelationKind, leaves: &'a V, store: &'a AssociationStore) -> Self {
        Self {
            kind,
            leaves,
            store,
        }
    }

    /// The relation kind this manager is bound to.
    pub fn kind(&self) -> RelationKind {
        self.kind
    }

    /// Read access to the leaf lookup this manager resolves against.
    pub(crate) fn leaves(&self) -> &'a V {
        self.leaves
    }

    /// List all associations with the given left endpoint.
    ///
    /// Pure lookup: the endpoint id itself is not validated, and an unknown
    /// id yields an empty list.
    pub fn find_by_left(&self, left_id: &[u8; 16]) -> Result<Vec<Association>, Error> {
        self.store.find_by_left(self.kind, left_id)
    }

    /// List all associations with the given right endpoint.
    pub fn find_by_right(&self, right_id: &[u8; 16]) -> Result<Vec<Association>, Error> {
        self.store.find_by_right(self.kind, right_id)
    }

    /// Load an association by id, failing with NotFound if absent.
    pub fn get(&self, assoc_id: &[u8; 16]) -> Result<Association, Error> {
        self.store
            .get(self.kind, assoc_id)?
            .ok_or_else(|| Error::not_found(self.kind.as_str(), assoc_id))
    }

    /// Create the association for a pair, or confirm the existing one.
    ///
    /// Both endpoints must exist under the relation's leaf kinds (NotFound
    /// otherwise, with nothing written). An already-linked pair returns the
    /// stored row unchanged.
    pub fn link(&self, left_id: &[u8; 16], right_id: &[u8; 16]) -> Result<Association, Error> {
        self.require_leaf(self.kind.left_kind(), left_id)?;
        self.require_leaf(self.kind.right_kind(), right_id)?;

        if let Some(existing_id) = self.store.lookup_pair(self.kind, left_id, right_id)? {
            if let Some(existing) = self.store.get(self.kind, &existing_id)? {
                debug!(
                    relation = %self.kind,
                    association = %id::hex(&existing_id),
                    "link already present"
                );
                return Ok(existing);
            }
        }

        self.store.insert(self.kind, left_id, right_id)
    }

    /// Delete the association for a pair, if one exists.
    ///
    /// Both endpoints must exist (NotFound otherwise). An absent pair is a
    /// successful no-op; a present pair loses exactly its one row.
    pub fn unlink(&self, left_id: &[u8; 16], right_id: &[u8; 16]) -> Result<(), Error> {
        self.require_leaf(self.kind.left_kind(), left_id)?;
        self.require_leaf(self.kind.right_kind(), right_id)?;

        let removed = self.store.remove_pair(self.kind, left_id, right_id)?;
        if !removed {
            debug!(
                relation = %self.kind,
                left = %id::hex(left_id),
                right = %id::hex(right_id),
                "unlink of absent pair ignored"
            );
        }
        Ok(())
    }

    /// Re-point an association to a new left and/or right endpoint.
    ///
    /// Endpoints are applied left first, then right; the right-side
    /// duplicate check runs against the left value as it stands after the
    /// left step. Nothing is persisted until both steps pass, and the final
    /// row is written in a single transaction, so a failed patch leaves the
    /// stored row exactly as it was.
    pub fn patch(
        &self,
        assoc_id: &[u8; 16],
        new_left: Option<[u8; 16]>,
        new_right: Option<[u8; 16]>,
    ) -> Result<Association, Error> {
        if new_left.is_none() && new_right.is_none() {
            return Err(Error::Validation(
                "patch must name a new left or right endpoint".to_string(),
            ));
        }

        let mut assoc = self.get(assoc_id)?;

        if let Some(left_id) = new_left {
            self.require_leaf(self.kind.left_kind(), &left_id)?;
            self.ensure_pair_free(&left_id, &assoc.right_id, &assoc.id)?;
            assoc.left_id = left_id;
        }

        if let Some(right_id) = new_right {
            self.require_leaf(self.kind.right_kind(), &right_id)?;
            self.ensure_pair_free(&assoc.left_id, &right_id, &assoc.id)?;
            assoc.right_id = right_id;
        }

        self.store.repoint(self.kind, &assoc)?;
        debug!(
            relation = %self.kind,
            association = %id::hex(&assoc.id),
            left = %id::hex(&assoc.left_id),
            right = %id::hex(&assoc.right_id),
            "association patched"
        );
        Ok(assoc)
    }

    /// Fail with DuplicateRelation if the pair belongs to another row.
    fn ensure_pair_free(
        &self,
        left_id: &[u8; 16],
        right_id: &[u8; 16],
        own_id: &[u8; 16],
    ) -> Result<(), Error> {
        match self.store.lookup_pair(self.kind, left_id, right_id)? {
            Some(owner) if owner != *own_id => Err(Error::DuplicateRelation {
                relation: self.kind.as_str().to_string(),
                left: id::hex(left_id),
                right: id::hex(right_id),
            }),
            _ => Ok(()),
        }
    }

    /// Fail with NotFound unless the leaf exists under the given kind.
    fn require_leaf(&self, kind: LeafKind, leaf_id: &[u8; 16]) -> Result<(), Error> {
        if self.leaves.exists(kind, leaf_id)? {
            Ok(())
        } else {
            Err(Error::not_found(kind.as_str(), leaf_id))
        }
    }
}
