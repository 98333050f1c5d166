//! Referential delete-guard for leaf entities.

use tracing::debug;

use playdex_core::id;
use playdex_core::store::AssociationStore;
use playdex_core::{Error, LeafKind, RelationKind};

/// The uniform block-delete-while-referenced rule.
///
/// Every leaf kind participating in any relation is guarded the same way:
/// removal fails with `Error::Referenced` while at least one association row
/// still touches the leaf, naming the first relation kind found holding a
/// reference. Unlinking the rows first makes the leaf removable again.
pub struct ReferenceGuard<'a> {
    associations: &'a AssociationStore,
}

impl<'a> ReferenceGuard<'a> {
    /// Create a guard over the association store.
    pub fn new(associations: &'a AssociationStore) -> Self {
        Self { associations }
    }

    /// Fail with `Error::Referenced` if any association touches the leaf.
    pub fn check(&self, kind: LeafKind, leaf_id: &[u8; 16]) -> Result<(), Error> {
        for relation in RelationKind::ALL {
            if !relation.touches(kind) {
                continue;
            }
            let count = self.associations.reference_count(relation, kind, leaf_id)?;
            if count > 0 {
                debug!(
                    kind = %kind,
                    id = %id::hex(leaf_id),
                    relation = %relation,
                    count,
                    "removal blocked by live references"
                );
                return Err(Error::Referenced {
                    kind: kind.as_str().to_string(),
                    id: id::hex(leaf_id),
                    relation: relation.as_str().to_string(),
                    count,
                });
            }
        }
        Ok(())
    }

    /// Total association rows touching the leaf, across all relation kinds.
    pub fn total_references(&self, kind: LeafKind, leaf_id: &[u8; 16]) -> Result<usize, Error> {
        let mut total = 0;
        for relation in RelationKind::ALL {
            if relation.touches(kind) {
                total += self.associations.reference_count(relation, kind, leaf_id)?;
            }
        }
        Ok(total)
    }
}
