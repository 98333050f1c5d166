//! Catalog wrapper wiring the stores to per-relation-kind managers.

use tracing::info;

use playdex_core::store::{AssociationStore, LeafStore};
use playdex_core::{Error, LeafKind, RelationKind, StoreConfig};

use crate::guard::ReferenceGuard;
use crate::manager::AssociationManager;

/// The assembled catalog: one database, the two stores, and a bound
/// association manager per relation kind.
pub struct CatalogLinks {
    db: sled::Db,
    leaves: LeafStore,
    associations: AssociationStore,
}

impl CatalogLinks {
    /// Open or create the catalog described by the configuration.
    pub fn open(config: &StoreConfig) -> Result<Self, Error> {
        let db = config.open()?;
        let leaves = LeafStore::open(&db)?;
        let associations = AssociationStore::open(&db)?;
        info!(path = %config.path.display(), "catalog opened");
        Ok(Self {
            db,
            leaves,
            associations,
        })
    }

    /// Open a temporary catalog for testing; deleted on drop.
    pub fn temporary() -> Result<Self, Error> {
        Self::open(&StoreConfig::temporary())
    }

    /// The leaf entity store.
    pub fn leaves(&self) -> &LeafStore {
        &self.leaves
    }

    /// The association store shared by all relation kinds.
    pub fn associations(&self) -> &AssociationStore {
        &self.associations
    }

    /// A manager bound to an arbitrary relation kind.
    pub fn manager(&self, kind: RelationKind) -> AssociationManager<'_, LeafStore> {
        AssociationManager::new(kind, &self.leaves, &self.associations)
    }

    /// Product ↔ genre links.
    pub fn product_genres(&self) -> AssociationManager<'_, LeafStore> {
        self.manager(RelationKind::ProductGenre)
    }

    /// Product ↔ developer links.
    pub fn product_developers(&self) -> AssociationManager<'_, LeafStore> {
        self.manager(RelationKind::ProductDeveloper)
    }

    /// Product ↔ company links.
    pub fn product_companies(&self) -> AssociationManager<'_, LeafStore> {
        self.manager(RelationKind::ProductCompany)
    }

    /// Product ↔ platform links.
    pub fn product_platforms(&self) -> AssociationManager<'_, LeafStore> {
        self.manager(RelationKind::ProductPlatform)
    }

    /// Developer ↔ developer-type links.
    pub fn developer_types(&self) -> AssociationManager<'_, LeafStore> {
        self.manager(RelationKind::DeveloperType)
    }

    /// Company ↔ company-type links.
    pub fn company_types(&self) -> AssociationManager<'_, LeafStore> {
        self.manager(RelationKind::CompanyType)
    }

    /// The delete-guard over the association store.
    pub fn guard(&self) -> ReferenceGuard<'_> {
        ReferenceGuard::new(&self.associations)
    }

    /// Remove a leaf, enforcing the block-while-referenced rule.
    ///
    /// Returns whether a row was removed. Fails with `Error::Referenced`
    /// while any association still touches the leaf.
    pub fn remove_leaf(&self, kind: LeafKind, leaf_id: &[u8; 16]) -> Result<bool, Error> {
        self.guard().check(kind, leaf_id)?;
        self.leaves.remove(kind, leaf_id)
    }

    /// Flush all pending writes to disk.
    pub fn flush(&self) -> Result<(), Error> {
        self.db.flush()?;
        Ok(())
    }
}
