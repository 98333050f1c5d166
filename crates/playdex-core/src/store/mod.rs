//! sled-backed stores for leaf entities and association rows.

mod associations;
mod leaves;

pub use associations::AssociationStore;
pub use leaves::{LeafLookup, LeafStore};
