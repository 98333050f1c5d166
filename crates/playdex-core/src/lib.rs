//! Playdex core - catalog model and sled-backed stores.
//!
//! This crate provides the durable storage for the game catalog: leaf
//! entities (products, genres, developers, companies, platforms, and their
//! classification types) and the association rows linking them.

#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

pub mod catalog;
pub mod config;
pub mod error;
pub mod id;
pub mod store;

pub use catalog::{Association, LeafKind, LeafRecord, RelationKind};
pub use config::StoreConfig;
pub use error::Error;
pub use store::{AssociationStore, LeafLookup, LeafStore};
