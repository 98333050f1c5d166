//! Leaf entity kinds.

use rkyv::{Archive, Deserialize, Serialize};

/// The catalog entity kinds that can participate in associations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Archive, Serialize, Deserialize)]
pub enum LeafKind {
    /// A game in the catalog.
    Product,
    /// A genre tag.
    Genre,
    /// A development studio.
    Developer,
    /// A publishing or distribution company.
    Company,
    /// A hardware or storefront platform.
    Platform,
    /// Classification of a developer (indie, first-party, ...).
    DeveloperType,
    /// Classification of a company (publisher, distributor, ...).
    CompanyType,
}

impl LeafKind {
    /// All leaf kinds, in declaration order.
    pub const ALL: [LeafKind; 7] = [
        LeafKind::Product,
        LeafKind::Genre,
        LeafKind::Developer,
        LeafKind::Company,
        LeafKind::Platform,
        LeafKind::DeveloperType,
        LeafKind::CompanyType,
    ];

    /// Stable label used in storage keys, log fields, and error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            LeafKind::Product => "product",
            LeafKind::Genre => "genre",
            LeafKind::Developer => "developer",
            LeafKind::Company => "company",
            LeafKind::Platform => "platform",
            LeafKind::DeveloperType => "developer_type",
            LeafKind::CompanyType => "company_type",
        }
    }
}

impl std::fmt::Display for LeafKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
