//! Relation kinds between catalog entities.

use super::kind::LeafKind;

/// The many-to-many relation kinds managed by the catalog.
///
/// Every kind links one left leaf kind to one right leaf kind; the pair
/// `(left_id, right_id)` is unique within a kind at all times.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationKind {
    /// Product tagged with a genre.
    ProductGenre,
    /// Product built by a developer.
    ProductDeveloper,
    /// Product published or distributed by a company.
    ProductCompany,
    /// Product released on a platform.
    ProductPlatform,
    /// Developer classified with a developer type.
    DeveloperType,
    /// Company classified with a company type.
    CompanyType,
}

impl RelationKind {
    /// All relation kinds, in declaration order.
    pub const ALL: [RelationKind; 6] = [
        RelationKind::ProductGenre,
        RelationKind::ProductDeveloper,
        RelationKind::ProductCompany,
        RelationKind::ProductPlatform,
        RelationKind::DeveloperType,
        RelationKind::CompanyType,
    ];

    /// Stable label used in storage keys, log fields, and error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationKind::ProductGenre => "product_genre",
            RelationKind::ProductDeveloper => "product_developer",
            RelationKind::ProductCompany => "product_company",
            RelationKind::ProductPlatform => "product_platform",
            RelationKind::DeveloperType => "developer_type_link",
            RelationKind::CompanyType => "company_type_link",
        }
    }

    /// Leaf kind expected on the left side of the pair.
    pub fn left_kind(&self) -> LeafKind {
        match self {
            RelationKind::ProductGenre
            | RelationKind::ProductDeveloper
            | RelationKind::ProductCompany
            | RelationKind::ProductPlatform => LeafKind::Product,
            RelationKind::DeveloperType => LeafKind::Developer,
            RelationKind::CompanyType => LeafKind::Company,
        }
    }

    /// Leaf kind expected on the right side of the pair.
    pub fn right_kind(&self) -> LeafKind {
        match self {
            RelationKind::ProductGenre => LeafKind::Genre,
            RelationKind::ProductDeveloper => LeafKind::Developer,
            RelationKind::ProductCompany => LeafKind::Company,
            RelationKind::ProductPlatform => LeafKind::Platform,
            RelationKind::DeveloperType => LeafKind::DeveloperType,
            RelationKind::CompanyType => LeafKind::CompanyType,
        }
    }

    /// Check whether a leaf kind participates on either side of this relation.
    pub fn touches(&self, kind: LeafKind) -> bool {
        self.left_kind() == kind || self.right_kind() == kind
    }
}

impl std::fmt::Display for RelationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
