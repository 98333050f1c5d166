//! Listing projections joining associations with their leaf records.

use playdex_core::{Association, Error, LeafLookup, LeafRecord};

use crate::manager::AssociationManager;

/// One association joined with both of its leaf records.
///
/// This is the shape listing responses are built from: the caller gets the
/// endpoint names and active flags without issuing follow-up lookups.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkSummary {
    /// The stored association row.
    pub association: Association,
    /// The resolved left endpoint.
    pub left: LeafRecord,
    /// The resolved right endpoint.
    pub right: LeafRecord,
}

impl<'a, V: LeafLookup> AssociationManager<'a, V> {
    /// List the associations of a left endpoint, joined with leaf records.
    pub fn summaries_for_left(&self, left_id: &[u8; 16]) -> Result<Vec<LinkSummary>, Error> {
        self.find_by_left(left_id)?
            .into_iter()
            .map(|assoc| self.summarize(assoc))
            .collect()
    }

    /// List the associations of a right endpoint, joined with leaf records.
    pub fn summaries_for_right(&self, right_id: &[u8; 16]) -> Result<Vec<LinkSummary>, Error> {
        self.find_by_right(right_id)?
            .into_iter()
            .map(|assoc| self.summarize(assoc))
            .collect()
    }

    /// Join one association with both of its leaf records.
    ///
    /// A missing leaf surfaces as NotFound; with the uniform delete-guard in
    /// place that only happens when the store was modified out of band.
    fn summarize(&self, association: Association) -> Result<LinkSummary, Error> {
        let left_kind = self.kind().left_kind();
        let right_kind = self.kind().right_kind();

        let left = self
            .leaves()
            .get(left_kind, &association.left_id)?
            .ok_or_else(|| Error::not_found(left_kind.as_str(), &association.left_id))?;
        let right = self
            .leaves()
            .get(right_kind, &association.right_id)?
            .ok_or_else(|| Error::not_found(right_kind.as_str(), &association.right_id))?;

        Ok(LinkSummary {
            association,
            left,
            right,
        })
    }
}
