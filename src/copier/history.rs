use std::collections::HashMap;

use crate::error::{PoolError, Result};
use crate::operations::copy::SolidCopyResult;
use crate::topology::{FaceId, SolidId};

/// Maps the faces of a copied solid back to the faces they were copied from.
///
/// Resolution is a single hop: a copy of a copy maps to its immediate
/// source, never further.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryMap {
    ancestor: SolidId,
    entries: HashMap<FaceId, FaceId>,
}

impl HistoryMap {
    /// Builds the map from parallel arrays: `original[k]` became `copy[k]`.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::CorrespondenceMismatch`] if the arrays differ in length.
    pub fn from_correspondence(
        ancestor: SolidId,
        original: &[FaceId],
        copy: &[FaceId],
    ) -> Result<Self> {
        if original.len() != copy.len() {
            return Err(PoolError::CorrespondenceMismatch {
                original: original.len(),
                copy: copy.len(),
            }
            .into());
        }
        Ok(Self {
            ancestor,
            entries: copy.iter().copied().zip(original.iter().copied()).collect(),
        })
    }

    /// Builds the map reported by a kernel copy of `ancestor`.
    ///
    /// # Errors
    ///
    /// Returns an error if the reported arrays differ in length.
    pub fn from_copy(ancestor: SolidId, copy: &SolidCopyResult) -> Result<Self> {
        Self::from_correspondence(ancestor, &copy.original_faces, &copy.copy_faces)
    }

    /// The solid the faces were copied from.
    #[must_use]
    pub fn ancestor(&self) -> SolidId {
        self.ancestor
    }

    /// The ancestor face a copied face came from.
    #[must_use]
    pub fn resolve(&self, face: FaceId) -> Option<FaceId> {
        self.entries.get(&face).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
