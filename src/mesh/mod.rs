//! Mesh creation for display, with per-session caching.
//!
//! [`ParallelMeshCreator`] is the entry point. Outside a caching session it
//! recomputes everything on every call. Inside [`ParallelMeshCreator::caching`]
//! it reuses face buffers across copies of a solid and coalesces duplicate
//! requests for the same solid.

mod basic;
mod cache;
mod levels;
mod parallel;
mod session;
mod verify;

pub use basic::BasicMeshCreator;
pub use parallel::ParallelMeshCreator;
pub use session::Session;
pub use verify::{compare_meshes, MeshMismatch, VerificationReport, VerifyingMeshCreator};

use std::sync::Arc;

use crate::kernel::{EdgePolyline, FaceGrid};
use crate::tessellation::TessellationParams;
use crate::topology::{EdgeId, FaceId};

/// Rendering flags that accompany a precision value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderNote {
    pub quad: bool,
    pub fair: bool,
}

impl Default for RenderNote {
    fn default() -> Self {
        Self {
            quad: true,
            fair: true,
        }
    }
}

impl RenderNote {
    /// Tessellation parameters for this note at `precision`.
    #[must_use]
    pub fn params(self, precision: f64) -> TessellationParams {
        TessellationParams {
            tolerance: precision,
            quad: self.quad,
            fair: self.fair,
            ..TessellationParams::default()
        }
    }
}

/// A tessellated face, tagged with its position in the item's face list.
#[derive(Debug, Clone, PartialEq)]
pub struct FaceBuffer {
    pub i: usize,
    pub face: FaceId,
    /// Shared with the face cache when the buffer was reused or cached.
    pub grid: Arc<FaceGrid>,
}

/// A tessellated edge, tagged with its position in the item's edge list.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeBuffer {
    pub i: usize,
    pub edge: EdgeId,
    pub polyline: EdgePolyline,
}

/// The display mesh of one item.
///
/// Faces and edges are sorted by `i`. Edges that produced no segments are
/// left out, so edge indices may have gaps.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshLike {
    pub faces: Vec<FaceBuffer>,
    pub edges: Vec<EdgeBuffer>,
}

impl MeshLike {
    /// Total triangle count over all faces.
    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.faces.iter().map(|f| f.grid.triangle_count()).sum()
    }
}
