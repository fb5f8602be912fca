//! The seam between mesh creation and the geometry kernel.
//!
//! Mesh creators only talk to a kernel through the [`Kernel`] trait. Its
//! methods are synchronous and may be slow, so callers run them on the
//! blocking thread pool.

mod reference;
#[cfg(test)]
pub(crate) mod testing;

pub use reference::ReferenceKernel;

use crate::error::Result;
use crate::operations::copy::SolidCopyResult;
use crate::tessellation::{TessellationParams, TriangleMesh};
use crate::topology::{EdgeId, FaceId, SolidId, WireId};

/// Something that can be turned into a mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Item {
    /// A closed solid. The only item kind that takes part in caching.
    Solid(SolidId),
    /// A single face shown as a surface.
    Surface(FaceId),
    /// A wire shown as a curve.
    Curve(WireId),
}

impl Item {
    /// The solid behind this item, if it is one.
    #[must_use]
    pub fn as_solid(self) -> Option<SolidId> {
        match self {
            Self::Solid(solid) => Some(solid),
            Self::Surface(_) | Self::Curve(_) => None,
        }
    }
}

/// A face as enumerated by the kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceRef {
    pub id: FaceId,
    /// The face's own geometry changed since its solid was copied.
    pub changed: bool,
}

/// Faces and edges of an item, in enumeration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemTopology {
    pub faces: Vec<FaceRef>,
    pub edges: Vec<EdgeId>,
}

/// Render buffers of one tessellated face.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FaceGrid {
    pub style: u32,
    /// Triangle list, three indices per triangle.
    pub index: Vec<u32>,
    /// Packed `xyz` positions.
    pub position: Vec<f32>,
    /// Packed `xyz` normals, one per position.
    pub normal: Vec<f32>,
}

impl FaceGrid {
    /// Packs a triangle mesh into render buffers.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_mesh(mesh: &TriangleMesh, style: u32) -> Self {
        Self {
            style,
            index: mesh.indices.iter().flatten().copied().collect(),
            position: mesh
                .vertices
                .iter()
                .flat_map(|p| [p.x as f32, p.y as f32, p.z as f32])
                .collect(),
            normal: mesh
                .normals
                .iter()
                .flat_map(|n| [n.x as f32, n.y as f32, n.z as f32])
                .collect(),
        }
    }

    /// Number of triangles in the grid.
    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.index.len() / 3
    }
}

/// Render buffer of one tessellated edge.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EdgePolyline {
    pub style: u32,
    /// Packed `xyz` polyline vertices.
    pub position: Vec<f32>,
}

impl EdgePolyline {
    /// Number of line segments; zero means the edge has nothing to draw.
    #[must_use]
    pub fn segment_count(&self) -> usize {
        (self.position.len() / 3).saturating_sub(1)
    }
}

/// Operations the mesh cache needs from a B-rep kernel.
///
/// Every method may be called concurrently from several blocking threads.
pub trait Kernel: Send + Sync + 'static {
    /// Enumerates the faces and edges of an item.
    ///
    /// # Errors
    ///
    /// Returns an error if the item does not exist.
    fn item_topology(&self, item: Item) -> Result<ItemTopology>;

    /// Tessellates one face.
    ///
    /// # Errors
    ///
    /// Returns an error if the face is missing or cannot be tessellated.
    fn tessellate_face(&self, face: FaceId, params: &TessellationParams) -> Result<FaceGrid>;

    /// Tessellates one edge. Edges that are not outlines yield an empty
    /// polyline when `outlines_only` is set.
    ///
    /// # Errors
    ///
    /// Returns an error if the edge is missing or cannot be tessellated.
    fn tessellate_edge(
        &self,
        edge: EdgeId,
        params: &TessellationParams,
        outlines_only: bool,
    ) -> Result<EdgePolyline>;

    /// Deep-clones a solid and reports which face became which.
    ///
    /// # Errors
    ///
    /// Returns an error if the solid is missing.
    fn copy_solid(&self, solid: SolidId) -> Result<SolidCopyResult>;

    /// Deletes a solid produced by [`Kernel::copy_solid`].
    ///
    /// # Errors
    ///
    /// Returns an error if the solid is missing.
    fn release_solid(&self, solid: SolidId) -> Result<()>;

    /// Hint that a batch of independent calls is about to be dispatched.
    fn enter_parallel_region(&self) {}

    /// Ends the batch started by [`Kernel::enter_parallel_region`].
    fn exit_parallel_region(&self) {}
}

/// Keeps the kernel in a parallel region while alive.
pub(crate) struct ParallelRegion<'a, K: Kernel + ?Sized> {
    kernel: &'a K,
}

impl<'a, K: Kernel + ?Sized> ParallelRegion<'a, K> {
    pub(crate) fn enter(kernel: &'a K) -> Self {
        kernel.enter_parallel_region();
        Self { kernel }
    }
}

impl<K: Kernel + ?Sized> Drop for ParallelRegion<'_, K> {
    fn drop(&mut self) {
        self.kernel.exit_parallel_region();
    }
}
