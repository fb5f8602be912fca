use std::sync::Arc;

use tracing::instrument;

use crate::error::Result;
use crate::kernel::{Item, Kernel};
use crate::tessellation::TessellationParams;
use crate::topology::SolidId;

use super::{EdgeBuffer, FaceBuffer, MeshLike, RenderNote};

/// Tessellates every face and edge of an item one after the other.
///
/// Never caches. Serves as the path for non-solid items and as the
/// reference result the parallel creator must reproduce.
pub struct BasicMeshCreator<K: Kernel> {
    kernel: Arc<K>,
}

impl<K: Kernel> Clone for BasicMeshCreator<K> {
    fn clone(&self) -> Self {
        Self {
            kernel: Arc::clone(&self.kernel),
        }
    }
}

impl<K: Kernel> BasicMeshCreator<K> {
    #[must_use]
    pub fn new(kernel: Arc<K>) -> Self {
        Self { kernel }
    }

    /// Builds the mesh of `item` on a single blocking thread.
    ///
    /// `ancestor` is accepted for parity with the parallel creator and has
    /// no effect here.
    ///
    /// # Errors
    ///
    /// Returns the first kernel failure. No partial mesh is produced.
    #[instrument(skip(self, note))]
    pub async fn create(
        &self,
        item: Item,
        precision: f64,
        note: RenderNote,
        outlines_only: bool,
        ancestor: Option<SolidId>,
    ) -> Result<MeshLike> {
        let kernel = Arc::clone(&self.kernel);
        let params = note.params(precision);
        tokio::task::spawn_blocking(move || {
            build_sequential(kernel.as_ref(), item, &params, outlines_only)
        })
        .await?
    }
}

fn build_sequential<K: Kernel>(
    kernel: &K,
    item: Item,
    params: &TessellationParams,
    outlines_only: bool,
) -> Result<MeshLike> {
    let topology = kernel.item_topology(item)?;
    let faces = topology
        .faces
        .iter()
        .enumerate()
        .map(|(i, face)| {
            Ok(FaceBuffer {
                i,
                face: face.id,
                grid: Arc::new(kernel.tessellate_face(face.id, params)?),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let mut edges = Vec::with_capacity(topology.edges.len());
    for (i, &edge) in topology.edges.iter().enumerate() {
        let polyline = kernel.tessellate_edge(edge, params, outlines_only)?;
        if polyline.segment_count() > 0 {
            edges.push(EdgeBuffer { i, edge, polyline });
        }
    }
    Ok(MeshLike { faces, edges })
}
