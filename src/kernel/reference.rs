use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use tracing::trace;

use crate::error::{KernelError, Result};
use crate::operations::copy::{CopySolid, DeleteSolid, SolidCopyResult};
use crate::tessellation::{TessellateCurve, TessellateFace, TessellationParams};
use crate::topology::{EdgeId, FaceId, SolidId, TopologyStore};

use super::{EdgePolyline, FaceGrid, FaceRef, Item, ItemTopology, Kernel};

/// An in-process kernel backed by a [`TopologyStore`].
///
/// ```
/// use brep_mesh_cache::kernel::{Item, Kernel, ReferenceKernel};
/// use brep_mesh_cache::math::Point3;
/// use brep_mesh_cache::operations::creation::MakeBox;
///
/// let kernel = ReferenceKernel::new();
/// let solid = kernel
///     .edit(|store| MakeBox::new(Point3::origin(), Point3::new(1.0, 1.0, 1.0)).execute(store))
///     .unwrap();
/// let topology = kernel.item_topology(Item::Solid(solid)).unwrap();
/// assert_eq!(topology.faces.len(), 6);
/// assert_eq!(topology.edges.len(), 12);
/// ```
#[derive(Debug, Default)]
pub struct ReferenceKernel {
    store: RwLock<TopologyStore>,
    region_depth: AtomicUsize,
    region_entries: AtomicUsize,
}

impl ReferenceKernel {
    /// Creates a kernel with an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps an existing store.
    #[must_use]
    pub fn with_store(store: TopologyStore) -> Self {
        Self {
            store: RwLock::new(store),
            ..Self::default()
        }
    }

    /// Runs `f` with exclusive access to the store.
    ///
    /// # Errors
    ///
    /// Returns the error produced by `f`, or [`KernelError::Poisoned`] if a
    /// previous writer panicked.
    pub fn edit<T>(&self, f: impl FnOnce(&mut TopologyStore) -> Result<T>) -> Result<T> {
        let mut store = self.store.write().map_err(|_| KernelError::Poisoned)?;
        f(&mut store)
    }

    /// Runs `f` with shared access to the store.
    ///
    /// # Errors
    ///
    /// Returns the error produced by `f`, or [`KernelError::Poisoned`] if a
    /// previous writer panicked.
    pub fn read<T>(&self, f: impl FnOnce(&TopologyStore) -> Result<T>) -> Result<T> {
        let store = self.store.read().map_err(|_| KernelError::Poisoned)?;
        f(&store)
    }

    /// Number of parallel regions currently open.
    #[must_use]
    pub fn parallel_depth(&self) -> usize {
        self.region_depth.load(Ordering::SeqCst)
    }

    /// Number of parallel regions entered so far.
    #[must_use]
    pub fn parallel_entries(&self) -> usize {
        self.region_entries.load(Ordering::SeqCst)
    }
}

impl Kernel for ReferenceKernel {
    fn item_topology(&self, item: Item) -> Result<ItemTopology> {
        self.read(|store| {
            let topology = match item {
                Item::Solid(solid) => {
                    let faces = store
                        .solid_faces(solid)?
                        .into_iter()
                        .map(|id| {
                            Ok(FaceRef {
                                id,
                                changed: store.face(id)?.modified,
                            })
                        })
                        .collect::<Result<Vec<_>>>()?;
                    ItemTopology {
                        faces,
                        edges: store.solid_edges(solid)?,
                    }
                }
                Item::Surface(face) => ItemTopology {
                    faces: vec![FaceRef {
                        id: face,
                        changed: store.face(face)?.modified,
                    }],
                    edges: store.unique_edges(store.face_wires(face)?)?,
                },
                Item::Curve(wire) => ItemTopology {
                    faces: Vec::new(),
                    edges: store.unique_edges([wire])?,
                },
            };
            Ok(topology)
        })
    }

    fn tessellate_face(&self, face: FaceId, params: &TessellationParams) -> Result<FaceGrid> {
        self.read(|store| {
            let mesh = TessellateFace::new(face, *params).execute(store)?;
            trace!(?face, triangles = mesh.indices.len(), "tessellated face");
            Ok(FaceGrid::from_mesh(&mesh, store.face(face)?.style))
        })
    }

    #[allow(clippy::cast_possible_truncation)]
    fn tessellate_edge(
        &self,
        edge: EdgeId,
        params: &TessellationParams,
        outlines_only: bool,
    ) -> Result<EdgePolyline> {
        self.read(|store| {
            let data = store.edge(edge)?;
            if outlines_only && data.seam {
                return Ok(EdgePolyline {
                    style: data.style,
                    position: Vec::new(),
                });
            }
            let poly = TessellateCurve::new(edge, *params).execute(store)?;
            Ok(EdgePolyline {
                style: data.style,
                position: poly
                    .points
                    .iter()
                    .flat_map(|p| [p.x as f32, p.y as f32, p.z as f32])
                    .collect(),
            })
        })
    }

    fn copy_solid(&self, solid: SolidId) -> Result<SolidCopyResult> {
        self.edit(|store| CopySolid::new(solid).execute(store))
    }

    fn release_solid(&self, solid: SolidId) -> Result<()> {
        self.edit(|store| DeleteSolid::new(solid).execute(store))
    }

    fn enter_parallel_region(&self) {
        self.region_entries.fetch_add(1, Ordering::SeqCst);
        self.region_depth.fetch_add(1, Ordering::SeqCst);
    }

    fn exit_parallel_region(&self) {
        self.region_depth.fetch_sub(1, Ordering::SeqCst);
    }
}
