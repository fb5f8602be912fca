use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, instrument, warn};

use crate::config::MeshCacheConfig;
use crate::copier::HistoryMap;
use crate::error::{KernelError, MeshCacheError, Result};
use crate::kernel::{Item, Kernel, ParallelRegion};
use crate::tessellation::TessellationParams;
use crate::topology::SolidId;

use super::basic::BasicMeshCreator;
use super::cache::{Claim, FaceKey, MeshCache};
use super::session::{CloseOnDrop, Session};
use super::{EdgeBuffer, FaceBuffer, MeshLike, RenderNote};

/// Meshes solids by tessellating their faces and edges concurrently.
///
/// Non-solid items are handed to [`BasicMeshCreator`]. Cloning is cheap and
/// clones share the kernel and the concurrency limit.
pub struct ParallelMeshCreator<K: Kernel> {
    kernel: Arc<K>,
    basic: BasicMeshCreator<K>,
    limiter: Arc<Semaphore>,
    config: Arc<MeshCacheConfig>,
}

impl<K: Kernel> Clone for ParallelMeshCreator<K> {
    fn clone(&self) -> Self {
        Self {
            kernel: Arc::clone(&self.kernel),
            basic: self.basic.clone(),
            limiter: Arc::clone(&self.limiter),
            config: Arc::clone(&self.config),
        }
    }
}

/// A finished face or edge task.
enum Done {
    /// `cache_as` is the precision and ancestor identity to cache the
    /// buffer under.
    Face {
        buffer: FaceBuffer,
        cache_as: Option<FaceKey>,
    },
    Edge(EdgeBuffer),
}

impl<K: Kernel> ParallelMeshCreator<K> {
    #[must_use]
    pub fn new(kernel: Arc<K>) -> Self {
        Self::with_config(kernel, MeshCacheConfig::default())
    }

    #[must_use]
    pub fn with_config(kernel: Arc<K>, config: MeshCacheConfig) -> Self {
        Self {
            basic: BasicMeshCreator::new(Arc::clone(&kernel)),
            limiter: Arc::new(Semaphore::new(config.max_concurrency.max(1))),
            config: Arc::new(config),
            kernel,
        }
    }

    #[must_use]
    pub fn kernel(&self) -> &Arc<K> {
        &self.kernel
    }

    #[must_use]
    pub fn config(&self) -> &MeshCacheConfig {
        &self.config
    }

    #[must_use]
    pub fn basic(&self) -> &BasicMeshCreator<K> {
        &self.basic
    }

    /// Builds the mesh of `item` without any caching.
    ///
    /// # Errors
    ///
    /// Returns the first face or edge failure once all scheduled work has
    /// finished.
    pub async fn create(
        &self,
        item: Item,
        precision: f64,
        note: RenderNote,
        outlines_only: bool,
        ancestor: Option<SolidId>,
    ) -> Result<Arc<MeshLike>> {
        self.create_in(None, item, precision, note, outlines_only, ancestor)
            .await
    }

    /// Runs `scope` inside a fresh caching session.
    ///
    /// The session is closed when `scope` finishes, fails, panics or is
    /// dropped. Nested calls open independent sessions.
    ///
    /// # Errors
    ///
    /// Returns whatever `scope` returns.
    #[instrument(skip_all)]
    pub async fn caching<F, Fut, T>(&self, scope: F) -> Result<T>
    where
        F: FnOnce(Session<K>) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let session = Session::open(self.clone());
        let _close = CloseOnDrop::new(&session);
        debug!("caching session opened");
        scope(session).await
    }

    #[instrument(skip(self, cache, note), fields(cached = cache.is_some_and(MeshCache::is_open)))]
    pub(crate) async fn create_in(
        &self,
        cache: Option<&MeshCache>,
        item: Item,
        precision: f64,
        note: RenderNote,
        outlines_only: bool,
        ancestor: Option<SolidId>,
    ) -> Result<Arc<MeshLike>> {
        let Some(solid) = item.as_solid() else {
            let mesh = self
                .basic
                .create(item, precision, note, outlines_only, ancestor)
                .await?;
            return Ok(Arc::new(mesh));
        };

        let cache = cache.filter(|c| c.is_open());
        let bits = precision.to_bits();
        let leader = match cache.and_then(|c| c.claim((bits, solid))) {
            Some(Claim::Hit(mesh)) => {
                debug!(?solid, "object cache hit");
                return Ok(mesh);
            }
            Some(Claim::Wait(waiter)) => {
                debug!(?solid, "coalescing onto in-flight mesh");
                return waiter.wait().await;
            }
            Some(Claim::Lead(leader)) => Some(leader),
            None => None,
        };

        let history = cache.and_then(|c| c.history(solid)).filter(|h| match ancestor {
            Some(expected) if expected != h.ancestor() => {
                debug!(?solid, ?expected, found = ?h.ancestor(), "history ancestor mismatch");
                false
            }
            _ => true,
        });

        let params = note.params(precision);
        let outcome = self
            .mesh_solid(cache, solid, bits, params, outlines_only, history.as_deref())
            .await
            .map(Arc::new);
        if let Some(leader) = leader {
            leader.finish(&outcome);
        }
        outcome
    }

    /// `bits` is the precision half of every face cache key.
    async fn mesh_solid(
        &self,
        cache: Option<&MeshCache>,
        solid: SolidId,
        bits: u64,
        params: TessellationParams,
        outlines_only: bool,
        history: Option<&HistoryMap>,
    ) -> Result<MeshLike> {
        let kernel = Arc::clone(&self.kernel);
        let topology =
            tokio::task::spawn_blocking(move || kernel.item_topology(Item::Solid(solid))).await??;

        let region = ParallelRegion::enter(self.kernel.as_ref());
        let mut faces = Vec::with_capacity(topology.faces.len());
        let mut edges = Vec::with_capacity(topology.edges.len());
        let mut tasks: JoinSet<Result<Done>> = JoinSet::new();

        for (i, face) in topology.faces.iter().enumerate() {
            let cache_as = match history {
                Some(history) if cache.is_some() && !face.changed => {
                    history.resolve(face.id).map(|ancestor| (bits, ancestor))
                }
                _ => None,
            };
            if let Some(grid) = cache.zip(cache_as).and_then(|(c, key)| c.face(key)) {
                debug!(face = ?face.id, "face cache hit");
                faces.push(FaceBuffer {
                    i,
                    face: face.id,
                    grid,
                });
                continue;
            }

            let kernel = Arc::clone(&self.kernel);
            let limiter = Arc::clone(&self.limiter);
            let id = face.id;
            tasks.spawn(async move {
                let _permit = limiter
                    .acquire_owned()
                    .await
                    .map_err(|_| KernelError::LimiterClosed)?;
                let grid =
                    tokio::task::spawn_blocking(move || kernel.tessellate_face(id, &params))
                        .await??;
                Ok(Done::Face {
                    buffer: FaceBuffer {
                        i,
                        face: id,
                        grid: Arc::new(grid),
                    },
                    cache_as,
                })
            });
        }

        for (i, &edge) in topology.edges.iter().enumerate() {
            let kernel = Arc::clone(&self.kernel);
            let limiter = Arc::clone(&self.limiter);
            tasks.spawn(async move {
                let _permit = limiter
                    .acquire_owned()
                    .await
                    .map_err(|_| KernelError::LimiterClosed)?;
                let polyline = tokio::task::spawn_blocking(move || {
                    kernel.tessellate_edge(edge, &params, outlines_only)
                })
                .await??;
                Ok(Done::Edge(EdgeBuffer { i, edge, polyline }))
            });
        }

        let mut first_err = None;
        while let Some(joined) = tasks.join_next().await {
            match joined.map_err(MeshCacheError::from).and_then(|done| done) {
                Ok(Done::Face { buffer, cache_as }) => {
                    if let Some((cache, key)) = cache.zip(cache_as) {
                        cache.store_face(key, Arc::clone(&buffer.grid));
                    }
                    faces.push(buffer);
                }
                Ok(Done::Edge(buffer)) => {
                    if buffer.polyline.segment_count() > 0 {
                        edges.push(buffer);
                    }
                }
                Err(err) => {
                    warn!(?solid, error = %err, "tessellation task failed");
                    first_err.get_or_insert(err);
                }
            }
        }
        drop(region);

        if let Some(err) = first_err {
            return Err(err);
        }
        faces.sort_by_key(|f| f.i);
        edges.sort_by_key(|e| e.i);
        Ok(MeshLike { faces, edges })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::kernel::testing::CountingKernel;

    fn creator() -> (Arc<CountingKernel>, ParallelMeshCreator<CountingKernel>) {
        let kernel = Arc::new(CountingKernel::new());
        let creator = ParallelMeshCreator::new(Arc::clone(&kernel));
        (kernel, creator)
    }

    async fn both(
        creator: &ParallelMeshCreator<CountingKernel>,
        item: Item,
        outlines_only: bool,
    ) -> (MeshLike, Arc<MeshLike>) {
        let note = RenderNote::default();
        let basic = creator
            .basic()
            .create(item, 0.01, note, outlines_only, None)
            .await
            .unwrap();
        let parallel = creator
            .create(item, 0.01, note, outlines_only, None)
            .await
            .unwrap();
        (basic, parallel)
    }

    #[tokio::test]
    async fn sphere_outline_matches_basic() {
        let (kernel, creator) = creator();
        let sphere = kernel.unit_sphere();
        let (basic, parallel) = both(&creator, Item::Solid(sphere), true).await;
        assert_eq!(parallel.faces.len(), 1);
        assert!(parallel.edges.is_empty());
        assert_eq!(basic.faces[0].grid.position, parallel.faces[0].grid.position);
        assert_eq!(basic.faces[0].grid.normal, parallel.faces[0].grid.normal);
        assert_eq!(basic.faces[0].grid.index, parallel.faces[0].grid.index);
        assert_eq!(basic.edges.len(), parallel.edges.len());
    }

    #[tokio::test]
    async fn sphere_without_outline_filter_keeps_seam() {
        let (kernel, creator) = creator();
        let sphere = kernel.unit_sphere();
        let (_, parallel) = both(&creator, Item::Solid(sphere), false).await;
        assert_eq!(parallel.edges.len(), 1);
    }

    #[tokio::test]
    async fn box_matches_basic() {
        let (kernel, creator) = creator();
        let solid = kernel.unit_box();
        let (basic, parallel) = both(&creator, Item::Solid(solid), true).await;
        assert_eq!(parallel.faces.len(), 6);
        assert_eq!(parallel.edges.len(), 12);
        assert_eq!(&basic, parallel.as_ref());
        assert!(parallel.faces.iter().enumerate().all(|(k, f)| f.i == k));
        assert!(parallel.edges.iter().enumerate().all(|(k, e)| e.i == k));
    }

    #[tokio::test]
    async fn non_solids_use_the_basic_path() {
        let (kernel, creator) = creator();
        let solid = kernel.unit_box();
        let face = kernel.face_ids(solid)[0];
        let mesh = creator
            .create(Item::Surface(face), 0.01, RenderNote::default(), false, None)
            .await
            .unwrap();
        assert_eq!(mesh.faces.len(), 1);
        assert_eq!(mesh.edges.len(), 4);
        assert_eq!(kernel.parallel_entries(), 0);
    }

    #[tokio::test]
    async fn parallel_region_is_balanced() {
        let (kernel, creator) = creator();
        let solid = kernel.unit_box();
        creator
            .create(Item::Solid(solid), 0.01, RenderNote::default(), false, None)
            .await
            .unwrap();
        assert_eq!(kernel.parallel_depth(), 0);
        assert_eq!(kernel.parallel_entries(), 1);
    }

    #[tokio::test]
    async fn uncached_calls_recompute() {
        let (kernel, creator) = creator();
        let solid = kernel.unit_box();
        let first = creator
            .create(Item::Solid(solid), 0.01, RenderNote::default(), false, None)
            .await
            .unwrap();
        let second = creator
            .create(Item::Solid(solid), 0.01, RenderNote::default(), false, None)
            .await
            .unwrap();
        assert_eq!(kernel.face_calls(), 12);
        assert!(!Arc::ptr_eq(&first, &second));
        assert!(!Arc::ptr_eq(&first.faces[0].grid, &second.faces[0].grid));
    }

    #[tokio::test]
    async fn failure_waits_for_siblings() {
        let (kernel, creator) = creator();
        let solid = kernel.unit_box();
        kernel.fail_face(kernel.face_ids(solid)[3]);
        let result = creator
            .create(Item::Solid(solid), 0.01, RenderNote::default(), false, None)
            .await;
        assert!(result.is_err());
        assert_eq!(kernel.face_calls(), 6);
        assert_eq!(kernel.edge_calls(), 12);
        assert_eq!(kernel.parallel_depth(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn single_permit_still_completes() {
        let kernel = Arc::new(CountingKernel::new());
        let creator = ParallelMeshCreator::with_config(
            Arc::clone(&kernel),
            MeshCacheConfig::default().with_max_concurrency(1),
        );
        let solid = kernel.unit_box();
        let mesh = creator
            .create(Item::Solid(solid), 0.01, RenderNote::default(), false, None)
            .await
            .unwrap();
        assert_eq!(mesh.faces.len(), 6);
    }
}
