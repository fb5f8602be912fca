use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, instrument};

use crate::config::LevelMode;
use crate::copier::{CopyPool, HistoryMap, SolidCopy};
use crate::error::Result;
use crate::kernel::{FaceGrid, Item, Kernel};
use crate::topology::{FaceId, SolidId};

use super::cache::MeshCache;
use super::{MeshLike, ParallelMeshCreator, RenderNote};

type Pools<K> = HashMap<SolidId, Arc<CopyPool<K>>>;

pub(crate) struct SessionState<K: Kernel> {
    pub(crate) cache: MeshCache,
    /// `None` once closed.
    pools: Mutex<Option<Pools<K>>>,
}

impl<K: Kernel> SessionState<K> {
    fn close(&self) {
        self.cache.close();
        // Dropping the pools releases their unused copies.
        let pools = self
            .pools
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        drop(pools);
    }
}

/// Handle to an open caching session.
///
/// Obtained from [`ParallelMeshCreator::caching`]. Clones share the same
/// session. Once the session has closed, every method behaves as if no
/// session existed: nothing is cached and nothing is found.
pub struct Session<K: Kernel> {
    creator: ParallelMeshCreator<K>,
    state: Arc<SessionState<K>>,
}

impl<K: Kernel> Clone for Session<K> {
    fn clone(&self) -> Self {
        Self {
            creator: self.creator.clone(),
            state: Arc::clone(&self.state),
        }
    }
}

impl<K: Kernel> Session<K> {
    pub(crate) fn open(creator: ParallelMeshCreator<K>) -> Self {
        Self {
            creator,
            state: Arc::new(SessionState {
                cache: MeshCache::open(),
                pools: Mutex::new(Some(HashMap::new())),
            }),
        }
    }

    pub(crate) fn state(&self) -> &Arc<SessionState<K>> {
        &self.state
    }

    #[must_use]
    pub fn creator(&self) -> &ParallelMeshCreator<K> {
        &self.creator
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state.cache.is_open()
    }

    /// Builds the mesh of `item`, reusing what this session already holds.
    ///
    /// # Errors
    ///
    /// Returns the first face or edge failure. Face buffers of sibling faces
    /// that succeeded stay cached.
    pub async fn create(
        &self,
        item: Item,
        precision: f64,
        note: RenderNote,
        outlines_only: bool,
        ancestor: Option<SolidId>,
    ) -> Result<Arc<MeshLike>> {
        self.creator
            .create_in(
                Some(&self.state.cache),
                item,
                precision,
                note,
                outlines_only,
                ancestor,
            )
            .await
    }

    /// Records how the faces of `solid` map to its ancestor's faces.
    ///
    /// Must happen before `solid` is meshed for its faces to be reusable.
    pub fn register(&self, solid: SolidId, history: Arc<HistoryMap>) {
        debug!(?solid, ancestor = ?history.ancestor(), faces = history.len(), "registered history");
        self.state.cache.register(solid, history);
    }

    /// The buffer cached for `face`, an ancestor face identity, at
    /// `precision`.
    #[must_use]
    pub fn cached_face(&self, face: FaceId, precision: f64) -> Option<Arc<FaceGrid>> {
        self.state.cache.face((precision.to_bits(), face))
    }

    /// The copy pool for `solid`, created and filled on first use.
    ///
    /// `size` is the target of a newly created pool only. Once a pool for
    /// `solid` exists it is returned as is, whatever `size` is passed; check
    /// [`CopyPool::target`] if it matters.
    ///
    /// Pools live as long as the session. After the session has closed a
    /// fresh, unshared pool is returned.
    ///
    /// # Errors
    ///
    /// Returns an error if `size` is zero or the initial fill fails.
    #[instrument(skip(self))]
    pub async fn pool(&self, solid: SolidId, size: usize) -> Result<Arc<CopyPool<K>>> {
        if let Some(pool) = self.pools(|pools| pools.get(&solid).cloned()).flatten() {
            return Ok(pool);
        }

        let pool = Arc::new(CopyPool::new(
            Arc::clone(self.creator.kernel()),
            solid,
            size,
        )?);
        pool.fill().await?;
        let shared = self.pools(|pools| {
            Arc::clone(pools.entry(solid).or_insert_with(|| Arc::clone(&pool)))
        });
        Ok(shared.unwrap_or(pool))
    }

    /// Pops a copy of `solid` for editing and registers its history.
    ///
    /// # Errors
    ///
    /// Returns an error if the pool cannot produce a copy.
    pub async fn copy_for_edit(&self, solid: SolidId) -> Result<SolidCopy> {
        let pool = self.pool(solid, self.creator.config().pool_size).await?;
        let copy = pool.pop().await?;
        self.register(copy.solid, Arc::clone(&copy.history));
        Ok(copy)
    }

    /// One mesh per configured detail level, as `(distance, mesh)` pairs.
    ///
    /// # Errors
    ///
    /// Returns the first failure among the levels.
    pub async fn create_levels(
        &self,
        item: Item,
        note: RenderNote,
        outlines_only: bool,
    ) -> Result<Vec<(f64, Arc<MeshLike>)>> {
        super::levels::create_levels(
            self.creator.clone(),
            Some(Arc::clone(&self.state)),
            item,
            LevelMode::Real,
            note,
            outlines_only,
        )
        .await
    }

    /// One mesh per temporary detail level, cached in this session.
    ///
    /// # Errors
    ///
    /// Returns the first failure among the levels.
    pub async fn create_temporary_levels(
        &self,
        item: Item,
        note: RenderNote,
        outlines_only: bool,
    ) -> Result<Vec<(f64, Arc<MeshLike>)>> {
        super::levels::create_levels(
            self.creator.clone(),
            Some(Arc::clone(&self.state)),
            item,
            LevelMode::Temporary,
            note,
            outlines_only,
        )
        .await
    }

    fn pools<T>(&self, f: impl FnOnce(&mut Pools<K>) -> T) -> Option<T> {
        self.state
            .pools
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_mut()
            .map(f)
    }
}

/// Closes a session when dropped.
pub(crate) struct CloseOnDrop<K: Kernel>(Arc<SessionState<K>>);

impl<K: Kernel> CloseOnDrop<K> {
    pub(crate) fn new(session: &Session<K>) -> Self {
        Self(Arc::clone(session.state()))
    }
}

impl<K: Kernel> Drop for CloseOnDrop<K> {
    fn drop(&mut self) {
        self.0.close();
        debug!("caching session closed");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::error::{MeshCacheError, OperationError};
    use crate::kernel::testing::CountingKernel;
    use crate::operations::modification::MoveFace;

    fn creator() -> (Arc<CountingKernel>, ParallelMeshCreator<CountingKernel>) {
        let kernel = Arc::new(CountingKernel::new());
        let creator = ParallelMeshCreator::new(Arc::clone(&kernel));
        (kernel, creator)
    }

    fn note() -> RenderNote {
        RenderNote::default()
    }

    #[tokio::test]
    async fn repeated_create_hits_the_object_cache() {
        let (kernel, creator) = creator();
        let solid = kernel.unit_box();
        let (first, second) = creator
            .caching(|session| async move {
                let first = session.create(Item::Solid(solid), 0.01, note(), false, None).await?;
                let second = session.create(Item::Solid(solid), 0.01, note(), false, None).await?;
                Ok::<_, MeshCacheError>((first, second))
            })
            .await
            .unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(kernel.face_calls(), 6);
    }

    #[tokio::test]
    async fn flags_do_not_split_the_object_cache() {
        let (kernel, creator) = creator();
        let solid = kernel.unit_box();
        let (plain, outline) = creator
            .caching(|session| async move {
                let plain = session.create(Item::Solid(solid), 0.01, note(), false, None).await?;
                let flags = RenderNote {
                    quad: false,
                    fair: false,
                };
                let outline = session.create(Item::Solid(solid), 0.01, flags, true, None).await?;
                Ok::<_, MeshCacheError>((plain, outline))
            })
            .await
            .unwrap();
        assert!(Arc::ptr_eq(&plain, &outline));
    }

    #[tokio::test]
    async fn other_precision_recomputes() {
        let (kernel, creator) = creator();
        let solid = kernel.unit_box();
        creator
            .caching(|session| async move {
                session.create(Item::Solid(solid), 0.01, note(), false, None).await?;
                session.create(Item::Solid(solid), 0.02, note(), false, None).await?;
                Ok::<_, MeshCacheError>(())
            })
            .await
            .unwrap();
        assert_eq!(kernel.face_calls(), 12);
    }

    #[tokio::test]
    async fn copies_reuse_unchanged_faces() {
        let (kernel, creator) = creator();
        let solid = kernel.unit_box();
        let k = Arc::clone(&kernel);
        creator
            .caching(|session| async move {
                let first = session.copy_for_edit(solid).await?;
                let second = session.copy_for_edit(solid).await?;
                for (copy, distance) in [(&first, 0.1), (&second, 0.15)] {
                    let top = k.face_ids(copy.solid)[1];
                    k.edit(|store| MoveFace::new(copy.solid, top, distance).execute(store))?;
                }

                let mesh1 = session
                    .create(Item::Solid(first.solid), 0.01, note(), false, Some(solid))
                    .await?;
                assert_eq!(k.face_calls(), 6);

                let mesh2 = session
                    .create(Item::Solid(second.solid), 0.01, note(), false, Some(solid))
                    .await?;
                assert_eq!(k.face_calls(), 11);

                let bottom = k.face_ids(solid)[0];
                let cached = session.cached_face(bottom, 0.01).unwrap();
                assert!(Arc::ptr_eq(&mesh1.faces[0].grid, &cached));
                assert!(Arc::ptr_eq(&mesh2.faces[0].grid, &cached));
                assert!(!Arc::ptr_eq(&mesh1.faces[1].grid, &mesh2.faces[1].grid));
                assert_ne!(mesh1.faces[1].grid.position, mesh2.faces[1].grid.position);
                Ok::<_, MeshCacheError>(())
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn face_buffers_follow_the_requested_precision() {
        let (kernel, creator) = creator();
        let sphere = kernel.unit_sphere();
        let basic = creator.basic().clone();
        let k = Arc::clone(&kernel);
        creator
            .caching(|session| async move {
                let copy = session.copy_for_edit(sphere).await?;
                let item = Item::Solid(copy.solid);
                let coarse = session.create(item, 0.05, note(), true, Some(sphere)).await?;
                let fine = session.create(item, 0.001, note(), true, Some(sphere)).await?;
                let expected = basic.create(item, 0.001, note(), true, Some(sphere)).await?;

                assert!(!Arc::ptr_eq(&coarse.faces[0].grid, &fine.faces[0].grid));
                assert!(fine.triangle_count() > coarse.triangle_count());
                assert_eq!(fine.faces[0].grid.position, expected.faces[0].grid.position);
                assert_eq!(fine.faces[0].grid.index, expected.faces[0].grid.index);

                let face = k.face_ids(sphere)[0];
                let cached_fine = session.cached_face(face, 0.001).unwrap();
                assert!(Arc::ptr_eq(&cached_fine, &fine.faces[0].grid));
                assert!(session.cached_face(face, 0.05).is_some());
                Ok::<_, MeshCacheError>(())
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn unregistered_copy_is_not_eligible() {
        let (kernel, creator) = creator();
        let solid = kernel.unit_box();
        let k = Arc::clone(&kernel);
        creator
            .caching(|session| async move {
                let copy = k.copy_solid(solid)?;
                session.create(Item::Solid(copy.solid), 0.01, note(), false, None).await?;
                assert!(session.cached_face(k.face_ids(solid)[0], 0.01).is_none());
                Ok::<_, MeshCacheError>(())
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn mismatched_ancestor_ignores_history() {
        let (kernel, creator) = creator();
        let solid = kernel.unit_box();
        let other = kernel.unit_box();
        let k = Arc::clone(&kernel);
        creator
            .caching(|session| async move {
                let copy = session.copy_for_edit(solid).await?;
                session
                    .create(Item::Solid(copy.solid), 0.01, note(), false, Some(other))
                    .await?;
                assert!(session.cached_face(k.face_ids(solid)[0], 0.01).is_none());
                Ok::<_, MeshCacheError>(())
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn error_in_scope_closes_the_session() {
        let (kernel, creator) = creator();
        let solid = kernel.unit_box();
        let mut escaped = None;
        let result: Result<()> = creator
            .caching(|session| {
                escaped = Some(session.clone());
                async move {
                    session.create(Item::Solid(solid), 0.01, note(), false, None).await?;
                    Err::<(), _>(MeshCacheError::from(OperationError::Failed(
                        "scope failed".into(),
                    )))
                }
            })
            .await;
        assert!(matches!(result, Err(MeshCacheError::Operation(_))));

        let session = escaped.unwrap();
        assert!(!session.is_open());
        let a = session.create(Item::Solid(solid), 0.01, note(), false, None).await.unwrap();
        let b = session.create(Item::Solid(solid), 0.01, note(), false, None).await.unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(kernel.face_calls(), 18);
    }

    #[tokio::test]
    async fn nested_sessions_are_independent() {
        let (kernel, creator) = creator();
        let solid = kernel.unit_box();
        let inner_creator = creator.clone();
        creator
            .caching(|outer| async move {
                let before = outer.create(Item::Solid(solid), 0.01, note(), false, None).await?;
                inner_creator
                    .caching(|inner| async move {
                        inner.create(Item::Solid(solid), 0.01, note(), false, None).await?;
                        Ok::<_, MeshCacheError>(())
                    })
                    .await?;
                assert!(outer.is_open());
                let after = outer.create(Item::Solid(solid), 0.01, note(), false, None).await?;
                assert!(Arc::ptr_eq(&before, &after));
                Ok::<_, MeshCacheError>(())
            })
            .await
            .unwrap();
        assert_eq!(kernel.face_calls(), 12);
    }

    #[tokio::test]
    async fn failed_face_leaves_siblings_cached() {
        let (kernel, creator) = creator();
        let solid = kernel.unit_box();
        let k = Arc::clone(&kernel);
        creator
            .caching(|session| async move {
                let copy = session.copy_for_edit(solid).await?;
                let originals = k.face_ids(solid);
                k.fail_face(k.face_ids(copy.solid)[2]);

                let result = session
                    .create(Item::Solid(copy.solid), 0.01, note(), false, Some(solid))
                    .await;
                assert!(result.is_err());
                for (n, &face) in originals.iter().enumerate() {
                    assert_eq!(session.cached_face(face, 0.01).is_some(), n != 2);
                }
                Ok::<_, MeshCacheError>(())
            })
            .await
            .unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_requests_coalesce() {
        let (kernel, creator) = creator();
        kernel.set_delay(Duration::from_millis(20));
        let solid = kernel.unit_box();
        let (a, b) = creator
            .caching(|session| async move {
                let (a, b) = tokio::join!(
                    session.create(Item::Solid(solid), 0.01, note(), false, None),
                    session.create(Item::Solid(solid), 0.01, note(), false, None),
                );
                Ok::<_, MeshCacheError>((a?, b?))
            })
            .await
            .unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(kernel.face_calls(), 6);
    }

    #[tokio::test]
    async fn existing_pool_keeps_its_target() {
        let (kernel, creator) = creator();
        let solid = kernel.unit_box();
        creator
            .caching(|session| async move {
                let first = session.pool(solid, 2).await?;
                let again = session.pool(solid, 5).await?;
                assert!(Arc::ptr_eq(&first, &again));
                assert_eq!(again.target(), 2);
                assert_eq!(again.len().await, 2);
                Ok::<_, MeshCacheError>(())
            })
            .await
            .unwrap();
        assert_eq!(kernel.copy_calls(), 2);
    }

    #[tokio::test]
    async fn closing_releases_pooled_copies() {
        let (kernel, creator) = creator();
        let solid = kernel.unit_box();
        let creator = ParallelMeshCreator::with_config(
            Arc::clone(creator.kernel()),
            creator.config().clone().with_pool_size(3),
        );
        let copy = creator
            .caching(|session| async move {
                let copy = session.copy_for_edit(solid).await?;
                let again = session.pool(solid, 3).await?;
                assert_eq!(again.len().await, 2);
                Ok::<_, MeshCacheError>(copy)
            })
            .await
            .unwrap();
        let solids = kernel.read(|s| Ok(s.solid_count())).unwrap();
        assert_eq!(solids, 2);
        assert!(kernel.read(|s| Ok(s.solid(copy.solid).is_ok())).unwrap());
    }
}
