use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, instrument, warn};

use crate::error::{MeshCacheError, PoolError, Result};
use crate::kernel::Kernel;
use crate::topology::SolidId;

use super::HistoryMap;

/// A pre-cloned solid together with its face history.
///
/// Register `history` with a caching session before meshing `solid` to
/// reuse the buffers of its unchanged faces.
#[derive(Debug, Clone)]
pub struct SolidCopy {
    pub solid: SolidId,
    pub history: Arc<HistoryMap>,
}

/// A replenishing supply of copies of one source solid.
///
/// Copies still in the pool when it is dropped are released back to the
/// kernel.
pub struct CopyPool<K: Kernel> {
    kernel: Arc<K>,
    source: SolidId,
    target: usize,
    copies: Mutex<VecDeque<SolidCopy>>,
}

impl<K: Kernel> CopyPool<K> {
    /// Creates an empty pool that keeps about `target` copies of `source`.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::EmptyTarget`] if `target` is zero.
    pub fn new(kernel: Arc<K>, source: SolidId, target: usize) -> Result<Self> {
        if target == 0 {
            return Err(PoolError::EmptyTarget.into());
        }
        Ok(Self {
            kernel,
            source,
            target,
            copies: Mutex::new(VecDeque::with_capacity(target)),
        })
    }

    #[must_use]
    pub fn source(&self) -> SolidId {
        self.source
    }

    #[must_use]
    pub fn target(&self) -> usize {
        self.target
    }

    /// Number of copies ready to be popped.
    pub async fn len(&self) -> usize {
        self.copies.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.copies.lock().await.is_empty()
    }

    /// Clones until the pool holds its target count.
    ///
    /// # Errors
    ///
    /// Returns the first clone failure. Copies that succeeded are kept.
    #[instrument(skip(self), fields(source = ?self.source))]
    pub async fn fill(&self) -> Result<()> {
        let mut copies = self.copies.lock().await;
        self.replenish(&mut copies).await
    }

    /// Takes a copy out of the pool.
    ///
    /// An empty pool clones on demand. When fewer than half the target
    /// remain afterwards, the pool is refilled before returning.
    ///
    /// # Errors
    ///
    /// Returns an error if cloning fails. A copy taken before a failed
    /// refill is put back.
    #[instrument(skip(self), fields(source = ?self.source))]
    pub async fn pop(&self) -> Result<SolidCopy> {
        let mut copies = self.copies.lock().await;
        let copy = if let Some(copy) = copies.pop_front() {
            copy
        } else {
            debug!("copy pool empty, cloning on demand");
            clone_solid(Arc::clone(&self.kernel), self.source).await?
        };

        if copies.len() * 2 < self.target {
            if let Err(err) = self.replenish(&mut copies).await {
                copies.push_front(copy);
                return Err(err);
            }
        }
        Ok(copy)
    }

    async fn replenish(&self, copies: &mut VecDeque<SolidCopy>) -> Result<()> {
        let missing = self.target.saturating_sub(copies.len());
        if missing == 0 {
            return Ok(());
        }
        debug!(remaining = copies.len(), missing, "replenishing copy pool");

        let mut set = JoinSet::new();
        for _ in 0..missing {
            set.spawn(clone_solid(Arc::clone(&self.kernel), self.source));
        }
        let mut first_err = None;
        while let Some(joined) = set.join_next().await {
            match joined.map_err(MeshCacheError::from).and_then(|r| r) {
                Ok(copy) => copies.push_back(copy),
                Err(err) => {
                    warn!(error = %err, "failed to clone solid for pool");
                    first_err.get_or_insert(err);
                }
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}

impl<K: Kernel> Drop for CopyPool<K> {
    fn drop(&mut self) {
        for copy in self.copies.get_mut().drain(..) {
            if let Err(err) = self.kernel.release_solid(copy.solid) {
                warn!(solid = ?copy.solid, error = %err, "failed to release pooled copy");
            }
        }
    }
}

/// Clones `source`. A clone whose history cannot be built is released.
async fn clone_solid<K: Kernel>(kernel: Arc<K>, source: SolidId) -> Result<SolidCopy> {
    let copier = Arc::clone(&kernel);
    let result = tokio::task::spawn_blocking(move || copier.copy_solid(source)).await??;
    match HistoryMap::from_copy(source, &result) {
        Ok(history) => Ok(SolidCopy {
            solid: result.solid,
            history: Arc::new(history),
        }),
        Err(err) => {
            if let Err(release) = kernel.release_solid(result.solid) {
                warn!(solid = ?result.solid, error = %release, "failed to release unusable copy");
            }
            Err(err)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::kernel::testing::CountingKernel;

    fn box_pool(target: usize) -> (Arc<CountingKernel>, CopyPool<CountingKernel>) {
        let kernel = Arc::new(CountingKernel::new());
        let solid = kernel.unit_box();
        let pool = CopyPool::new(Arc::clone(&kernel), solid, target).unwrap();
        (kernel, pool)
    }

    #[tokio::test]
    async fn zero_target_is_rejected() {
        let kernel = Arc::new(CountingKernel::new());
        let solid = kernel.unit_box();
        assert!(CopyPool::new(kernel, solid, 0).is_err());
    }

    #[tokio::test]
    async fn replenishes_before_running_dry() {
        let (kernel, pool) = box_pool(4);
        pool.fill().await.unwrap();
        assert_eq!(pool.len().await, 4);

        let mut seen = Vec::new();
        for _ in 0..3 {
            let copy = pool.pop().await.unwrap();
            assert!(pool.len().await > 0);
            seen.push(copy.solid);
        }
        assert_eq!(pool.len().await, 4);
        assert_eq!(kernel.copy_calls(), 7);
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), 3);
    }

    #[tokio::test]
    async fn empty_pool_clones_on_demand() {
        let (kernel, pool) = box_pool(2);
        let copy = pool.pop().await.unwrap();
        assert_eq!(copy.history.ancestor(), pool.source());
        assert_eq!(copy.history.len(), 6);
        assert_eq!(pool.len().await, 2);
        assert_eq!(kernel.copy_calls(), 3);
    }

    #[tokio::test]
    async fn dropping_the_pool_releases_copies() {
        let (kernel, pool) = box_pool(3);
        pool.fill().await.unwrap();
        assert_eq!(kernel.read(|s| Ok(s.solid_count())).unwrap(), 4);
        let kept = pool.pop().await.unwrap();
        drop(pool);
        assert_eq!(kernel.read(|s| Ok(s.solid_count())).unwrap(), 2);
        assert!(kernel.read(|s| Ok(s.solid(kept.solid).is_ok())).unwrap());
    }

    #[tokio::test]
    async fn clone_failure_fails_pop() {
        let (kernel, pool) = box_pool(2);
        kernel
            .release_solid(pool.source())
            .unwrap();
        assert!(pool.pop().await.is_err());
        assert!(pool.is_empty().await);
    }

    #[tokio::test]
    async fn unusable_copies_are_released() {
        let (kernel, pool) = box_pool(2);
        kernel.truncate_copies();
        let err = pool.pop().await.unwrap_err();
        assert!(matches!(
            err,
            MeshCacheError::Pool(PoolError::CorrespondenceMismatch { .. })
        ));
        assert_eq!(kernel.copy_calls(), 1);
        assert_eq!(kernel.read(|s| Ok(s.solid_count())).unwrap(), 1);
    }
}
