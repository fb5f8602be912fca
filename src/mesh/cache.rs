use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;

use crate::copier::HistoryMap;
use crate::error::{KernelError, Result};
use crate::kernel::FaceGrid;
use crate::topology::{FaceId, SolidId};

use super::MeshLike;

/// Object cache key: precision bits and solid identity. Render flags are
/// not part of the key.
pub(crate) type ObjectKey = (u64, SolidId);

/// Face cache key: precision bits and ancestor face identity.
pub(crate) type FaceKey = (u64, FaceId);

type Outcome = Option<Result<Arc<MeshLike>>>;

enum ObjectEntry {
    Pending(watch::Receiver<Outcome>),
    Resolved(Arc<MeshLike>),
}

#[derive(Default)]
struct CacheMaps {
    faces: HashMap<FaceKey, Arc<FaceGrid>>,
    objects: HashMap<ObjectKey, ObjectEntry>,
    histories: HashMap<SolidId, Arc<HistoryMap>>,
}

/// The three maps of one caching session. `None` once the session closed.
pub(crate) struct MeshCache {
    maps: Mutex<Option<CacheMaps>>,
}

/// What a request for an object found in the cache.
pub(crate) enum Claim<'a> {
    /// A finished mesh.
    Hit(Arc<MeshLike>),
    /// Another request is computing this object.
    Wait(Waiter),
    /// Nothing yet; the caller computes and must finish the guard.
    Lead(Leader<'a>),
}

impl MeshCache {
    pub(crate) fn open() -> Self {
        Self {
            maps: Mutex::new(Some(CacheMaps::default())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<CacheMaps>> {
        self.maps.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn close(&self) {
        self.lock().take();
    }

    pub(crate) fn is_open(&self) -> bool {
        self.lock().is_some()
    }

    pub(crate) fn register(&self, solid: SolidId, history: Arc<HistoryMap>) {
        if let Some(maps) = self.lock().as_mut() {
            maps.histories.insert(solid, history);
        }
    }

    pub(crate) fn history(&self, solid: SolidId) -> Option<Arc<HistoryMap>> {
        self.lock().as_ref()?.histories.get(&solid).cloned()
    }

    pub(crate) fn face(&self, key: FaceKey) -> Option<Arc<FaceGrid>> {
        self.lock().as_ref()?.faces.get(&key).cloned()
    }

    pub(crate) fn store_face(&self, key: FaceKey, grid: Arc<FaceGrid>) {
        if let Some(maps) = self.lock().as_mut() {
            maps.faces.insert(key, grid);
        }
    }

    /// Looks up an object, claiming it when absent. Returns `None` when the
    /// session is closed.
    ///
    /// The pending entry is inserted under the same lock as the lookup, so
    /// concurrent callers for one key always find exactly one leader.
    pub(crate) fn claim(&self, key: ObjectKey) -> Option<Claim<'_>> {
        let mut guard = self.lock();
        let maps = guard.as_mut()?;
        let claim = match maps.objects.get(&key) {
            Some(ObjectEntry::Resolved(mesh)) => Claim::Hit(Arc::clone(mesh)),
            Some(ObjectEntry::Pending(rx)) => Claim::Wait(Waiter(rx.clone())),
            None => {
                let (tx, rx) = watch::channel(None);
                maps.objects.insert(key, ObjectEntry::Pending(rx));
                Claim::Lead(Leader {
                    cache: self,
                    key,
                    tx: Some(tx),
                })
            }
        };
        Some(claim)
    }
}

/// A request coalesced onto another one's computation.
pub(crate) struct Waiter(watch::Receiver<Outcome>);

impl Waiter {
    /// Waits for the leader's outcome.
    ///
    /// # Errors
    ///
    /// Returns the leader's error, or [`KernelError::Abandoned`] if the
    /// leader went away without finishing.
    pub(crate) async fn wait(mut self) -> Result<Arc<MeshLike>> {
        loop {
            let published = self.0.borrow_and_update().clone();
            if let Some(outcome) = published {
                return outcome;
            }
            self.0
                .changed()
                .await
                .map_err(|_| KernelError::Abandoned)?;
        }
    }
}

/// Obligation to publish the outcome of a claimed object.
///
/// Dropping an unfinished leader removes its pending entry and wakes the
/// waiters with [`KernelError::Abandoned`].
pub(crate) struct Leader<'a> {
    cache: &'a MeshCache,
    key: ObjectKey,
    tx: Option<watch::Sender<Outcome>>,
}

impl Leader<'_> {
    /// Publishes `outcome` to every waiter. Successful meshes stay cached;
    /// failures are forgotten so a later request recomputes.
    pub(crate) fn finish(mut self, outcome: &Result<Arc<MeshLike>>) {
        if let Some(maps) = self.cache.lock().as_mut() {
            match outcome {
                Ok(mesh) => {
                    maps.objects
                        .insert(self.key, ObjectEntry::Resolved(Arc::clone(mesh)));
                }
                Err(_) => {
                    maps.objects.remove(&self.key);
                }
            }
        }
        if let Some(tx) = self.tx.take() {
            tx.send_replace(Some(outcome.clone()));
        }
    }
}

impl Drop for Leader<'_> {
    fn drop(&mut self) {
        if self.tx.is_some() {
            if let Some(maps) = self.cache.lock().as_mut() {
                maps.objects.remove(&self.key);
            }
        }
    }
}
