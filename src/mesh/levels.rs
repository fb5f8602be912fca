use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, instrument};

use crate::config::LevelMode;
use crate::error::{MeshCacheError, Result};
use crate::kernel::{Item, Kernel};

use super::session::SessionState;
use super::{MeshLike, ParallelMeshCreator, RenderNote};

impl<K: Kernel> ParallelMeshCreator<K> {
    /// One uncached mesh per configured detail level, as `(distance, mesh)`
    /// pairs in configuration order.
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
        create_levels(self.clone(), None, item, LevelMode::Real, note, outlines_only).await
    }

    /// Like [`create_levels`](Self::create_levels), with solids meshed at
    /// the temporary levels.
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
        create_levels(self.clone(), None, item, LevelMode::Temporary, note, outlines_only).await
    }
}

/// Meshes every level of `item` concurrently, picking the levels by item
/// kind and `mode`.
#[instrument(skip(creator, state, note))]
pub(crate) async fn create_levels<K: Kernel>(
    creator: ParallelMeshCreator<K>,
    state: Option<Arc<SessionState<K>>>,
    item: Item,
    mode: LevelMode,
    note: RenderNote,
    outlines_only: bool,
) -> Result<Vec<(f64, Arc<MeshLike>)>> {
    let levels = creator
        .config()
        .levels_for(item.as_solid().is_some(), mode)
        .to_vec();
    debug!(levels = levels.len(), "meshing detail levels");

    let mut tasks = JoinSet::new();
    for (n, level) in levels.into_iter().enumerate() {
        let creator = creator.clone();
        let state = state.clone();
        tasks.spawn(async move {
            let cache = state.as_deref().map(|s| &s.cache);
            let mesh = creator
                .create_in(cache, item, level.precision, note, outlines_only, None)
                .await?;
            Ok::<_, MeshCacheError>((n, level.distance, mesh))
        });
    }

    let mut meshes = Vec::with_capacity(tasks.len());
    let mut first_err = None;
    while let Some(joined) = tasks.join_next().await {
        match joined.map_err(MeshCacheError::from).and_then(|done| done) {
            Ok(level) => meshes.push(level),
            Err(err) => {
                first_err.get_or_insert(err);
            }
        }
    }
    if let Some(err) = first_err {
        return Err(err);
    }
    meshes.sort_by_key(|(n, _, _)| *n);
    Ok(meshes
        .into_iter()
        .map(|(_, distance, mesh)| (distance, mesh))
        .collect())
}
