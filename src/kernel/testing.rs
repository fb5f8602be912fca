//! A kernel wrapper that counts and sabotages calls.
#![allow(clippy::unwrap_used)]

use std::collections::HashSet;
use std::ops::Deref;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::error::{Result, TessellationError};
use crate::math::Point3;
use crate::operations::copy::SolidCopyResult;
use crate::operations::creation::{MakeBox, MakeSphere};
use crate::tessellation::TessellationParams;
use crate::topology::{EdgeId, FaceId, SolidId};

use super::{EdgePolyline, FaceGrid, Item, ItemTopology, Kernel, ReferenceKernel};

#[derive(Debug, Default)]
pub(crate) struct CountingKernel {
    inner: ReferenceKernel,
    face_calls: AtomicUsize,
    edge_calls: AtomicUsize,
    copy_calls: AtomicUsize,
    failing: Mutex<HashSet<FaceId>>,
    delay: Mutex<Option<Duration>>,
    truncate_copies: AtomicBool,
}

impl CountingKernel {
    pub(crate) fn new() -> Self {
        init_tracing();
        Self::default()
    }

    pub(crate) fn unit_box(&self) -> SolidId {
        self.inner
            .edit(|store| MakeBox::new(Point3::origin(), Point3::new(1.0, 1.0, 1.0)).execute(store))
            .unwrap()
    }

    pub(crate) fn unit_sphere(&self) -> SolidId {
        self.inner
            .edit(|store| MakeSphere::new(Point3::origin(), 1.0).execute(store))
            .unwrap()
    }

    pub(crate) fn face_ids(&self, solid: SolidId) -> Vec<FaceId> {
        self.inner
            .item_topology(Item::Solid(solid))
            .unwrap()
            .faces
            .iter()
            .map(|f| f.id)
            .collect()
    }

    pub(crate) fn face_calls(&self) -> usize {
        self.face_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn edge_calls(&self) -> usize {
        self.edge_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn copy_calls(&self) -> usize {
        self.copy_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn fail_face(&self, face: FaceId) {
        self.failing.lock().unwrap().insert(face);
    }

    /// Makes every face tessellation sleep, so overlapping requests can be observed.
    pub(crate) fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    /// Makes every copy report one face fewer than it has.
    pub(crate) fn truncate_copies(&self) {
        self.truncate_copies.store(true, Ordering::SeqCst);
    }
}

/// Routes spans to the test output, filtered by `RUST_LOG`.
pub(crate) fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

impl Deref for CountingKernel {
    type Target = ReferenceKernel;

    fn deref(&self) -> &ReferenceKernel {
        &self.inner
    }
}

impl Kernel for CountingKernel {
    fn item_topology(&self, item: Item) -> Result<ItemTopology> {
        self.inner.item_topology(item)
    }

    fn tessellate_face(&self, face: FaceId, params: &TessellationParams) -> Result<FaceGrid> {
        self.face_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }
        if self.failing.lock().unwrap().contains(&face) {
            return Err(TessellationError::Failed("injected failure".into()).into());
        }
        self.inner.tessellate_face(face, params)
    }

    fn tessellate_edge(
        &self,
        edge: EdgeId,
        params: &TessellationParams,
        outlines_only: bool,
    ) -> Result<EdgePolyline> {
        self.edge_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.tessellate_edge(edge, params, outlines_only)
    }

    fn copy_solid(&self, solid: SolidId) -> Result<SolidCopyResult> {
        self.copy_calls.fetch_add(1, Ordering::SeqCst);
        let mut result = self.inner.copy_solid(solid)?;
        if self.truncate_copies.load(Ordering::SeqCst) {
            result.copy_faces.pop();
        }
        Ok(result)
    }

    fn release_solid(&self, solid: SolidId) -> Result<()> {
        self.inner.release_solid(solid)
    }

    fn enter_parallel_region(&self) {
        self.inner.enter_parallel_region();
    }

    fn exit_parallel_region(&self) {
        self.inner.exit_parallel_region();
    }
}
