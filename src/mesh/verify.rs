use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::Result;
use crate::kernel::{Item, Kernel};
use crate::topology::SolidId;

use super::{MeshLike, ParallelMeshCreator, RenderNote};

/// A difference between two meshes of the same item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MeshMismatch {
    FaceCount { expected: usize, actual: usize },
    EdgeCount { expected: usize, actual: usize },
    /// Face buffers at the same position differ in identity or content.
    Face { i: usize },
    Edge { i: usize },
}

impl fmt::Display for MeshMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FaceCount { expected, actual } => {
                write!(f, "face count {actual}, expected {expected}")
            }
            Self::EdgeCount { expected, actual } => {
                write!(f, "edge count {actual}, expected {expected}")
            }
            Self::Face { i } => write!(f, "face {i} differs"),
            Self::Edge { i } => write!(f, "edge {i} differs"),
        }
    }
}

/// Lists every difference between `expected` and `actual`.
#[must_use]
pub fn compare_meshes(expected: &MeshLike, actual: &MeshLike) -> Vec<MeshMismatch> {
    let mut mismatches = Vec::new();
    if expected.faces.len() != actual.faces.len() {
        mismatches.push(MeshMismatch::FaceCount {
            expected: expected.faces.len(),
            actual: actual.faces.len(),
        });
    }
    if expected.edges.len() != actual.edges.len() {
        mismatches.push(MeshMismatch::EdgeCount {
            expected: expected.edges.len(),
            actual: actual.edges.len(),
        });
    }
    for (e, a) in expected.faces.iter().zip(&actual.faces) {
        if e.i != a.i || e.face != a.face || e.grid != a.grid {
            mismatches.push(MeshMismatch::Face { i: e.i });
        }
    }
    for (e, a) in expected.edges.iter().zip(&actual.edges) {
        if e.i != a.i || e.edge != a.edge || e.polyline != a.polyline {
            mismatches.push(MeshMismatch::Edge { i: e.i });
        }
    }
    mismatches
}

/// Outcome of one verified mesh creation.
#[derive(Debug, Clone)]
pub struct VerificationReport {
    /// The parallel creator's mesh.
    pub mesh: Arc<MeshLike>,
    pub mismatches: Vec<MeshMismatch>,
    pub basic_time: Duration,
    pub parallel_time: Duration,
}

/// Runs the basic and the parallel creator side by side and reports where
/// they disagree.
pub struct VerifyingMeshCreator<K: Kernel> {
    parallel: ParallelMeshCreator<K>,
}

impl<K: Kernel> VerifyingMeshCreator<K> {
    #[must_use]
    pub fn new(parallel: ParallelMeshCreator<K>) -> Self {
        Self { parallel }
    }

    /// Meshes `item` with both creators, logging any mismatch, and returns
    /// the parallel result.
    ///
    /// # Errors
    ///
    /// Returns the first creator failure.
    pub async fn create(
        &self,
        item: Item,
        precision: f64,
        note: RenderNote,
        outlines_only: bool,
        ancestor: Option<SolidId>,
    ) -> Result<Arc<MeshLike>> {
        Ok(self
            .verify(item, precision, note, outlines_only, ancestor)
            .await?
            .mesh)
    }

    /// Like [`VerifyingMeshCreator::create`], returning the full report.
    ///
    /// # Errors
    ///
    /// Returns the first creator failure.
    pub async fn verify(
        &self,
        item: Item,
        precision: f64,
        note: RenderNote,
        outlines_only: bool,
        ancestor: Option<SolidId>,
    ) -> Result<VerificationReport> {
        let start = Instant::now();
        let basic = self
            .parallel
            .basic()
            .create(item, precision, note, outlines_only, ancestor)
            .await?;
        let basic_time = start.elapsed();

        let start = Instant::now();
        let mesh = self
            .parallel
            .create(item, precision, note, outlines_only, ancestor)
            .await?;
        let parallel_time = start.elapsed();

        debug!(?item, ?basic_time, ?parallel_time, "verified mesh creation");
        let mismatches = compare_meshes(&basic, &mesh);
        for mismatch in &mismatches {
            warn!(?item, %mismatch, "parallel mesh differs from basic mesh");
        }
        Ok(VerificationReport {
            mesh,
            mismatches,
            basic_time,
            parallel_time,
        })
    }
}
