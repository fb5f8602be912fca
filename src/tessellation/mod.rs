mod tessellate_curve;
mod tessellate_face;

pub use tessellate_curve::TessellateCurve;
pub use tessellate_face::TessellateFace;

use crate::error::{Result, TessellationError};
use crate::math::{Point3, Vector3};

/// Precision and rendering parameters for tessellation.
///
/// `tolerance` is the precision value: the largest allowed distance between
/// the true geometry and its polygonal approximation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TessellationParams {
    /// Maximum allowed deviation from the true geometry.
    pub tolerance: f64,
    /// Minimum number of segments per curved direction.
    pub min_segments: usize,
    /// Maximum number of segments per curved direction.
    pub max_segments: usize,
    /// Split grid cells along one consistent diagonal (quad-friendly output).
    pub quad: bool,
    /// Request faired grids. Reserved for kernels that smooth their grids;
    /// the reference tessellator does not alter its output for it.
    pub fair: bool,
}

impl Default for TessellationParams {
    fn default() -> Self {
        Self {
            tolerance: 0.01,
            min_segments: 4,
            max_segments: 256,
            quad: true,
            fair: true,
        }
    }
}

impl TessellationParams {
    /// Default parameters at the given precision.
    #[must_use]
    pub fn with_tolerance(tolerance: f64) -> Self {
        Self {
            tolerance,
            ..Self::default()
        }
    }

    /// Checks that the parameters describe a usable tessellation.
    ///
    /// # Errors
    ///
    /// Returns an error if the tolerance is not a positive finite number or
    /// the segment bounds are inverted or zero.
    pub fn validate(&self) -> Result<()> {
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(TessellationError::InvalidParameters(format!(
                "tolerance must be positive, got {}",
                self.tolerance
            ))
            .into());
        }
        if self.min_segments == 0 || self.min_segments > self.max_segments {
            return Err(TessellationError::InvalidParameters(format!(
                "segment bounds [{}, {}] are invalid",
                self.min_segments, self.max_segments
            ))
            .into());
        }
        Ok(())
    }
}

/// A polyline approximation of a curve.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Polyline {
    /// The ordered vertices of the polyline.
    pub points: Vec<Point3>,
}

/// A triangle mesh approximation of a surface.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TriangleMesh {
    /// Vertex positions.
    pub vertices: Vec<Point3>,
    /// Vertex normals, one per vertex.
    pub normals: Vec<Vector3>,
    /// Triangle indices (each triple defines a counter-clockwise triangle).
    pub indices: Vec<[u32; 3]>,
}
