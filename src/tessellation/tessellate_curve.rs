use crate::error::Result;
use crate::topology::{EdgeCurve, EdgeId, TopologyStore};

use super::{Polyline, TessellationParams};

/// Tessellates an edge into a polyline.
pub struct TessellateCurve {
    edge: EdgeId,
    params: TessellationParams,
}

impl TessellateCurve {
    /// Creates a new `TessellateCurve` operation.
    #[must_use]
    pub fn new(edge: EdgeId, params: TessellationParams) -> Self {
        Self { edge, params }
    }

    /// Executes the tessellation, returning a polyline from the edge's start
    /// vertex to its end vertex.
    ///
    /// # Errors
    ///
    /// Returns an error if the edge is missing, the parameters are invalid,
    /// or the curve cannot be evaluated.
    pub fn execute(&self, store: &TopologyStore) -> Result<Polyline> {
        self.params.validate()?;
        let edge = store.edge(self.edge)?;
        let domain = edge.curve.domain();

        let segments = match &edge.curve {
            EdgeCurve::Line(_) => 1,
            EdgeCurve::Arc(arc) => arc.chord_count(
                self.params.tolerance,
                self.params.min_segments,
                self.params.max_segments,
            ),
        };

        let curve = edge.curve.as_curve();
        let mut points = Vec::with_capacity(segments + 1);
        for i in 0..=segments {
            #[allow(clippy::cast_precision_loss)]
            let frac = i as f64 / segments as f64;
            points.push(curve.evaluate(domain.t_min + frac * (domain.t_max - domain.t_min))?);
        }
        Ok(Polyline { points })
    }
}
