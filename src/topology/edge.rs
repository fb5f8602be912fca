use crate::geometry::curve::{Arc, Curve, CurveDomain, Line};

use super::vertex::VertexId;

slotmap::new_key_type! {
    /// Persistent identity of an edge in the topology store.
    pub struct EdgeId;
}

/// The geometric curve associated with an edge.
#[derive(Debug, Clone)]
pub enum EdgeCurve {
    /// A straight segment.
    Line(Line),
    /// A circular arc.
    Arc(Arc),
}

impl EdgeCurve {
    /// Returns the curve behind this edge as a trait object.
    #[must_use]
    pub fn as_curve(&self) -> &dyn Curve {
        match self {
            Self::Line(line) => line,
            Self::Arc(arc) => arc,
        }
    }

    /// Parameter range covered by the edge.
    #[must_use]
    pub fn domain(&self) -> CurveDomain {
        self.as_curve().domain()
    }
}

/// Data associated with a topological edge.
#[derive(Debug, Clone)]
pub struct EdgeData {
    /// Start vertex of the edge.
    pub start: VertexId,
    /// End vertex of the edge.
    pub end: VertexId,
    /// The geometric curve defining this edge's shape.
    pub curve: EdgeCurve,
    /// Seam edges close a periodic face onto itself and are not outlines.
    pub seam: bool,
    /// Display style tag.
    pub style: u32,
}

impl EdgeData {
    /// Creates a non-seam edge with the default style.
    #[must_use]
    pub fn new(start: VertexId, end: VertexId, curve: EdgeCurve) -> Self {
        Self {
            start,
            end,
            curve,
            seam: false,
            style: 0,
        }
    }
}
