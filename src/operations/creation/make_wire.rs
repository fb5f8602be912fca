use crate::error::{OperationError, Result};
use crate::geometry::curve::Line;
use crate::math::Point3;
use crate::topology::{EdgeCurve, EdgeData, OrientedEdge, TopologyStore, WireData, WireId};

/// Creates a polyline wire from a sequence of 3D points.
///
/// Consecutive points become line edges; a closed wire adds a final edge
/// back to the first point.
pub struct MakeWire {
    points: Vec<Point3>,
    close: bool,
}

impl MakeWire {
    /// Creates a new `MakeWire` operation.
    #[must_use]
    pub fn new(points: Vec<Point3>, close: bool) -> Self {
        Self { points, close }
    }

    /// Executes the operation, creating the wire in the topology store.
    ///
    /// # Errors
    ///
    /// Returns an error if there are too few points or two consecutive
    /// points coincide.
    pub fn execute(&self, store: &mut TopologyStore) -> Result<WireId> {
        let needed = if self.close { 3 } else { 2 };
        if self.points.len() < needed {
            return Err(OperationError::InvalidInput(format!(
                "wire needs at least {needed} points, got {}",
                self.points.len()
            ))
            .into());
        }

        let vertices: Vec<_> = self
            .points
            .iter()
            .map(|p| store.add_vertex(crate::topology::VertexData::new(*p)))
            .collect();

        let segment_count = if self.close {
            vertices.len()
        } else {
            vertices.len() - 1
        };

        let mut edges = Vec::with_capacity(segment_count);
        for i in 0..segment_count {
            let j = (i + 1) % vertices.len();
            let line = Line::through(self.points[i], self.points[j])?;
            let edge = store.add_edge(EdgeData::new(vertices[i], vertices[j], EdgeCurve::Line(line)));
            edges.push(OrientedEdge::new(edge, true));
        }

        Ok(store.add_wire(WireData {
            edges,
            is_closed: self.close,
        }))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn p(x: f64, y: f64) -> Point3 {
        Point3::new(x, y, 0.0)
    }

    #[test]
    fn open_wire_has_one_edge_per_segment() {
        let mut store = TopologyStore::new();
        let wire = MakeWire::new(vec![p(0.0, 0.0), p(1.0, 0.0), p(1.0, 1.0)], false)
            .execute(&mut store)
            .unwrap();
        let data = store.wire(wire).unwrap();
        assert_eq!(data.edges.len(), 2);
        assert!(!data.is_closed);
    }

    #[test]
    fn closed_wire_returns_to_start() {
        let mut store = TopologyStore::new();
        let wire = MakeWire::new(vec![p(0.0, 0.0), p(1.0, 0.0), p(1.0, 1.0)], true)
            .execute(&mut store)
            .unwrap();
        let data = store.wire(wire).unwrap();
        assert_eq!(data.edges.len(), 3);
        let last = store.edge(data.edges[2].edge).unwrap();
        let first = store.edge(data.edges[0].edge).unwrap();
        assert_eq!(last.end, first.start);
    }

    #[test]
    fn duplicate_point_fails() {
        let mut store = TopologyStore::new();
        let result = MakeWire::new(vec![p(0.0, 0.0), p(0.0, 0.0)], false).execute(&mut store);
        assert!(result.is_err());
    }

    #[test]
    fn closed_wire_needs_three_points() {
        let mut store = TopologyStore::new();
        let result = MakeWire::new(vec![p(0.0, 0.0), p(1.0, 0.0)], true).execute(&mut store);
        assert!(result.is_err());
    }
}
