use std::collections::HashMap;

use crate::error::{OperationError, Result};
use crate::geometry::curve::Line;
use crate::geometry::surface::Plane;
use crate::math::{Point3, TOLERANCE};
use crate::topology::{
    EdgeCurve, EdgeData, EdgeId, FaceData, FaceSurface, OrientedEdge, ShellData, SolidData,
    SolidId, TopologyStore, VertexData, VertexId, WireData,
};

/// Corner indices of each box face, counter-clockwise seen from outside.
///
/// Order: bottom, top, front, right, back, left.
const FACE_CORNERS: [[usize; 4]; 6] = [
    [0, 3, 2, 1],
    [4, 5, 6, 7],
    [0, 1, 5, 4],
    [1, 2, 6, 5],
    [2, 3, 7, 6],
    [3, 0, 4, 7],
];

/// Creates an axis-aligned box solid from two corner points.
///
/// The result has 6 planar faces with outward normals, sharing 12 line edges.
pub struct MakeBox {
    min_corner: Point3,
    max_corner: Point3,
}

impl MakeBox {
    /// Creates a new `MakeBox` operation.
    #[must_use]
    pub fn new(min_corner: Point3, max_corner: Point3) -> Self {
        Self {
            min_corner,
            max_corner,
        }
    }

    /// Executes the operation, creating the box in the topology store.
    ///
    /// # Errors
    ///
    /// Returns an error if the box is flat along any axis.
    pub fn execute(&self, store: &mut TopologyStore) -> Result<SolidId> {
        let (lo, hi) = (self.min_corner, self.max_corner);
        if (0..3).any(|axis| hi[axis] - lo[axis] < TOLERANCE) {
            return Err(OperationError::InvalidInput(
                "box extent must be positive along every axis".into(),
            )
            .into());
        }

        let corners = [
            Point3::new(lo.x, lo.y, lo.z),
            Point3::new(hi.x, lo.y, lo.z),
            Point3::new(hi.x, hi.y, lo.z),
            Point3::new(lo.x, hi.y, lo.z),
            Point3::new(lo.x, lo.y, hi.z),
            Point3::new(hi.x, lo.y, hi.z),
            Point3::new(hi.x, hi.y, hi.z),
            Point3::new(lo.x, hi.y, hi.z),
        ];
        let vertices: Vec<VertexId> = corners
            .iter()
            .map(|p| store.add_vertex(VertexData::new(*p)))
            .collect();

        let mut edges: HashMap<(usize, usize), EdgeId> = HashMap::new();
        let mut faces = Vec::with_capacity(FACE_CORNERS.len());

        for quad in &FACE_CORNERS {
            let mut wire_edges = Vec::with_capacity(4);
            for k in 0..4 {
                let (a, b) = (quad[k], quad[(k + 1) % 4]);
                let oriented = if let Some(&edge) = edges.get(&(b, a)) {
                    OrientedEdge::new(edge, false)
                } else {
                    let line = Line::through(corners[a], corners[b])?;
                    let edge = store.add_edge(EdgeData::new(
                        vertices[a],
                        vertices[b],
                        EdgeCurve::Line(line),
                    ));
                    edges.insert((a, b), edge);
                    OrientedEdge::new(edge, true)
                };
                wire_edges.push(oriented);
            }

            let wire = store.add_wire(WireData {
                edges: wire_edges,
                is_closed: true,
            });
            let outline: Vec<Point3> = quad.iter().map(|&i| corners[i]).collect();
            let plane = Plane::from_polygon(&outline)?;
            faces.push(store.add_face(FaceData::new(FaceSurface::Plane(plane), wire)));
        }

        let shell = store.add_shell(ShellData {
            faces,
            is_closed: true,
        });
        Ok(store.add_solid(SolidData {
            outer_shell: shell,
            inner_shells: vec![],
        }))
    }
}
