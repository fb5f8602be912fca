use std::collections::HashSet;

use crate::error::{OperationError, Result};
use crate::geometry::curve::Line;
use crate::geometry::surface::Plane;
use crate::math::{Point3, TOLERANCE};
use crate::topology::{EdgeCurve, FaceId, FaceSurface, SolidId, TopologyStore, VertexId};

/// Pushes or pulls a planar face of a solid along its normal.
///
/// Every vertex of the face moves by `distance`; edges touching a moved
/// vertex are rebuilt, and every face touching a moved vertex gets its
/// plane refitted and is flagged as modified. Faces that share no vertex
/// with the moved face keep their geometry and their flag.
pub struct MoveFace {
    solid: SolidId,
    face: FaceId,
    distance: f64,
}

impl MoveFace {
    /// Creates a new `MoveFace` operation.
    #[must_use]
    pub fn new(solid: SolidId, face: FaceId, distance: f64) -> Self {
        Self {
            solid,
            face,
            distance,
        }
    }

    /// Executes the move, modifying the solid in place.
    ///
    /// # Errors
    ///
    /// Returns an error if the face is not a planar face of the solid, if an
    /// affected face or edge is curved, or if the move collapses geometry.
    pub fn execute(&self, store: &mut TopologyStore) -> Result<()> {
        let faces = store.solid_faces(self.solid)?;
        if !faces.contains(&self.face) {
            return Err(OperationError::InvalidInput("face does not belong to solid".into()).into());
        }
        let FaceSurface::Plane(plane) = &store.face(self.face)?.surface else {
            return Err(OperationError::InvalidInput("only planar faces can be moved".into()).into());
        };
        let offset = plane.plane_normal() * self.distance;
        if self.distance.abs() < TOLERANCE {
            return Ok(());
        }

        let mut moved: HashSet<VertexId> = HashSet::new();
        for wire in store.face_wires(self.face)? {
            moved.extend(store.wire_vertices(wire)?);
        }
        for &vertex in &moved {
            store.vertex_mut(vertex)?.point += offset;
        }

        for edge in store.solid_edges(self.solid)? {
            let data = store.edge(edge)?;
            if !moved.contains(&data.start) && !moved.contains(&data.end) {
                continue;
            }
            if !matches!(data.curve, EdgeCurve::Line(_)) {
                return Err(OperationError::Failed("cannot move a curved edge".into()).into());
            }
            let line = Line::through(store.vertex(data.start)?.point, store.vertex(data.end)?.point)?;
            store.edge_mut(edge)?.curve = EdgeCurve::Line(line);
        }

        for face in faces {
            let outline = store.wire_vertices(store.face(face)?.outer_wire)?;
            if face != self.face && !outline.iter().any(|v| moved.contains(v)) {
                continue;
            }
            let points = outline
                .iter()
                .map(|&v| store.vertex(v).map(|data| data.point))
                .collect::<std::result::Result<Vec<Point3>, _>>()?;
            let refitted = Plane::from_polygon(&points)?;

            let data = store.face_mut(face)?;
            if !matches!(data.surface, FaceSurface::Plane(_)) {
                return Err(OperationError::Failed("cannot refit a curved face".into()).into());
            }
            data.surface = FaceSurface::Plane(refitted);
            data.modified = true;
        }

        Ok(())
    }
}
