use crate::error::{Result, TopologyError};
use crate::geometry::surface::Plane;
use crate::topology::{FaceData, FaceId, FaceSurface, TopologyStore, WireId};

/// Creates a planar face bounded by closed wires.
///
/// The plane is fitted to the outer wire; its normal follows the wire's
/// counter-clockwise side.
pub struct MakeFace {
    outer_wire: WireId,
    inner_wires: Vec<WireId>,
}

impl MakeFace {
    /// Creates a new `MakeFace` operation.
    #[must_use]
    pub fn new(outer_wire: WireId, inner_wires: Vec<WireId>) -> Self {
        Self {
            outer_wire,
            inner_wires,
        }
    }

    /// Executes the operation, creating the face in the topology store.
    ///
    /// # Errors
    ///
    /// Returns an error if a wire is open or the outer wire has no area.
    pub fn execute(&self, store: &mut TopologyStore) -> Result<FaceId> {
        for &wire in std::iter::once(&self.outer_wire).chain(&self.inner_wires) {
            if !store.wire(wire)?.is_closed {
                return Err(TopologyError::WireNotClosed.into());
            }
        }

        let points = store
            .wire_vertices(self.outer_wire)?
            .into_iter()
            .map(|v| store.vertex(v).map(|data| data.point))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let plane = Plane::from_polygon(&points)?;

        let mut face = FaceData::new(FaceSurface::Plane(plane), self.outer_wire);
        face.inner_wires.clone_from(&self.inner_wires);
        Ok(store.add_face(face))
    }
}
