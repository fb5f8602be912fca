use crate::error::{OperationError, Result};
use crate::geometry::curve::Curve;
use crate::geometry::surface::Sphere;
use crate::math::{Point3, TOLERANCE};
use crate::topology::{
    EdgeCurve, EdgeData, FaceData, FaceSurface, OrientedEdge, ShellData, SolidData, SolidId,
    TopologyStore, VertexData, WireData,
};

/// Creates a sphere solid made of a single spherical face.
///
/// The face is closed by one seam meridian running from the south to the
/// north pole, traversed once in each direction by the face's wire.
pub struct MakeSphere {
    center: Point3,
    radius: f64,
}

impl MakeSphere {
    /// Creates a new `MakeSphere` operation.
    #[must_use]
    pub fn new(center: Point3, radius: f64) -> Self {
        Self { center, radius }
    }

    /// Executes the operation, creating the sphere in the topology store.
    ///
    /// # Errors
    ///
    /// Returns an error if the radius is near zero.
    pub fn execute(&self, store: &mut TopologyStore) -> Result<SolidId> {
        if self.radius < TOLERANCE {
            return Err(
                OperationError::InvalidInput("sphere radius must be positive".into()).into(),
            );
        }

        let sphere = Sphere::new(self.center, self.radius)?;
        let seam = sphere.seam()?;
        let domain = seam.domain();
        let south = store.add_vertex(VertexData::new(seam.evaluate(domain.t_min)?));
        let north = store.add_vertex(VertexData::new(seam.evaluate(domain.t_max)?));

        let mut seam_edge = EdgeData::new(south, north, EdgeCurve::Arc(seam));
        seam_edge.seam = true;
        let seam_edge = store.add_edge(seam_edge);

        let wire = store.add_wire(WireData {
            edges: vec![
                OrientedEdge::new(seam_edge, true),
                OrientedEdge::new(seam_edge, false),
            ],
            is_closed: true,
        });
        let face = store.add_face(FaceData::new(FaceSurface::Sphere(sphere), wire));
        let shell = store.add_shell(ShellData {
            faces: vec![face],
            is_closed: true,
        });
        Ok(store.add_solid(SolidData {
            outer_shell: shell,
            inner_shells: vec![],
        }))
    }
}
