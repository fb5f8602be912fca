use std::collections::{HashMap, HashSet, VecDeque};
use std::f64::consts::{PI, TAU};

use spade::handles::{FixedFaceHandle, InnerTag};
use spade::{
    ConstrainedDelaunayTriangulation, InsertionError, Point2 as SpadePoint2, Triangulation,
};

use crate::error::{Result, TessellationError};
use crate::geometry::surface::{Plane, Sphere, Surface};
use crate::math::Point3;
use crate::topology::{FaceId, FaceSurface, TopologyStore, WireId};

use super::{TessellateCurve, TessellationParams, TriangleMesh};

/// Tessellates a face into a triangle mesh.
///
/// Planar faces are triangulated with a constrained Delaunay triangulation of
/// their boundary loops. Spherical faces are sampled on a regular `(u, v)`
/// grid whose density follows the precision value.
pub struct TessellateFace {
    face: FaceId,
    params: TessellationParams,
}

impl TessellateFace {
    /// Creates a new `TessellateFace` operation.
    #[must_use]
    pub fn new(face: FaceId, params: TessellationParams) -> Self {
        Self { face, params }
    }

    /// Executes the tessellation, returning a triangle mesh.
    ///
    /// # Errors
    ///
    /// Returns an error if the face is missing, the parameters are invalid,
    /// or the boundary cannot be triangulated.
    pub fn execute(&self, store: &TopologyStore) -> Result<TriangleMesh> {
        self.params.validate()?;
        let face = store.face(self.face)?;
        match &face.surface {
            FaceSurface::Plane(plane) => {
                let wires = store.face_wires(self.face)?;
                tessellate_plane(store, plane, &wires, &self.params)
            }
            FaceSurface::Sphere(sphere) => {
                ensure_seam_bounded(store, face.outer_wire)?;
                if !face.inner_wires.is_empty() {
                    return Err(TessellationError::Failed(
                        "spherical faces with holes are not supported".into(),
                    )
                    .into());
                }
                tessellate_sphere(sphere, &self.params)
            }
        }
    }
}

/// Points of a wire in traversal order, without repeating the closing point.
fn wire_loop(
    store: &TopologyStore,
    wire: WireId,
    params: &TessellationParams,
) -> Result<Vec<Point3>> {
    let mut points = Vec::new();
    for oe in &store.wire(wire)?.edges {
        let mut poly = TessellateCurve::new(oe.edge, *params).execute(store)?.points;
        if !oe.forward {
            poly.reverse();
        }
        poly.pop();
        points.extend(poly);
    }
    Ok(points)
}

fn tessellate_plane(
    store: &TopologyStore,
    plane: &Plane,
    wires: &[WireId],
    params: &TessellationParams,
) -> Result<TriangleMesh> {
    let mut cdt = ConstrainedDelaunayTriangulation::<SpadePoint2<f64>>::new();
    for &wire in wires {
        let loop_2d: Vec<_> = wire_loop(store, wire, params)?
            .iter()
            .map(|p| {
                let uv = plane.project(p);
                SpadePoint2::new(uv.x, uv.y)
            })
            .collect();
        insert_constraint_loop(&mut cdt, &loop_2d)?;
    }

    let interior = classify_interior_faces(&cdt);
    let normal = *plane.plane_normal();

    let mut mesh = TriangleMesh::default();
    let mut vertex_map: HashMap<usize, u32> = HashMap::new();
    for face_handle in cdt.inner_faces() {
        if !interior.contains(&face_handle.fix().index()) {
            continue;
        }
        let mut tri = [0u32; 3];
        for (slot, vh) in tri.iter_mut().zip(face_handle.vertices()) {
            let key = vh.fix().index();
            *slot = if let Some(&existing) = vertex_map.get(&key) {
                existing
            } else {
                let pos = vh.position();
                let index = vertex_index(mesh.vertices.len())?;
                mesh.vertices.push(plane.evaluate(pos.x, pos.y)?);
                mesh.normals.push(normal);
                vertex_map.insert(key, index);
                index
            };
        }
        mesh.indices.push(tri);
    }

    if mesh.indices.is_empty() {
        return Err(TessellationError::Failed("planar face has no interior".into()).into());
    }
    Ok(mesh)
}

fn ensure_seam_bounded(store: &TopologyStore, wire: WireId) -> Result<()> {
    for oe in &store.wire(wire)?.edges {
        if !store.edge(oe.edge)?.seam {
            return Err(TessellationError::Failed(
                "trimmed spherical faces are not supported".into(),
            )
            .into());
        }
    }
    Ok(())
}

/// Segments needed to follow an arc of `radius` over `sweep` radians.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn angular_segments(radius: f64, sweep: f64, params: &TessellationParams) -> usize {
    if radius <= params.tolerance {
        return params.min_segments;
    }
    let step = 2.0 * (1.0 - params.tolerance / radius).acos();
    ((sweep / step).ceil() as usize).clamp(params.min_segments, params.max_segments)
}

fn tessellate_sphere(sphere: &Sphere, params: &TessellationParams) -> Result<TriangleMesh> {
    let domain = sphere.domain();
    let n_u = angular_segments(sphere.radius(), TAU, params);
    let n_v = angular_segments(sphere.radius(), PI, params);
    tessellate_uv_grid(
        sphere,
        (domain.u_min, domain.u_max),
        (domain.v_min, domain.v_max),
        n_u,
        n_v,
        params.quad,
    )
}

/// Samples a surface on an `(n_u + 1) x (n_v + 1)` grid.
///
/// With `quad` every cell is split along the same diagonal, so pairs of
/// triangles recombine into the grid's quads. Otherwise the diagonal
/// alternates in a checkerboard.
#[allow(clippy::cast_precision_loss)]
fn tessellate_uv_grid(
    surface: &dyn Surface,
    (u_min, u_max): (f64, f64),
    (v_min, v_max): (f64, f64),
    n_u: usize,
    n_v: usize,
    quad: bool,
) -> Result<TriangleMesh> {
    let rows = n_v + 1;
    let cols = n_u + 1;
    let mut mesh = TriangleMesh {
        vertices: Vec::with_capacity(rows * cols),
        normals: Vec::with_capacity(rows * cols),
        indices: Vec::with_capacity(n_u * n_v * 2),
    };

    for iv in 0..rows {
        let v = v_min + (v_max - v_min) * iv as f64 / n_v as f64;
        for iu in 0..cols {
            let u = u_min + (u_max - u_min) * iu as f64 / n_u as f64;
            mesh.vertices.push(surface.evaluate(u, v)?);
            mesh.normals.push(surface.normal(u, v)?);
        }
    }

    for iv in 0..n_v {
        for iu in 0..n_u {
            let i00 = vertex_index(iv * cols + iu)?;
            let i10 = vertex_index(iv * cols + iu + 1)?;
            let i01 = vertex_index((iv + 1) * cols + iu)?;
            let i11 = vertex_index((iv + 1) * cols + iu + 1)?;
            if quad || (iu + iv) % 2 == 0 {
                mesh.indices.push([i00, i10, i11]);
                mesh.indices.push([i00, i11, i01]);
            } else {
                mesh.indices.push([i00, i10, i01]);
                mesh.indices.push([i10, i11, i01]);
            }
        }
    }

    Ok(mesh)
}

fn vertex_index(i: usize) -> Result<u32> {
    u32::try_from(i)
        .map_err(|_| TessellationError::Failed("mesh exceeds u32 vertex indices".into()).into())
}

/// Inserts a closed polygon as a chain of constraint edges.
fn insert_constraint_loop(
    cdt: &mut ConstrainedDelaunayTriangulation<SpadePoint2<f64>>,
    points: &[SpadePoint2<f64>],
) -> Result<()> {
    if points.len() < 3 {
        return Err(
            TessellationError::Failed("constraint loop needs at least 3 points".into()).into(),
        );
    }

    let mut handles = Vec::with_capacity(points.len());
    for &pt in points {
        let h = cdt
            .insert(pt)
            .map_err(|e: InsertionError| TessellationError::Failed(format!("CDT insert: {e}")))?;
        handles.push(h);
    }

    for (i, &from) in handles.iter().enumerate() {
        let to = handles[(i + 1) % handles.len()];
        if from != to {
            cdt.add_constraint(from, to);
        }
    }
    Ok(())
}

/// Inner CDT faces lying inside the constraint loops.
///
/// Flood-fills from the convex hull, counting constraint crossings. Faces at
/// odd depth are interior, which makes inner loops holes.
fn classify_interior_faces(
    cdt: &ConstrainedDelaunayTriangulation<SpadePoint2<f64>>,
) -> HashSet<usize> {
    let mut interior = HashSet::new();
    let mut depth_map: HashMap<usize, u32> = HashMap::new();
    let mut queue: VecDeque<(FixedFaceHandle<InnerTag>, u32)> = VecDeque::new();

    let mut visit = |face: FixedFaceHandle<InnerTag>,
                     depth: u32,
                     queue: &mut VecDeque<(FixedFaceHandle<InnerTag>, u32)>| {
        if depth_map.insert(face.index(), depth).is_none() {
            if depth % 2 == 1 {
                interior.insert(face.index());
            }
            queue.push_back((face, depth));
        }
    };

    let outer = cdt.outer_face().fix();
    for edge in cdt.directed_edges() {
        if edge.face().fix() != outer {
            continue;
        }
        if let Some(inner) = edge.rev().face().as_inner() {
            let depth = u32::from(cdt.is_constraint_edge(edge.as_undirected().fix()));
            visit(inner.fix(), depth, &mut queue);
        }
    }

    while let Some((face, depth)) = queue.pop_front() {
        for edge in cdt.face(face).adjacent_edges() {
            if let Some(neighbor) = edge.rev().face().as_inner() {
                let crossing = u32::from(cdt.is_constraint_edge(edge.as_undirected().fix()));
                visit(neighbor.fix(), depth + crossing, &mut queue);
            }
        }
    }

    interior
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::math::Vector3;
    use crate::operations::creation::{MakeBox, MakeFace, MakeSphere, MakeWire};
    use approx::assert_relative_eq;

    fn area(mesh: &TriangleMesh) -> f64 {
        mesh.indices
            .iter()
            .map(|t| {
                let [a, b, c] = t.map(|i| mesh.vertices[i as usize]);
                (b - a).cross(&(c - a)).norm() / 2.0
            })
            .sum()
    }

    fn winding_normal(mesh: &TriangleMesh, tri: usize) -> Vector3 {
        let [a, b, c] = mesh.indices[tri].map(|i| mesh.vertices[i as usize]);
        (b - a).cross(&(c - a))
    }

    fn square(size: f64, offset: f64) -> Vec<Point3> {
        vec![
            Point3::new(offset, offset, 0.0),
            Point3::new(offset + size, offset, 0.0),
            Point3::new(offset + size, offset + size, 0.0),
            Point3::new(offset, offset + size, 0.0),
        ]
    }

    #[test]
    fn box_faces_are_two_outward_triangles() {
        let mut store = TopologyStore::new();
        let solid = MakeBox::new(Point3::origin(), Point3::new(2.0, 3.0, 4.0))
            .execute(&mut store)
            .unwrap();
        let centroid = Point3::new(1.0, 1.5, 2.0);
        let mut total = 0.0;
        for face in store.solid_faces(solid).unwrap() {
            let mesh = TessellateFace::new(face, TessellationParams::default())
                .execute(&store)
                .unwrap();
            assert_eq!(mesh.indices.len(), 2);
            assert_eq!(mesh.vertices.len(), 4);
            let outward = mesh.vertices[0] - centroid;
            assert!(winding_normal(&mesh, 0).dot(&outward) > 0.0);
            assert!(mesh.normals[0].dot(&outward) > 0.0);
            total += area(&mesh);
        }
        assert_relative_eq!(total, 2.0 * (6.0 + 8.0 + 12.0), epsilon = 1e-9);
    }

    #[test]
    fn planar_hole_is_excluded() {
        let mut store = TopologyStore::new();
        let outer = MakeWire::new(square(4.0, 0.0), true).execute(&mut store).unwrap();
        let mut hole_pts = square(2.0, 1.0);
        hole_pts.reverse();
        let hole = MakeWire::new(hole_pts, true).execute(&mut store).unwrap();
        let face = MakeFace::new(outer, vec![hole]).execute(&mut store).unwrap();
        let mesh = TessellateFace::new(face, TessellationParams::default())
            .execute(&store)
            .unwrap();
        assert_relative_eq!(area(&mesh), 12.0, epsilon = 1e-9);
        for tri in 0..mesh.indices.len() {
            assert!(winding_normal(&mesh, tri).z > 0.0);
        }
    }

    #[test]
    fn sphere_density_follows_precision() {
        let mut store = TopologyStore::new();
        let solid = MakeSphere::new(Point3::origin(), 1.0)
            .execute(&mut store)
            .unwrap();
        let face = store.solid_faces(solid).unwrap()[0];
        let coarse = TessellateFace::new(face, TessellationParams::with_tolerance(0.05))
            .execute(&store)
            .unwrap();
        let fine = TessellateFace::new(face, TessellationParams::with_tolerance(0.001))
            .execute(&store)
            .unwrap();
        assert!(fine.indices.len() > coarse.indices.len());
        for p in &fine.vertices {
            assert_relative_eq!(p.coords.norm(), 1.0, epsilon = 1e-9);
        }
        assert_eq!(coarse.vertices.len(), coarse.normals.len());
    }

    #[test]
    fn quad_flag_controls_diagonals() {
        let sphere = Sphere::new(Point3::origin(), 1.0).unwrap();
        let quad = tessellate_uv_grid(&sphere, (0.0, 1.0), (0.0, 1.0), 2, 2, true).unwrap();
        let mixed = tessellate_uv_grid(&sphere, (0.0, 1.0), (0.0, 1.0), 2, 2, false).unwrap();
        assert_eq!(quad.indices.len(), mixed.indices.len());
        // Cell (1, 0) is split along the other diagonal when alternating.
        assert_eq!(quad.indices[2], [1, 2, 5]);
        assert_eq!(mixed.indices[2], [1, 2, 4]);
        assert_eq!(quad.indices[0], mixed.indices[0]);
    }

    #[test]
    fn angular_segments_are_clamped() {
        let params = TessellationParams {
            min_segments: 8,
            max_segments: 32,
            ..TessellationParams::with_tolerance(1e-9)
        };
        assert_eq!(angular_segments(1.0, TAU, &params), 32);
        assert_eq!(angular_segments(1e-12, TAU, &params), 8);
    }
}
