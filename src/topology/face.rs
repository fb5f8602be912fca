use crate::geometry::surface::{Plane, Sphere};

use super::wire::WireId;

slotmap::new_key_type! {
    /// Persistent identity of a face in the topology store.
    pub struct FaceId;
}

/// The geometric surface associated with a face.
#[derive(Debug, Clone)]
pub enum FaceSurface {
    /// A planar surface.
    Plane(Plane),
    /// A spherical surface.
    Sphere(Sphere),
}

/// Data associated with a topological face.
///
/// A face is a bounded region on a surface, defined by an outer wire
/// and optionally inner wires (holes).
#[derive(Debug, Clone)]
pub struct FaceData {
    /// The geometric surface on which this face lies.
    pub surface: FaceSurface,
    /// The outer boundary wire.
    pub outer_wire: WireId,
    /// Inner boundary wires (holes).
    pub inner_wires: Vec<WireId>,
    /// Set when an edit changed this face's geometry since the solid was copied.
    pub modified: bool,
    /// Display style tag.
    pub style: u32,
}

impl FaceData {
    /// Creates an unmodified face without holes.
    #[must_use]
    pub fn new(surface: FaceSurface, outer_wire: WireId) -> Self {
        Self {
            surface,
            outer_wire,
            inner_wires: Vec::new(),
            modified: false,
            style: 0,
        }
    }
}
