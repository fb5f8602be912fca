pub mod edge;
pub mod face;
pub mod shell;
pub mod solid;
pub mod vertex;
pub mod wire;

pub use edge::{EdgeCurve, EdgeData, EdgeId};
pub use face::{FaceData, FaceId, FaceSurface};
pub use shell::{ShellData, ShellId};
pub use solid::{SolidData, SolidId};
pub use vertex::{VertexData, VertexId};
pub use wire::{OrientedEdge, WireData, WireId};

use std::collections::HashSet;

use crate::error::TopologyError;
use slotmap::SlotMap;

/// Central arena that owns all topological entities.
///
/// Entities reference each other via typed generational keys. A key stays
/// valid (and keeps naming the same entity) until the entity is removed,
/// which is what makes face and edge keys usable as persistent identities.
#[derive(Debug, Default)]
pub struct TopologyStore {
    vertices: SlotMap<VertexId, VertexData>,
    edges: SlotMap<EdgeId, EdgeData>,
    wires: SlotMap<WireId, WireData>,
    faces: SlotMap<FaceId, FaceData>,
    shells: SlotMap<ShellId, ShellData>,
    solids: SlotMap<SolidId, SolidData>,
}

macro_rules! arena_accessors {
    ($arena:ident, $id:ty, $data:ty, $label:literal, $add:ident, $get:ident, $get_mut:ident, $remove:ident) => {
        #[doc = concat!("Inserts a ", $label, " and returns its ID.")]
        pub fn $add(&mut self, data: $data) -> $id {
            self.$arena.insert(data)
        }

        #[doc = concat!("Returns the ", $label, " data.")]
        ///
        /// # Errors
        ///
        /// Returns an error if the entity is not in the store.
        pub fn $get(&self, id: $id) -> Result<&$data, TopologyError> {
            self.$arena
                .get(id)
                .ok_or_else(|| TopologyError::EntityNotFound($label.into()))
        }

        #[doc = concat!("Returns the ", $label, " data mutably.")]
        ///
        /// # Errors
        ///
        /// Returns an error if the entity is not in the store.
        pub fn $get_mut(&mut self, id: $id) -> Result<&mut $data, TopologyError> {
            self.$arena
                .get_mut(id)
                .ok_or_else(|| TopologyError::EntityNotFound($label.into()))
        }

        #[doc = concat!("Removes a ", $label, ", returning its data if it existed.")]
        pub fn $remove(&mut self, id: $id) -> Option<$data> {
            self.$arena.remove(id)
        }
    };
}

impl TopologyStore {
    /// Creates a new, empty topology store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    arena_accessors!(vertices, VertexId, VertexData, "vertex", add_vertex, vertex, vertex_mut, remove_vertex);
    arena_accessors!(edges, EdgeId, EdgeData, "edge", add_edge, edge, edge_mut, remove_edge);
    arena_accessors!(wires, WireId, WireData, "wire", add_wire, wire, wire_mut, remove_wire);
    arena_accessors!(faces, FaceId, FaceData, "face", add_face, face, face_mut, remove_face);
    arena_accessors!(shells, ShellId, ShellData, "shell", add_shell, shell, shell_mut, remove_shell);
    arena_accessors!(solids, SolidId, SolidData, "solid", add_solid, solid, solid_mut, remove_solid);

    /// Number of solids in the store.
    #[must_use]
    pub fn solid_count(&self) -> usize {
        self.solids.len()
    }

    /// Number of faces in the store.
    #[must_use]
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    // --- Traversal ---

    /// Faces of every shell of a solid, outer shell first.
    ///
    /// # Errors
    ///
    /// Returns an error if the solid or one of its shells is missing.
    pub fn solid_faces(&self, solid: SolidId) -> Result<Vec<FaceId>, TopologyError> {
        let mut faces = Vec::new();
        for shell in self.solid(solid)?.shells() {
            faces.extend_from_slice(&self.shell(shell)?.faces);
        }
        Ok(faces)
    }

    /// Every wire bounding a face, outer wire first.
    ///
    /// # Errors
    ///
    /// Returns an error if the face is missing.
    pub fn face_wires(&self, face: FaceId) -> Result<Vec<WireId>, TopologyError> {
        let data = self.face(face)?;
        let mut wires = Vec::with_capacity(1 + data.inner_wires.len());
        wires.push(data.outer_wire);
        wires.extend_from_slice(&data.inner_wires);
        Ok(wires)
    }

    /// Distinct edges of a set of wires, in first-use order.
    ///
    /// # Errors
    ///
    /// Returns an error if a wire is missing.
    pub fn unique_edges(
        &self,
        wires: impl IntoIterator<Item = WireId>,
    ) -> Result<Vec<EdgeId>, TopologyError> {
        let mut seen = HashSet::new();
        let mut edges = Vec::new();
        for wire in wires {
            for oe in &self.wire(wire)?.edges {
                if seen.insert(oe.edge) {
                    edges.push(oe.edge);
                }
            }
        }
        Ok(edges)
    }

    /// Distinct edges of a solid, in face enumeration order.
    ///
    /// # Errors
    ///
    /// Returns an error if any entity on the way is missing.
    pub fn solid_edges(&self, solid: SolidId) -> Result<Vec<EdgeId>, TopologyError> {
        let mut wires = Vec::new();
        for face in self.solid_faces(solid)? {
            wires.extend(self.face_wires(face)?);
        }
        self.unique_edges(wires)
    }

    /// Vertices visited by a wire, one per oriented edge, in traversal order.
    ///
    /// # Errors
    ///
    /// Returns an error if the wire or one of its edges is missing.
    pub fn wire_vertices(&self, wire: WireId) -> Result<Vec<VertexId>, TopologyError> {
        self.wire(wire)?
            .edges
            .iter()
            .map(|oe| {
                let edge = self.edge(oe.edge)?;
                Ok(if oe.forward { edge.start } else { edge.end })
            })
            .collect()
    }
}
