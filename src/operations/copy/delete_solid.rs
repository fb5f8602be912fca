use std::collections::HashSet;

use crate::error::Result;
use crate::topology::{SolidId, TopologyStore};

/// Removes a solid and every entity reachable from it.
///
/// Assumes the solid owns its shells, faces, wires, edges and vertices
/// exclusively, which holds for solids built or copied by this crate.
pub struct DeleteSolid {
    solid: SolidId,
}

impl DeleteSolid {
    /// Creates a new `DeleteSolid` operation.
    #[must_use]
    pub fn new(solid: SolidId) -> Self {
        Self { solid }
    }

    /// Executes the deletion.
    ///
    /// # Errors
    ///
    /// Returns an error if the solid or an entity reachable from it is missing.
    pub fn execute(&self, store: &mut TopologyStore) -> Result<()> {
        let solid = store.solid(self.solid)?.clone();
        let faces = store.solid_faces(self.solid)?;

        let mut wires = Vec::new();
        for &face in &faces {
            wires.extend(store.face_wires(face)?);
        }
        let edges = store.unique_edges(wires.iter().copied())?;
        let mut vertices = HashSet::new();
        for &edge in &edges {
            let data = store.edge(edge)?;
            vertices.insert(data.start);
            vertices.insert(data.end);
        }

        for vertex in vertices {
            store.remove_vertex(vertex);
        }
        for edge in edges {
            store.remove_edge(edge);
        }
        for wire in wires {
            store.remove_wire(wire);
        }
        for face in faces {
            store.remove_face(face);
        }
        for shell in solid.shells() {
            store.remove_shell(shell);
        }
        store.remove_solid(self.solid);
        Ok(())
    }
}
