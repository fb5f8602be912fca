use std::collections::HashMap;

use crate::error::Result;
use crate::topology::{
    EdgeId, FaceId, ShellData, SolidData, SolidId, TopologyStore, VertexId, WireId,
};

/// Outcome of a deep solid copy.
///
/// `original_faces[k]` was copied to `copy_faces[k]`.
#[derive(Debug, Clone)]
pub struct SolidCopyResult {
    /// The newly created solid.
    pub solid: SolidId,
    /// Face identities of the source solid.
    pub original_faces: Vec<FaceId>,
    /// Corresponding face identities of the copy.
    pub copy_faces: Vec<FaceId>,
}

/// Deep-clones a solid, giving every entity of the copy a fresh identity.
///
/// Faces of the copy start out unmodified.
pub struct CopySolid {
    solid: SolidId,
}

impl CopySolid {
    /// Creates a new `CopySolid` operation.
    #[must_use]
    pub fn new(solid: SolidId) -> Self {
        Self { solid }
    }

    /// Executes the copy.
    ///
    /// # Errors
    ///
    /// Returns an error if any entity reachable from the solid is missing.
    pub fn execute(&self, store: &mut TopologyStore) -> Result<SolidCopyResult> {
        let source = store.solid(self.solid)?.clone();
        let mut remap = Remap::default();

        let outer_shell = remap.shell(store, source.outer_shell)?;
        let inner_shells = source
            .inner_shells
            .iter()
            .map(|&shell| remap.shell(store, shell))
            .collect::<Result<Vec<_>>>()?;

        let solid = store.add_solid(SolidData {
            outer_shell,
            inner_shells,
        });

        let (original_faces, copy_faces) = remap.faces.into_iter().unzip();
        Ok(SolidCopyResult {
            solid,
            original_faces,
            copy_faces,
        })
    }
}

/// Old-to-new identity tables built while copying.
#[derive(Default)]
struct Remap {
    vertices: HashMap<VertexId, VertexId>,
    edges: HashMap<EdgeId, EdgeId>,
    wires: HashMap<WireId, WireId>,
    faces: Vec<(FaceId, FaceId)>,
    face_lookup: HashMap<FaceId, FaceId>,
}

impl Remap {
    fn shell(
        &mut self,
        store: &mut TopologyStore,
        shell: crate::topology::ShellId,
    ) -> Result<crate::topology::ShellId> {
        let data = store.shell(shell)?.clone();
        let faces = data
            .faces
            .iter()
            .map(|&face| self.face(store, face))
            .collect::<Result<Vec<_>>>()?;
        Ok(store.add_shell(ShellData {
            faces,
            is_closed: data.is_closed,
        }))
    }

    fn face(&mut self, store: &mut TopologyStore, face: FaceId) -> Result<FaceId> {
        if let Some(&copied) = self.face_lookup.get(&face) {
            return Ok(copied);
        }
        let mut data = store.face(face)?.clone();
        data.outer_wire = self.wire(store, data.outer_wire)?;
        for inner in &mut data.inner_wires {
            *inner = self.wire(store, *inner)?;
        }
        data.modified = false;

        let copied = store.add_face(data);
        self.face_lookup.insert(face, copied);
        self.faces.push((face, copied));
        Ok(copied)
    }

    fn wire(&mut self, store: &mut TopologyStore, wire: WireId) -> Result<WireId> {
        if let Some(&copied) = self.wires.get(&wire) {
            return Ok(copied);
        }
        let mut data = store.wire(wire)?.clone();
        for oe in &mut data.edges {
            oe.edge = self.edge(store, oe.edge)?;
        }
        let copied = store.add_wire(data);
        self.wires.insert(wire, copied);
        Ok(copied)
    }

    fn edge(&mut self, store: &mut TopologyStore, edge: EdgeId) -> Result<EdgeId> {
        if let Some(&copied) = self.edges.get(&edge) {
            return Ok(copied);
        }
        let mut data = store.edge(edge)?.clone();
        data.start = self.vertex(store, data.start)?;
        data.end = self.vertex(store, data.end)?;
        let copied = store.add_edge(data);
        self.edges.insert(edge, copied);
        Ok(copied)
    }

    fn vertex(&mut self, store: &mut TopologyStore, vertex: VertexId) -> Result<VertexId> {
        if let Some(&copied) = self.vertices.get(&vertex) {
            return Ok(copied);
        }
        let data = store.vertex(vertex)?.clone();
        let copied = store.add_vertex(data);
        self.vertices.insert(vertex, copied);
        Ok(copied)
    }
}
