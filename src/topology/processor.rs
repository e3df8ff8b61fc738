//! A processor's sub-mesh together with its addressing back to the global mesh.

use crate::topology::addressing::ProcAddressing;
use crate::topology::patch::PatchKind;
use crate::topology::poly_mesh::PolyMesh;

#[derive(Clone, Debug, PartialEq)]
pub struct ProcessorMesh {
    pub proc_no: usize,
    pub mesh: PolyMesh,
    pub addressing: ProcAddressing,
}

impl ProcessorMesh {
    /// Indices of processor patches (plain and cyclic) in patch order.
    pub fn processor_patches(&self) -> impl Iterator<Item = usize> + '_ {
        self.mesh
            .patches
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_processor())
            .map(|(i, _)| i)
    }

    /// Ranks this processor shares an interface with, ascending.
    pub fn neighbour_procs(&self) -> Vec<usize> {
        let mut out: Vec<usize> = self
            .mesh
            .patches
            .iter()
            .filter_map(|p| p.kind.processor_pair().map(|(_, nbr)| nbr))
            .collect();
        out.sort_unstable();
        out.dedup();
        out
    }

    /// Number of faces on plain processor patches.
    pub fn n_processor_faces(&self) -> usize {
        self.mesh
            .patches
            .iter()
            .filter(|p| matches!(p.kind, PatchKind::Processor { .. }))
            .map(|p| p.size)
            .sum()
    }
}
