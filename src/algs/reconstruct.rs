//! Reconstruct a global mesh from processor meshes.
//!
//! With saved addressing for every processor the original mesh is rebuilt
//! exactly. Without it, processor patches are matched geometrically, shared
//! points resolved, and the meshes merged into a mesh isomorphic to the
//! original (same cells, faces, points and patches up to renumbering).

use crate::algs::assemble::{AssembledMesh, assemble, assemble_with_addressing};
use crate::algs::patch_match::match_processor_patches;
use crate::algs::shared_points::{SharedPointSet, resolve_shared_points};
use crate::config::DecomposeConfig;
use crate::mesh_error::MeshDecomposeError;
use crate::topology::addressing::ProcAddressing;
use crate::topology::poly_mesh::PolyMesh;

/// How the processor meshes were put back together.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ReconstructMode {
    /// Saved addressing placed every entity.
    Exact,
    /// Patches were matched from the meshes alone.
    Merged,
}

#[derive(Clone, Debug)]
pub struct Reconstruction {
    pub mode: ReconstructMode,
    pub mesh: PolyMesh,
    /// Addressing of every processor mesh into `mesh`.
    pub addressing: Vec<ProcAddressing>,
    /// Points shared by three or more processors; empty in exact mode.
    pub shared_points: SharedPointSet,
}

/// Reconstruct from processor meshes, using `addressing` when available.
pub fn reconstruct_mesh(
    meshes: &[PolyMesh],
    addressing: Option<&[ProcAddressing]>,
    cfg: &DecomposeConfig,
) -> Result<Reconstruction, MeshDecomposeError> {
    cfg.validate(Some(meshes.len()))?;
    if meshes.is_empty() {
        return Err(MeshDecomposeError::InvalidMesh(
            "no processor meshes to reconstruct".into(),
        ));
    }
    match addressing {
        Some(addr) => {
            log::info!("reconstructing {} processors from saved addressing", meshes.len());
            // Cross-check the processor interfaces before trusting the tables.
            match_processor_patches(meshes, Some(addr), cfg.match_tolerance)?;
            let AssembledMesh { mesh, addressing } = assemble_with_addressing(meshes, addr)?;
            Ok(Reconstruction {
                mode: ReconstructMode::Exact,
                mesh,
                addressing,
                shared_points: SharedPointSet::default(),
            })
        }
        None => {
            log::info!(
                "reconstructing {} processors by patch matching (tolerance {})",
                meshes.len(),
                cfg.match_tolerance
            );
            let correspondences = match_processor_patches(meshes, None, cfg.match_tolerance)?;
            let shared_points = resolve_shared_points(meshes, &correspondences)?;
            let AssembledMesh { mesh, addressing } = assemble(meshes, &correspondences, &shared_points)?;
            Ok(Reconstruction {
                mode: ReconstructMode::Merged,
                mesh,
                addressing,
                shared_points,
            })
        }
    }
}
