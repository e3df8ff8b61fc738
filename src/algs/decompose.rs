//! Decompose a global mesh into per-processor sub-meshes.
//!
//! Given one processor label per cell, [`decompose_mesh`] derives every
//! processor's cells, faces, points and patches together with the four
//! addressing tables back to the global mesh. Internal faces cut by the
//! partition become processor-boundary faces on both sides: the owner side
//! keeps the global orientation, the neighbour side receives the reversed face
//! and becomes its owner. Cyclic face pairs split across processors become
//! processor-cyclic faces on both sides.
//!
//! The result is a pure function of the mesh and the labels.

use crate::config::DecomposeConfig;
use crate::debug_invariants::DebugInvariants;
use crate::mesh_error::MeshDecomposeError;
use crate::topology::addressing::{FaceAddress, ProcAddressing};
use crate::topology::face::reverse_face;
use crate::topology::patch::{
    Patch, PatchKind, processor_cyclic_patch_name, processor_patch_name,
};
use crate::topology::poly_mesh::PolyMesh;
use crate::topology::processor::ProcessorMesh;
use hashbrown::HashMap;
use std::collections::BTreeMap;

/// Options that change the shape of the produced processor meshes.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct DecomposeOptions {
    /// Drop non-processor patches that end up with no faces on a processor.
    pub filter_empty_patches: bool,
}

impl From<&DecomposeConfig> for DecomposeOptions {
    fn from(cfg: &DecomposeConfig) -> Self {
        Self {
            filter_empty_patches: cfg.filter_empty_patches,
        }
    }
}

/// Result of decomposing a mesh.
#[derive(Clone, Debug)]
pub struct Decomposition {
    pub n_procs: usize,
    pub processors: Vec<ProcessorMesh>,
    /// Set when at least one cyclic face pair was split across processors.
    pub cyclic_parallel: bool,
}

impl Decomposition {
    /// Addressing tables of every processor, in processor order.
    pub fn addressing(&self) -> Vec<&ProcAddressing> {
        self.processors.iter().map(|p| &p.addressing).collect()
    }

    pub fn stats(&self) -> DecompositionStats {
        DecompositionStats::of(self)
    }
}

/// Load summary of a decomposition, for reporting.
#[derive(Clone, Debug, PartialEq)]
pub struct DecompositionStats {
    pub cells_per_proc: Vec<usize>,
    pub processor_faces_per_proc: Vec<usize>,
    pub max_cells: usize,
    pub avg_cells: f64,
    /// `max_cells / avg_cells - 1`; zero for a perfectly balanced split.
    pub imbalance: f64,
    /// Each cut face counted once.
    pub total_processor_faces: usize,
}

impl DecompositionStats {
    pub fn of(dec: &Decomposition) -> Self {
        let cells_per_proc: Vec<usize> = dec.processors.iter().map(|p| p.mesh.n_cells()).collect();
        let processor_faces_per_proc: Vec<usize> =
            dec.processors.iter().map(|p| p.n_processor_faces()).collect();
        let max_cells = cells_per_proc.iter().copied().max().unwrap_or(0);
        let total: usize = cells_per_proc.iter().sum();
        let avg_cells = if dec.n_procs == 0 {
            0.0
        } else {
            total as f64 / dec.n_procs as f64
        };
        let imbalance = if avg_cells > 0.0 {
            max_cells as f64 / avg_cells - 1.0
        } else {
            0.0
        };
        Self {
            total_processor_faces: processor_faces_per_proc.iter().sum::<usize>() / 2,
            cells_per_proc,
            processor_faces_per_proc,
            max_cells,
            avg_cells,
            imbalance,
        }
    }
}

/// Key of an inter-processor face list: neighbour rank, then the cyclic patch
/// the faces were split from (`None` for cut internal faces, sorted first).
type InterKey = (usize, Option<usize>);

/// Validate a partition label array against a mesh and processor count.
pub fn check_labels(
    mesh: &PolyMesh,
    labels: &[usize],
    n_procs: usize,
) -> Result<(), MeshDecomposeError> {
    if n_procs == 0 {
        return Err(MeshDecomposeError::MalformedPartition(
            "processor count must be at least one".into(),
        ));
    }
    if labels.len() != mesh.n_cells() {
        return Err(MeshDecomposeError::MalformedPartition(format!(
            "{} labels for {} cells; cell {} has no partition entry",
            labels.len(),
            mesh.n_cells(),
            labels.len().min(mesh.n_cells())
        )));
    }
    if let Some((cell, &proc)) = labels.iter().enumerate().find(|&(_, &p)| p >= n_procs) {
        return Err(MeshDecomposeError::MalformedPartition(format!(
            "cell {cell} is assigned to processor {proc}, only {n_procs} processors exist"
        )));
    }
    Ok(())
}

/// Decompose `mesh` into `n_procs` processor meshes using one label per cell.
pub fn decompose_mesh(
    mesh: &PolyMesh,
    labels: &[usize],
    n_procs: usize,
    opts: &DecomposeOptions,
) -> Result<Decomposition, MeshDecomposeError> {
    check_labels(mesh, labels, n_procs)?;
    if let Some(p) = mesh.patches.iter().find(|p| p.is_processor()) {
        return Err(MeshDecomposeError::InvalidMesh(format!(
            "global mesh already contains processor patch `{}`",
            p.name
        )));
    }

    // Cells, in increasing global order per processor.
    let mut proc_cells: Vec<Vec<usize>> = vec![Vec::new(); n_procs];
    let mut local_cell = vec![0usize; mesh.n_cells()];
    for (cell, &proc) in labels.iter().enumerate() {
        local_cell[cell] = proc_cells[proc].len();
        proc_cells[proc].push(cell);
    }

    let mut internal_faces: Vec<Vec<usize>> = vec![Vec::new(); n_procs];
    let mut inter_faces: Vec<BTreeMap<InterKey, Vec<FaceAddress>>> = vec![BTreeMap::new(); n_procs];
    for face in 0..mesh.n_internal_faces() {
        let own = labels[mesh.owner[face]];
        let nbr = labels[mesh.neighbour[face]];
        if own == nbr {
            internal_faces[own].push(face);
        } else {
            inter_faces[own]
                .entry((nbr, None))
                .or_default()
                .push(FaceAddress::forward(face));
            inter_faces[nbr]
                .entry((own, None))
                .or_default()
                .push(FaceAddress::reversed(face));
        }
    }

    // Boundary faces per processor, per global patch.
    let n_patches = mesh.patches.len();
    let mut patch_faces: Vec<Vec<Vec<usize>>> = vec![vec![Vec::new(); n_patches]; n_procs];
    let mut cyclic_parallel = false;
    for (g, patch) in mesh.patches.iter().enumerate() {
        match &patch.kind {
            PatchKind::Cyclic { neighbour_patch } => {
                let h = cyclic_partner(mesh, g, neighbour_patch)?;
                if h < g {
                    continue;
                }
                let partner = &mesh.patches[h];
                for i in 0..patch.size {
                    let fa = patch.start + i;
                    let fb = partner.start + i;
                    let pa = labels[mesh.owner[fa]];
                    let pb = labels[mesh.owner[fb]];
                    if pa == pb {
                        patch_faces[pa][g].push(fa);
                        patch_faces[pa][h].push(fb);
                    } else {
                        cyclic_parallel = true;
                        inter_faces[pa]
                            .entry((pb, Some(g)))
                            .or_default()
                            .push(FaceAddress::forward(fa));
                        inter_faces[pb]
                            .entry((pa, Some(h)))
                            .or_default()
                            .push(FaceAddress::forward(fb));
                    }
                }
            }
            _ => {
                for face in patch.range() {
                    patch_faces[labels[mesh.owner[face]]][g].push(face);
                }
            }
        }
    }
    if cyclic_parallel {
        log::info!("cyclic patches are split across processors");
    }

    let mut processors = Vec::with_capacity(n_procs);
    for proc_no in 0..n_procs {
        let pm = build_processor_mesh(
            mesh,
            proc_no,
            &proc_cells[proc_no],
            &local_cell,
            &internal_faces[proc_no],
            &patch_faces[proc_no],
            &inter_faces[proc_no],
            opts,
        )?;
        if pm.mesh.n_cells() == 0 {
            log::warn!("processor {proc_no} received no cells");
        }
        log::info!(
            "processor {proc_no}: {} cells, {} faces, {} points, {} processor patches ({} processor faces)",
            pm.mesh.n_cells(),
            pm.mesh.n_faces(),
            pm.mesh.n_points(),
            pm.processor_patches().count(),
            pm.n_processor_faces()
        );
        processors.push(pm);
    }

    Ok(Decomposition {
        n_procs,
        processors,
        cyclic_parallel,
    })
}

/// Decompose with options taken from a run configuration.
pub fn decompose_with_config(
    mesh: &PolyMesh,
    labels: &[usize],
    n_procs: usize,
    cfg: &DecomposeConfig,
) -> Result<Decomposition, MeshDecomposeError> {
    cfg.validate(Some(n_procs))?;
    decompose_mesh(mesh, labels, n_procs, &DecomposeOptions::from(cfg))
}

fn cyclic_partner(mesh: &PolyMesh, g: usize, name: &str) -> Result<usize, MeshDecomposeError> {
    let patch = &mesh.patches[g];
    let h = mesh.find_patch(name).ok_or_else(|| {
        MeshDecomposeError::InvalidMesh(format!(
            "cyclic patch `{}` names missing neighbour patch `{name}`",
            patch.name
        ))
    })?;
    let partner = &mesh.patches[h];
    if h == g || partner.size != patch.size {
        return Err(MeshDecomposeError::InvalidMesh(format!(
            "cyclic patches `{}` ({} faces) and `{}` ({} faces) do not pair",
            patch.name, patch.size, partner.name, partner.size
        )));
    }
    match &partner.kind {
        PatchKind::Cyclic { neighbour_patch } if *neighbour_patch == patch.name => Ok(h),
        _ => Err(MeshDecomposeError::InvalidMesh(format!(
            "patch `{}` does not point back to cyclic patch `{}`",
            partner.name, patch.name
        ))),
    }
}

#[allow(clippy::too_many_arguments)]
fn build_processor_mesh(
    mesh: &PolyMesh,
    proc_no: usize,
    cells: &[usize],
    local_cell: &[usize],
    internal: &[usize],
    patch_faces: &[Vec<usize>],
    inter: &BTreeMap<InterKey, Vec<FaceAddress>>,
    opts: &DecomposeOptions,
) -> Result<ProcessorMesh, MeshDecomposeError> {
    let mut face_addr: Vec<FaceAddress> = internal.iter().map(|&f| FaceAddress::forward(f)).collect();
    let mut patches = Vec::new();
    let mut boundary_addr = Vec::new();

    for (g, faces) in patch_faces.iter().enumerate() {
        if faces.is_empty() && opts.filter_empty_patches {
            log::debug!(
                "processor {proc_no}: dropping empty patch `{}`",
                mesh.patches[g].name
            );
            continue;
        }
        let global = &mesh.patches[g];
        patches.push(Patch::new(
            global.name.clone(),
            global.kind.clone(),
            face_addr.len(),
            faces.len(),
        ));
        boundary_addr.push(Some(g));
        face_addr.extend(faces.iter().map(|&f| FaceAddress::forward(f)));
    }

    for (&(nbr, referred), faces) in inter {
        debug_assert_ne!(nbr, proc_no);
        let (name, kind) = match referred {
            None => (
                processor_patch_name(proc_no, nbr),
                PatchKind::Processor {
                    my_proc: proc_no,
                    neighbour_proc: nbr,
                },
            ),
            Some(g) => {
                let referred = mesh.patches[g].name.clone();
                let neighbour_patch = match &mesh.patches[g].kind {
                    PatchKind::Cyclic { neighbour_patch } => neighbour_patch.clone(),
                    _ => String::new(),
                };
                (
                    processor_cyclic_patch_name(proc_no, nbr, &referred),
                    PatchKind::ProcessorCyclic {
                        my_proc: proc_no,
                        neighbour_proc: nbr,
                        referred_patch: referred,
                        neighbour_patch,
                    },
                )
            }
        };
        log::debug!("processor {proc_no}: patch `{name}` with {} faces", faces.len());
        patches.push(Patch::new(name, kind, face_addr.len(), faces.len()));
        boundary_addr.push(None);
        face_addr.extend_from_slice(faces);
    }

    // Every point used by a retained face, in increasing global order.
    let mut point_addr: Vec<usize> = face_addr
        .iter()
        .flat_map(|a| mesh.faces[a.face].iter().copied())
        .collect();
    point_addr.sort_unstable();
    point_addr.dedup();
    let local_point: HashMap<usize, usize> = point_addr
        .iter()
        .enumerate()
        .map(|(local, &global)| (global, local))
        .collect();

    let n_internal = internal.len();
    let mut faces = Vec::with_capacity(face_addr.len());
    let mut owner = Vec::with_capacity(face_addr.len());
    let mut neighbour = Vec::with_capacity(n_internal);
    for (local, addr) in face_addr.iter().enumerate() {
        let global = &mesh.faces[addr.face];
        let oriented = if addr.flipped {
            reverse_face(global)
        } else {
            global.clone()
        };
        faces.push(oriented.iter().map(|p| local_point[p]).collect::<Vec<_>>());
        if local < n_internal {
            owner.push(local_cell[mesh.owner[addr.face]]);
            neighbour.push(local_cell[mesh.neighbour[addr.face]]);
        } else if addr.flipped {
            owner.push(local_cell[mesh.neighbour[addr.face]]);
        } else {
            owner.push(local_cell[mesh.owner[addr.face]]);
        }
    }

    let points = point_addr.iter().map(|&p| mesh.points[p]).collect();
    let local_mesh = PolyMesh::with_cells(points, faces, owner, neighbour, patches, cells.len())?;
    let addressing = ProcAddressing {
        point: point_addr,
        face: face_addr,
        cell: cells.to_vec(),
        boundary: boundary_addr,
    };
    crate::debug_invariants!(addressing.validate_invariants(), "decomposed addressing");

    Ok(ProcessorMesh {
        proc_no,
        mesh: local_mesh,
        addressing,
    })
}
