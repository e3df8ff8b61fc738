//! Assemble processor meshes into one global mesh.
//!
//! [`assemble`] merges meshes from their patch correspondences alone: matched
//! points collapse into one global point (union-find over
//! `(mesh, local point)` nodes), cells are numbered processor by processor,
//! and each matched processor face pair becomes one internal face owned by
//! the lower processor's cell. Internal faces are then ordered by owner and
//! neighbour so the result is upper-triangular. Regular patches are merged by
//! name in order of first appearance; faces of split cyclic patches are
//! restored into their cyclic patches, keeping both halves aligned face by
//! face. The merge returns fresh addressing tables from every processor mesh
//! into the assembled one.
//!
//! [`assemble_with_addressing`] places every entity exactly where saved
//! addressing says it belongs and rebuilds the original global mesh.

use crate::mesh_error::{EntityKind, MeshDecomposeError};
use crate::algs::shared_points::SharedPointSet;
use crate::overlap::correspondence::PatchCorrespondence;
use crate::topology::addressing::{FaceAddress, ProcAddressing};
use crate::topology::equivalence::{NodeNumbering, PointEquivalence};
use crate::topology::face::{FaceMatch, Vec3, compare_faces, reverse_face};
use crate::topology::patch::{Patch, PatchKind};
use crate::topology::poly_mesh::PolyMesh;
use hashbrown::HashMap;

/// Assembled global mesh with the addressing of every processor into it.
#[derive(Clone, Debug)]
pub struct AssembledMesh {
    pub mesh: PolyMesh,
    pub addressing: Vec<ProcAddressing>,
}

#[derive(Clone, Copy, Debug)]
struct Source {
    proc_no: usize,
    face: usize,
    flipped: bool,
}

struct InternalFace {
    owner: usize,
    neighbour: usize,
    points: Vec<usize>,
    sources: Vec<Source>,
}

struct BoundaryFace {
    owner: usize,
    points: Vec<usize>,
    source: Source,
}

struct MergedPatch {
    name: String,
    kind: PatchKind,
    faces: Vec<BoundaryFace>,
}

#[derive(Default)]
struct PatchTable {
    patches: Vec<MergedPatch>,
    index: HashMap<String, usize>,
}

impl PatchTable {
    fn slot(&mut self, name: &str, kind: &PatchKind) -> usize {
        if let Some(&i) = self.index.get(name) {
            return i;
        }
        self.patches.push(MergedPatch {
            name: name.to_owned(),
            kind: kind.clone(),
            faces: Vec::new(),
        });
        self.index.insert(name.to_owned(), self.patches.len() - 1);
        self.patches.len() - 1
    }
}

/// Merge processor meshes using their patch correspondences and shared points.
///
/// Mesh `i` is the mesh of processor `i`.
pub fn assemble(
    meshes: &[PolyMesh],
    correspondences: &[PatchCorrespondence],
    shared: &SharedPointSet,
) -> Result<AssembledMesh, MeshDecomposeError> {
    let nodes = NodeNumbering::new(meshes.iter().map(|m| m.n_points()));
    let mut eq = PointEquivalence::with_nodes(nodes.len());
    for corr in correspondences.iter().filter(|c| !c.is_cyclic()) {
        let (a, b) = corr.pair.procs();
        for &(pa, pb) in &corr.points {
            eq.union(nodes.node(a, pa), nodes.node(b, pb));
        }
    }
    for group in shared.groups() {
        let Some((&(m0, p0), rest)) = group.split_first() else {
            continue;
        };
        for &(m, p) in rest {
            if !eq.are_equivalent(nodes.node(m0, p0), nodes.node(m, p)) {
                return Err(MeshDecomposeError::inconsistent(
                    m0,
                    m,
                    format!("shared point {p0} is not matched with point {p}"),
                ));
            }
        }
    }

    // Global points, numbered by first appearance.
    let mut points: Vec<Vec3> = Vec::new();
    let mut global_of_root: HashMap<usize, usize> = HashMap::new();
    let mut point_map: Vec<Vec<usize>> = Vec::with_capacity(meshes.len());
    for (m, mesh) in meshes.iter().enumerate() {
        let mut map = Vec::with_capacity(mesh.n_points());
        for p in 0..mesh.n_points() {
            let root = eq.representative(nodes.node(m, p));
            let g = *global_of_root.entry(root).or_insert_with(|| {
                points.push(mesh.points[p]);
                points.len() - 1
            });
            map.push(g);
        }
        point_map.push(map);
    }
    let map_face = |m: usize, f: usize| -> Vec<usize> {
        meshes[m].faces[f].iter().map(|&p| point_map[m][p]).collect()
    };

    let mut cell_offset = Vec::with_capacity(meshes.len());
    let mut n_cells = 0;
    for mesh in meshes {
        cell_offset.push(n_cells);
        n_cells += mesh.n_cells();
    }

    let mut covered: Vec<Vec<bool>> = meshes.iter().map(|m| vec![false; m.n_faces()]).collect();
    let mut cover = |proc_no: usize, face: usize, other: usize| {
        if std::mem::replace(&mut covered[proc_no][face], true) {
            Err(MeshDecomposeError::inconsistent(
                proc_no,
                other,
                format!("face {face} is matched more than once"),
            ))
        } else {
            Ok(())
        }
    };

    let mut internal = Vec::new();
    for (m, mesh) in meshes.iter().enumerate() {
        for f in 0..mesh.n_internal_faces() {
            internal.push(InternalFace {
                owner: cell_offset[m] + mesh.owner[f],
                neighbour: cell_offset[m] + mesh.neighbour[f],
                points: map_face(m, f),
                sources: vec![Source {
                    proc_no: m,
                    face: f,
                    flipped: false,
                }],
            });
        }
    }
    for corr in correspondences.iter().filter(|c| !c.is_cyclic()) {
        let (a, b) = corr.pair.procs();
        for &(fa, fb) in &corr.faces {
            cover(a, fa, b)?;
            cover(b, fb, a)?;
            let points = map_face(a, fa);
            if compare_faces(&points, &map_face(b, fb)) != FaceMatch::Reversed {
                return Err(MeshDecomposeError::inconsistent(
                    a,
                    b,
                    format!("faces {fa} and {fb} do not merge into one reversed pair"),
                ));
            }
            internal.push(InternalFace {
                owner: cell_offset[a] + meshes[a].owner[fa],
                neighbour: cell_offset[b] + meshes[b].owner[fb],
                points,
                sources: vec![
                    Source {
                        proc_no: a,
                        face: fa,
                        flipped: false,
                    },
                    Source {
                        proc_no: b,
                        face: fb,
                        flipped: true,
                    },
                ],
            });
        }
    }
    internal.sort_by_key(|f| (f.owner, f.neighbour));

    let mut table = PatchTable::default();
    for (m, mesh) in meshes.iter().enumerate() {
        for patch in mesh.patches.iter().filter(|p| !p.is_processor()) {
            let slot = table.slot(&patch.name, &patch.kind);
            if let PatchKind::Cyclic { neighbour_patch } = &patch.kind {
                table.slot(
                    neighbour_patch,
                    &PatchKind::Cyclic {
                        neighbour_patch: patch.name.clone(),
                    },
                );
            }
            for f in patch.range() {
                table.patches[slot].faces.push(BoundaryFace {
                    owner: cell_offset[m] + mesh.owner[f],
                    points: map_face(m, f),
                    source: Source {
                        proc_no: m,
                        face: f,
                        flipped: false,
                    },
                });
            }
        }
    }
    for corr in correspondences.iter().filter(|c| c.is_cyclic()) {
        let (a, b) = corr.pair.procs();
        let referred = |side: usize, patch: usize| {
            meshes[side].patches[patch]
                .kind
                .referred_patch()
                .map(str::to_owned)
                .ok_or_else(|| {
                    MeshDecomposeError::inconsistent(a, b, "cyclic pair on a plain processor patch")
                })
        };
        let (ra, rb) = (referred(a, corr.pair.a.patch)?, referred(b, corr.pair.b.patch)?);
        let slot_a = table.slot(&ra, &PatchKind::Cyclic { neighbour_patch: rb.clone() });
        let slot_b = table.slot(&rb, &PatchKind::Cyclic { neighbour_patch: ra.clone() });
        for &(fa, fb) in &corr.faces {
            cover(a, fa, b)?;
            cover(b, fb, a)?;
            for (slot, proc_no, face) in [(slot_a, a, fa), (slot_b, b, fb)] {
                table.patches[slot].faces.push(BoundaryFace {
                    owner: cell_offset[proc_no] + meshes[proc_no].owner[face],
                    points: map_face(proc_no, face),
                    source: Source {
                        proc_no,
                        face,
                        flipped: false,
                    },
                });
            }
        }
    }
    drop(cover);
    for (m, mesh) in meshes.iter().enumerate() {
        for patch in mesh.patches.iter().filter(|p| p.is_processor()) {
            if let Some(f) = patch.range().find(|&f| !covered[m][f]) {
                let nbr = patch.kind.processor_pair().map_or(m, |(_, n)| n);
                return Err(MeshDecomposeError::inconsistent(
                    m,
                    nbr,
                    format!("face {f} of `{}` has no counterpart", patch.name),
                ));
            }
        }
    }

    let mut face_addr: Vec<Vec<Option<FaceAddress>>> =
        meshes.iter().map(|m| vec![None; m.n_faces()]).collect();
    let mut faces = Vec::new();
    let mut owner = Vec::new();
    let mut neighbour = Vec::with_capacity(internal.len());
    for face in internal {
        for s in &face.sources {
            face_addr[s.proc_no][s.face] = Some(FaceAddress::new(faces.len(), s.flipped));
        }
        faces.push(face.points);
        owner.push(face.owner);
        neighbour.push(face.neighbour);
    }
    let mut patches = Vec::with_capacity(table.patches.len());
    for mp in table.patches {
        let start = faces.len();
        for bf in mp.faces {
            face_addr[bf.source.proc_no][bf.source.face] = Some(FaceAddress::forward(faces.len()));
            faces.push(bf.points);
            owner.push(bf.owner);
        }
        patches.push(Patch::new(mp.name, mp.kind, start, faces.len() - start));
    }

    let mut addressing = Vec::with_capacity(meshes.len());
    for (m, (mesh, (addr, points))) in meshes
        .iter()
        .zip(face_addr.into_iter().zip(point_map))
        .enumerate()
    {
        let face = addr
            .into_iter()
            .enumerate()
            .map(|(f, a)| {
                a.ok_or_else(|| MeshDecomposeError::AddressingGap {
                    kind: EntityKind::Face,
                    index: f,
                    context: format!(" (local face of processor {m})"),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let boundary = mesh
            .patches
            .iter()
            .map(|p| {
                if p.is_processor() {
                    None
                } else {
                    table.index.get(&p.name).copied()
                }
            })
            .collect();
        addressing.push(ProcAddressing {
            point: points,
            face,
            cell: (0..mesh.n_cells()).map(|c| cell_offset[m] + c).collect(),
            boundary,
        });
    }

    let mesh = PolyMesh::with_cells(points, faces, owner, neighbour, patches, n_cells)?;
    log::info!(
        "assembled {} processor meshes: {} cells, {} faces ({} internal), {} points, {} patches",
        meshes.len(),
        mesh.n_cells(),
        mesh.n_faces(),
        mesh.n_internal_faces(),
        mesh.n_points(),
        mesh.patches.len()
    );
    Ok(AssembledMesh { mesh, addressing })
}

/// Number of global entities implied by the largest address.
fn extent(addresses: impl Iterator<Item = usize>) -> usize {
    addresses.max().map_or(0, |g| g + 1)
}

#[derive(Clone, Default)]
struct PlacedFace {
    points: Option<Vec<usize>>,
    owner: Option<(usize, usize)>,
    neighbour: Option<(usize, usize)>,
    patch: Option<PatchRef>,
}

#[derive(Clone)]
enum PatchRef {
    Index(usize),
    Referred(String),
}

/// First global face of every patch known by index.
fn first_faces(placed: &[PlacedFace], n_patches: usize) -> Vec<Option<usize>> {
    let mut first = vec![None; n_patches];
    for (g, face) in placed.iter().enumerate() {
        if let Some(PatchRef::Index(b)) = face.patch {
            if let Some(slot) = first.get_mut(b) {
                slot.get_or_insert(g);
            }
        }
    }
    first
}

/// Give back their global slots to cyclic patches that were dropped as empty
/// on every processor, so that all their faces sit on processor-cyclic
/// patches. The slots are the unclaimed patch indices; each restored patch
/// goes to the first free slot consistent with the face order of the patches
/// around it.
fn restore_cyclic_patches(
    meshes: &[PolyMesh],
    placed: &[PlacedFace],
    patch_info: &mut Vec<Option<(String, PatchKind)>>,
) -> Result<(), MeshDecomposeError> {
    let known: Vec<&str> = patch_info.iter().flatten().map(|(n, _)| n.as_str()).collect();
    let mut missing: HashMap<&str, usize> = HashMap::new();
    for (g, face) in placed.iter().enumerate() {
        if let Some(PatchRef::Referred(name)) = &face.patch {
            if !known.contains(&name.as_str()) {
                missing.entry(name.as_str()).or_insert(g);
            }
        }
    }
    if missing.is_empty() {
        return Ok(());
    }
    let mut missing: Vec<(usize, &str)> = missing.into_iter().map(|(n, g)| (g, n)).collect();
    missing.sort_unstable();

    let partner_of = |name: &str| {
        meshes
            .iter()
            .flat_map(|m| m.patches.iter())
            .find_map(|p| match &p.kind {
                PatchKind::ProcessorCyclic {
                    referred_patch,
                    neighbour_patch,
                    ..
                } if referred_patch == name && !neighbour_patch.is_empty() => {
                    Some(neighbour_patch.clone())
                }
                _ => None,
            })
    };
    let first = first_faces(placed, patch_info.len());
    let mut next_slot = 0;
    for (start, name) in missing {
        let fits = |g: usize| {
            patch_info[g].is_none()
                && first[..g].iter().flatten().all(|&f| f < start)
                && first[g + 1..].iter().flatten().all(|&f| f > start)
        };
        let slot = match (next_slot..patch_info.len()).find(|&g| fits(g)) {
            Some(g) => g,
            // Trailing patches have no index left in the saved tables.
            None if first.iter().flatten().all(|&f| f < start) => {
                patch_info.push(None);
                patch_info.len() - 1
            }
            None => {
                return Err(MeshDecomposeError::AddressingGap {
                    kind: EntityKind::Patch,
                    index: start,
                    context: format!(" (no free patch slot for cyclic patch `{name}`)"),
                });
            }
        };
        let neighbour_patch = partner_of(name).ok_or_else(|| MeshDecomposeError::AddressingGap {
            kind: EntityKind::Patch,
            index: slot,
            context: format!(" (cyclic patch `{name}` has no recorded partner)"),
        })?;
        log::debug!("restoring cyclic patch `{name}` as global patch {slot}");
        patch_info[slot] = Some((name.to_owned(), PatchKind::Cyclic { neighbour_patch }));
        next_slot = slot + 1;
    }
    Ok(())
}

/// Rebuild the global mesh by placing every entity at its saved address.
///
/// Any global entity left without a contribution is an
/// [`MeshDecomposeError::AddressingGap`]; a cell or face side claimed twice
/// is an [`MeshDecomposeError::AddressingOverlap`].
pub fn assemble_with_addressing(
    meshes: &[PolyMesh],
    addressing: &[ProcAddressing],
) -> Result<AssembledMesh, MeshDecomposeError> {
    if meshes.len() != addressing.len() {
        return Err(MeshDecomposeError::InvalidAddressing {
            proc_no: meshes.len().min(addressing.len()),
            reason: format!(
                "{} addressing sets for {} meshes",
                addressing.len(),
                meshes.len()
            ),
        });
    }
    for (m, (mesh, addr)) in meshes.iter().zip(addressing).enumerate() {
        addr.check_against(m, mesh, None)?;
    }
    let n_points = extent(addressing.iter().flat_map(|a| a.point.iter().copied()));
    let n_cells = extent(addressing.iter().flat_map(|a| a.cell.iter().copied()));
    let n_faces = extent(addressing.iter().flat_map(|a| a.face.iter().map(|f| f.face)));
    let n_patches = extent(addressing.iter().flat_map(|a| a.boundary.iter().flatten().copied()));

    let mut points: Vec<Option<Vec3>> = vec![None; n_points];
    for (mesh, addr) in meshes.iter().zip(addressing) {
        for (p, &g) in addr.point.iter().enumerate() {
            points[g].get_or_insert(mesh.points[p]);
        }
    }
    let points = points
        .into_iter()
        .enumerate()
        .map(|(g, p)| {
            p.ok_or_else(|| MeshDecomposeError::AddressingGap {
                kind: EntityKind::Point,
                index: g,
                context: String::new(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut cell_src: Vec<Option<usize>> = vec![None; n_cells];
    for (m, addr) in addressing.iter().enumerate() {
        for &g in &addr.cell {
            if let Some(first) = cell_src[g].replace(m) {
                return Err(MeshDecomposeError::AddressingOverlap {
                    kind: EntityKind::Cell,
                    index: g,
                    first,
                    second: m,
                });
            }
        }
    }
    if let Some(g) = cell_src.iter().position(Option::is_none) {
        return Err(MeshDecomposeError::AddressingGap {
            kind: EntityKind::Cell,
            index: g,
            context: String::new(),
        });
    }

    let mut patch_info: Vec<Option<(String, PatchKind)>> = vec![None; n_patches];
    for (mesh, addr) in meshes.iter().zip(addressing) {
        for (patch, b) in mesh.patches.iter().zip(&addr.boundary) {
            if let Some(g) = *b {
                patch_info[g].get_or_insert_with(|| (patch.name.clone(), patch.kind.clone()));
            }
        }
    }

    let mut placed: Vec<PlacedFace> = vec![PlacedFace::default(); n_faces];
    let claim = |slot: &mut Option<(usize, usize)>, value: usize, m: usize, g: usize| {
        match slot.replace((value, m)) {
            Some((_, first)) => Err(MeshDecomposeError::AddressingOverlap {
                kind: EntityKind::Face,
                index: g,
                first,
                second: m,
            }),
            None => Ok(()),
        }
    };
    for (m, (mesh, addr)) in meshes.iter().zip(addressing).enumerate() {
        for (f, fa) in addr.face.iter().enumerate() {
            let g = fa.face;
            let mapped: Vec<usize> = mesh.faces[f].iter().map(|&p| addr.point[p]).collect();
            let global_points = if fa.flipped { reverse_face(&mapped) } else { mapped };
            let cell = addr.cell[mesh.owner[f]];
            let slot = &mut placed[g];
            match &slot.points {
                Some(existing) if compare_faces(existing, &global_points) != FaceMatch::Same => {
                    return Err(MeshDecomposeError::InvalidAddressing {
                        proc_no: m,
                        reason: format!("local face {f} disagrees with global face {g}"),
                    });
                }
                Some(_) => {}
                None => slot.points = Some(global_points),
            }
            if mesh.is_internal_face(f) {
                if fa.flipped {
                    return Err(MeshDecomposeError::InvalidAddressing {
                        proc_no: m,
                        reason: format!("internal face {f} is addressed as flipped"),
                    });
                }
                claim(&mut slot.owner, cell, m, g)?;
                claim(&mut slot.neighbour, addr.cell[mesh.neighbour[f]], m, g)?;
                continue;
            }
            if fa.flipped {
                claim(&mut slot.neighbour, cell, m, g)?;
            } else {
                claim(&mut slot.owner, cell, m, g)?;
            }
            let Some(lp) = mesh.which_patch(f) else {
                continue;
            };
            let patch = &mesh.patches[lp];
            match (addr.boundary[lp], patch.kind.referred_patch()) {
                (Some(b), _) => slot.patch = Some(PatchRef::Index(b)),
                (None, Some(r)) => slot.patch = Some(PatchRef::Referred(r.to_owned())),
                (None, None) => {}
            }
        }
    }

    restore_cyclic_patches(meshes, &placed, &mut patch_info)?;
    let patch_by_name: HashMap<String, usize> = patch_info
        .iter()
        .enumerate()
        .filter_map(|(g, info)| info.as_ref().map(|(name, _)| (name.clone(), g)))
        .collect();

    let mut faces = Vec::with_capacity(n_faces);
    let mut owner = Vec::with_capacity(n_faces);
    let mut neighbour = Vec::new();
    let mut face_patch = Vec::new();
    for (g, face) in placed.into_iter().enumerate() {
        let gap = || MeshDecomposeError::AddressingGap {
            kind: EntityKind::Face,
            index: g,
            context: String::new(),
        };
        faces.push(face.points.ok_or_else(gap)?);
        owner.push(face.owner.ok_or_else(gap)?.0);
        match (face.neighbour, face.patch) {
            (Some((n, _)), _) => {
                if !face_patch.is_empty() {
                    return Err(MeshDecomposeError::InvalidMesh(format!(
                        "internal face {g} follows boundary faces"
                    )));
                }
                neighbour.push(n);
            }
            (None, Some(PatchRef::Index(b))) => face_patch.push(b),
            (None, Some(PatchRef::Referred(name))) => {
                let b = patch_by_name.get(name.as_str()).copied().ok_or_else(|| {
                    MeshDecomposeError::AddressingGap {
                        kind: EntityKind::Patch,
                        index: g,
                        context: format!(" (cyclic patch `{name}` is listed by no processor)"),
                    }
                })?;
                face_patch.push(b);
            }
            (None, None) => {
                return Err(MeshDecomposeError::AddressingGap {
                    kind: EntityKind::Face,
                    index: g,
                    context: " (internal face seen from one side only)".into(),
                });
            }
        }
    }
    if let Some(w) = face_patch.windows(2).find(|w| w[0] > w[1]) {
        return Err(MeshDecomposeError::InvalidMesh(format!(
            "boundary faces of patch {} follow faces of patch {}",
            w[1], w[0]
        )));
    }

    let mut patches = Vec::with_capacity(n_patches);
    let mut start = neighbour.len();
    for (g, info) in patch_info.into_iter().enumerate() {
        let (name, kind) = info.ok_or_else(|| MeshDecomposeError::AddressingGap {
            kind: EntityKind::Patch,
            index: g,
            context: String::new(),
        })?;
        let size = face_patch.iter().filter(|&&b| b == g).count();
        patches.push(Patch::new(name, kind, start, size));
        start += size;
    }

    let mesh = PolyMesh::with_cells(points, faces, owner, neighbour, patches, n_cells)?;
    log::info!(
        "reassembled {} processor meshes from addressing: {} cells, {} faces, {} points",
        meshes.len(),
        mesh.n_cells(),
        mesh.n_faces(),
        mesh.n_points()
    );
    Ok(AssembledMesh {
        mesh,
        addressing: addressing.to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algs::decompose::{DecomposeOptions, decompose_mesh};
    use crate::algs::meshgen::{BlockSpec, hex_block};
    use crate::algs::patch_match::match_processor_patches;
    use crate::algs::shared_points::resolve_shared_points;

    fn pieces(spec: BlockSpec, labels: &[usize], n: usize) -> (PolyMesh, Vec<PolyMesh>, Vec<ProcAddressing>) {
        let mesh = hex_block(&spec).unwrap();
        let dec = decompose_mesh(&mesh, labels, n, &DecomposeOptions::default()).unwrap();
        let (meshes, addr) = dec
            .processors
            .into_iter()
            .map(|p| (p.mesh, p.addressing))
            .unzip();
        (mesh, meshes, addr)
    }

    #[test]
    fn addressing_rebuilds_the_exact_mesh() {
        let (mesh, meshes, addr) = pieces(BlockSpec::new(3, 2, 2), &[0, 1, 2, 1, 0, 2, 2, 0, 1, 1, 0, 2], 3);
        let rebuilt = assemble_with_addressing(&meshes, &addr).unwrap();
        assert_eq!(rebuilt.mesh, mesh);
    }

    #[test]
    fn addressing_rebuilds_cyclic_mesh() {
        let (mesh, meshes, addr) = pieces(BlockSpec::new(4, 2, 1).with_cyclic_x(), &[0, 0, 1, 1, 1, 0, 0, 1], 2);
        let rebuilt = assemble_with_addressing(&meshes, &addr).unwrap();
        assert_eq!(rebuilt.mesh, mesh);
    }

    #[test]
    fn duplicate_cell_is_an_overlap() {
        let (_, meshes, mut addr) = pieces(BlockSpec::new(2, 1, 1), &[0, 1], 2);
        addr[1].cell[0] = 0;
        let err = assemble_with_addressing(&meshes, &addr).unwrap_err();
        assert!(matches!(
            err,
            MeshDecomposeError::AddressingOverlap {
                kind: EntityKind::Cell,
                index: 0,
                ..
            }
        ));
    }

    #[test]
    fn merge_without_addressing_conserves_counts() {
        let (mesh, meshes, _) = pieces(BlockSpec::new(2, 2, 2), &[0, 1, 2, 3, 3, 2, 1, 0], 4);
        let corr = match_processor_patches(&meshes, None, 1e-4).unwrap();
        let shared = resolve_shared_points(&meshes, &corr).unwrap();
        let merged = assemble(&meshes, &corr, &shared).unwrap();
        assert_eq!(merged.mesh.n_cells(), mesh.n_cells());
        assert_eq!(merged.mesh.n_points(), mesh.n_points());
        assert_eq!(merged.mesh.n_faces(), mesh.n_faces());
        assert_eq!(merged.mesh.n_internal_faces(), mesh.n_internal_faces());
        for (name, size) in mesh.patches.iter().map(|p| (&p.name, p.size)) {
            let idx = merged.mesh.find_patch(name).unwrap();
            assert_eq!(merged.mesh.patches[idx].size, size);
        }
        assert!(merged.mesh.patches.iter().all(|p| !p.is_processor()));
    }
}
