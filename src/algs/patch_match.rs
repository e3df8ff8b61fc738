//! Pair up processor patches across processor meshes and match their faces
//! and points.
//!
//! Each interface between processors `a < b` appears once as a
//! [`PatchPair`]. Faces are matched either exactly, through saved addressing
//! tables, or topologically: faces are taken in patch order on both sides and
//! each face's points are aligned geometrically, anchored on the face's first
//! point. Processor-cyclic pairs only produce face pairs; their faces are two
//! halves of a periodic interface and do not share points.

use crate::mesh_error::MeshDecomposeError;
use crate::overlap::correspondence::{PatchCorrespondence, PatchPair, PatchSide};
use crate::topology::addressing::ProcAddressing;
use crate::topology::face::{Vec3, distance, dot, mag, min_edge_length};
use crate::topology::patch::PatchKind;
use crate::topology::poly_mesh::PolyMesh;
use hashbrown::HashMap;

/// Find every processor-patch pair. Mesh `i` must be the mesh of processor `i`.
pub fn find_patch_pairs(meshes: &[PolyMesh]) -> Result<Vec<PatchPair>, MeshDecomposeError> {
    let n_procs = meshes.len();
    let mut used: Vec<Vec<bool>> = meshes.iter().map(|m| vec![false; m.patches.len()]).collect();
    let mut pairs = Vec::new();

    for (a, mesh_a) in meshes.iter().enumerate() {
        for (ia, patch) in mesh_a.patches.iter().enumerate() {
            let Some((my, b)) = patch.kind.processor_pair() else {
                continue;
            };
            if my != a {
                return Err(MeshDecomposeError::inconsistent(
                    a,
                    b,
                    format!("patch `{}` claims to belong to processor {my}", patch.name),
                ));
            }
            if b >= n_procs {
                return Err(MeshDecomposeError::inconsistent(
                    a,
                    b,
                    format!(
                        "patch `{}` refers to a processor outside 0..{n_procs}",
                        patch.name
                    ),
                ));
            }
            if b < a {
                continue;
            }
            let referred = patch.kind.referred_patch();
            let ib = match referred {
                None => meshes[b].patches.iter().position(|p| {
                    matches!(p.kind, PatchKind::Processor { my_proc, neighbour_proc }
                        if my_proc == b && neighbour_proc == a)
                }),
                Some(r) => {
                    let partner = patch
                        .kind
                        .referred_partner()
                        .or_else(|| cyclic_partner_name(meshes, r));
                    find_cyclic_counterpart(meshes, a, b, r, partner, patch.size, &used[b])
                }
            }
            .ok_or_else(|| {
                MeshDecomposeError::inconsistent(
                    a,
                    b,
                    format!("patch `{}` has no counterpart on processor {b}", patch.name),
                )
            })?;
            if used[b][ib] {
                return Err(MeshDecomposeError::inconsistent(
                    a,
                    b,
                    format!(
                        "patch `{}` on processor {b} is claimed twice",
                        meshes[b].patches[ib].name
                    ),
                ));
            }
            used[a][ia] = true;
            used[b][ib] = true;
            pairs.push(PatchPair {
                a: PatchSide::new(a, ia),
                b: PatchSide::new(b, ib),
                cyclic: referred.is_some(),
            });
        }
    }

    for (p, mesh) in meshes.iter().enumerate() {
        for (i, patch) in mesh.patches.iter().enumerate() {
            if let Some((_, nbr)) = patch.kind.processor_pair() {
                if !used[p][i] {
                    return Err(MeshDecomposeError::inconsistent(
                        p,
                        nbr,
                        format!("patch `{}` is not paired", patch.name),
                    ));
                }
            }
        }
    }
    Ok(pairs)
}

/// Neighbour patch of the cyclic patch `name`, looked up on any processor
/// that still carries it. Used for processor-cyclic patches that do not
/// record their partner.
fn cyclic_partner_name<'m>(meshes: &'m [PolyMesh], name: &str) -> Option<&'m str> {
    meshes
        .iter()
        .flat_map(|m| m.patches.iter())
        .find_map(|p| match &p.kind {
            PatchKind::Cyclic { neighbour_patch } if p.name == name => Some(neighbour_patch.as_str()),
            _ => None,
        })
}

/// Processor-cyclic patch of processor `b` facing `a` whose referred patch
/// is `partner`, the cyclic partner of `referred`. Without a known partner
/// the counterpart must be the only unused one of equal size.
fn find_cyclic_counterpart(
    meshes: &[PolyMesh],
    a: usize,
    b: usize,
    referred: &str,
    partner: Option<&str>,
    size: usize,
    used: &[bool],
) -> Option<usize> {
    let candidates: Vec<usize> = meshes[b]
        .patches
        .iter()
        .enumerate()
        .filter(|&(i, p)| {
            !used[i]
                && match &p.kind {
                    PatchKind::ProcessorCyclic {
                        my_proc,
                        neighbour_proc,
                        referred_patch,
                        neighbour_patch,
                    } => {
                        *my_proc == b
                            && *neighbour_proc == a
                            && (neighbour_patch.is_empty() || neighbour_patch == referred)
                            && match partner {
                                Some(name) => referred_patch == name,
                                None => p.size == size,
                            }
                    }
                    _ => false,
                }
        })
        .map(|(i, _)| i)
        .collect();
    match candidates.as_slice() {
        [only] => Some(*only),
        _ => None,
    }
}

fn check_sizes(meshes: &[PolyMesh], pair: &PatchPair) -> Result<(), MeshDecomposeError> {
    let (a, b) = pair.procs();
    let pa = &meshes[a].patches[pair.a.patch];
    let pb = &meshes[b].patches[pair.b.patch];
    if pa.size != pb.size {
        return Err(MeshDecomposeError::inconsistent(
            a,
            b,
            format!(
                "patch `{}` has {} faces but `{}` has {}",
                pa.name, pa.size, pb.name, pb.size
            ),
        ));
    }
    Ok(())
}

/// Match a pair exactly through the saved addressing tables of both sides.
pub fn match_by_addressing(
    meshes: &[PolyMesh],
    addressing: &[ProcAddressing],
    pair: &PatchPair,
) -> Result<PatchCorrespondence, MeshDecomposeError> {
    check_sizes(meshes, pair)?;
    let (a, b) = pair.procs();
    let (addr_a, addr_b) = (&addressing[a], &addressing[b]);
    let pa = &meshes[a].patches[pair.a.patch];
    let pb = &meshes[b].patches[pair.b.patch];

    let mut faces = Vec::with_capacity(pa.size);
    for (fa, fb) in pa.range().zip(pb.range()) {
        let (ga, gb) = (addr_a.face[fa], addr_b.face[fb]);
        let consistent = if pair.cyclic {
            !ga.flipped && !gb.flipped && ga.face != gb.face
        } else {
            ga.face == gb.face && ga.flipped != gb.flipped
        };
        if !consistent {
            return Err(MeshDecomposeError::inconsistent(
                a,
                b,
                format!(
                    "face {} of `{}` addresses {ga:?} but its counterpart addresses {gb:?}",
                    fa - pa.start,
                    pa.name
                ),
            ));
        }
        faces.push((fa, fb));
    }

    let mut points = Vec::new();
    if !pair.cyclic {
        let on_b: HashMap<usize, usize> = meshes[b]
            .patch_points(pair.b.patch)
            .into_iter()
            .map(|p| (addr_b.point[p], p))
            .collect();
        for p in meshes[a].patch_points(pair.a.patch) {
            let global = addr_a.point[p];
            let q = on_b.get(&global).ok_or_else(|| {
                MeshDecomposeError::inconsistent(
                    a,
                    b,
                    format!("global point {global} of `{}` is missing on the other side", pa.name),
                )
            })?;
            points.push((p, *q));
        }
    }
    Ok(PatchCorrespondence {
        pair: pair.clone(),
        faces,
        points,
    })
}

/// Index map `i -> j` such that point `i` of face `a` coincides with point
/// `j` of face `b`, trying the reflected order first.
fn align_face(pa: &[Vec3], a: &[usize], pb: &[Vec3], b: &[usize], eps: f64) -> Option<Vec<usize>> {
    let n = a.len();
    let close = |i: usize, j: usize| distance(pa[a[i]], pb[b[j]]) <= eps;
    for start in (0..n).filter(|&j| close(0, j)) {
        let reflected: Vec<usize> = (0..n).map(|i| (start + n - i) % n).collect();
        if reflected.iter().enumerate().all(|(i, &j)| close(i, j)) {
            return Some(reflected);
        }
        let rotated: Vec<usize> = (0..n).map(|i| (start + i) % n).collect();
        if rotated.iter().enumerate().all(|(i, &j)| close(i, j)) {
            return Some(rotated);
        }
    }
    None
}

/// Match a pair from the meshes alone.
///
/// Faces are paired in patch order. Every pair must agree on vertex count
/// and, within `tolerance` relative to the larger face, on area. For plain
/// processor pairs the faces must also face opposite ways and their points
/// must coincide within `tolerance` times the shortest edge.
pub fn match_topological(
    meshes: &[PolyMesh],
    pair: &PatchPair,
    tolerance: f64,
) -> Result<PatchCorrespondence, MeshDecomposeError> {
    check_sizes(meshes, pair)?;
    let (a, b) = pair.procs();
    let (mesh_a, mesh_b) = (&meshes[a], &meshes[b]);
    let pa = &mesh_a.patches[pair.a.patch];
    let pb = &mesh_b.patches[pair.b.patch];

    let mut faces = Vec::with_capacity(pa.size);
    let mut points = Vec::new();
    let mut point_map: HashMap<usize, usize> = HashMap::new();
    for (k, (fa, fb)) in pa.range().zip(pb.range()).enumerate() {
        let (face_a, face_b) = (&mesh_a.faces[fa], &mesh_b.faces[fb]);
        if face_a.len() != face_b.len() {
            return Err(MeshDecomposeError::inconsistent(
                a,
                b,
                format!(
                    "face {k} of `{}` has {} points, its counterpart has {}",
                    pa.name,
                    face_a.len(),
                    face_b.len()
                ),
            ));
        }
        let (sa, sb) = (mesh_a.face_area_vector(fa), mesh_b.face_area_vector(fb));
        let (ma, mb) = (mag(sa), mag(sb));
        if (ma - mb).abs() > tolerance * ma.max(mb) {
            return Err(MeshDecomposeError::inconsistent(
                a,
                b,
                format!("face {k} of `{}` has area {ma}, its counterpart {mb}", pa.name),
            ));
        }
        faces.push((fa, fb));
        if pair.cyclic {
            continue;
        }
        if dot(sa, sb) > 0.0 {
            return Err(MeshDecomposeError::inconsistent(
                a,
                b,
                format!("face {k} of `{}` has the same orientation on both sides", pa.name),
            ));
        }
        let eps = tolerance * min_edge_length(&mesh_a.points, face_a);
        let order = align_face(&mesh_a.points, face_a, &mesh_b.points, face_b, eps).ok_or_else(|| {
            MeshDecomposeError::inconsistent(
                a,
                b,
                format!("points of face {k} of `{}` do not coincide", pa.name),
            )
        })?;
        for (i, j) in order.into_iter().enumerate() {
            let (p, q) = (face_a[i], face_b[j]);
            match point_map.get(&p) {
                Some(&prev) if prev != q => {
                    return Err(MeshDecomposeError::inconsistent(
                        a,
                        b,
                        format!("point {p} of `{}` matches points {prev} and {q}", pa.name),
                    ));
                }
                Some(_) => {}
                None => {
                    point_map.insert(p, q);
                    points.push((p, q));
                }
            }
        }
    }
    Ok(PatchCorrespondence {
        pair: pair.clone(),
        faces,
        points,
    })
}

/// Pair every processor patch and match it, through `addressing` when given.
pub fn match_processor_patches(
    meshes: &[PolyMesh],
    addressing: Option<&[ProcAddressing]>,
    tolerance: f64,
) -> Result<Vec<PatchCorrespondence>, MeshDecomposeError> {
    if let Some(addr) = addressing {
        if addr.len() != meshes.len() {
            return Err(MeshDecomposeError::InvalidAddressing {
                proc_no: addr.len().min(meshes.len()),
                reason: format!("{} addressing sets for {} meshes", addr.len(), meshes.len()),
            });
        }
    }
    let pairs = find_patch_pairs(meshes)?;
    let mut out = Vec::with_capacity(pairs.len());
    for pair in &pairs {
        let corr = match addressing {
            Some(addr) => match_by_addressing(meshes, addr, pair)?,
            None => match_topological(meshes, pair, tolerance)?,
        };
        log::debug!(
            "matched `{}` on processor {} with `{}` on processor {}: {} faces, {} points",
            meshes[pair.a.proc_no].patches[pair.a.patch].name,
            pair.a.proc_no,
            meshes[pair.b.proc_no].patches[pair.b.patch].name,
            pair.b.proc_no,
            corr.faces.len(),
            corr.points.len()
        );
        out.push(corr);
    }
    Ok(out)
}
