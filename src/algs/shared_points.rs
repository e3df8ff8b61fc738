//! Points shared by three or more processors.
//!
//! A point on a processor patch is identified with its partner across every
//! processor-patch pair it lies on. Points where several interfaces meet
//! (block corners, edges of a 2×2 split) end up with copies on more than two
//! processors; those copies must merge into one global point even though no
//! single pair sees them all.
//!
//! The resolver runs a min-label propagation over `(mesh, local point)` nodes:
//! every node starts with its own label and each sweep pushes the smaller
//! label across every matched point pair until nothing changes. Nodes with
//! equal labels form one group; groups spanning at least three processors
//! receive a canonical shared-point index in order of first appearance.

use crate::mesh_error::MeshDecomposeError;
use crate::overlap::correspondence::PatchCorrespondence;
use crate::topology::equivalence::NodeNumbering;
use crate::topology::poly_mesh::PolyMesh;
use hashbrown::HashMap;

/// Shared points of one processor mesh.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MeshSharedPoints {
    /// Local labels of this mesh's shared points, increasing.
    pub local_points: Vec<usize>,
    /// Canonical shared index of each entry of `local_points`.
    pub shared_index: Vec<usize>,
}

impl MeshSharedPoints {
    pub fn len(&self) -> usize {
        self.local_points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.local_points.is_empty()
    }
}

/// Shared points of every processor mesh, in processor order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SharedPointSet {
    pub n_shared: usize,
    pub per_mesh: Vec<MeshSharedPoints>,
}

impl SharedPointSet {
    /// Canonical shared index of local point `point` of mesh `mesh`.
    pub fn shared_index(&self, mesh: usize, point: usize) -> Option<usize> {
        let m = self.per_mesh.get(mesh)?;
        m.local_points
            .binary_search(&point)
            .ok()
            .map(|i| m.shared_index[i])
    }

    /// Members `(mesh, local point)` of every shared point.
    pub fn groups(&self) -> Vec<Vec<(usize, usize)>> {
        let mut out = vec![Vec::new(); self.n_shared];
        for (m, sp) in self.per_mesh.iter().enumerate() {
            for (&p, &s) in sp.local_points.iter().zip(&sp.shared_index) {
                out[s].push((m, p));
            }
        }
        out
    }
}

/// Resolve the points shared by three or more processors.
pub fn resolve_shared_points(
    meshes: &[PolyMesh],
    correspondences: &[PatchCorrespondence],
) -> Result<SharedPointSet, MeshDecomposeError> {
    let nodes = NodeNumbering::new(meshes.iter().map(|m| m.n_points()));
    let edges: Vec<(usize, usize)> = correspondences
        .iter()
        .filter(|c| !c.is_cyclic())
        .flat_map(|c| {
            let (a, b) = c.pair.procs();
            let nodes = &nodes;
            c.points
                .iter()
                .map(move |&(pa, pb)| (nodes.node(a, pa), nodes.node(b, pb)))
        })
        .collect();

    // Only nodes touched by a point pair take part.
    let mut label: HashMap<usize, usize> = HashMap::with_capacity(edges.len() * 2);
    for &(u, v) in &edges {
        label.insert(u, u);
        label.insert(v, v);
    }

    let max_sweeps = label.len() + 1;
    let mut sweeps = 0;
    loop {
        sweeps += 1;
        if sweeps > max_sweeps {
            return Err(MeshDecomposeError::NonConvergent {
                sweeps: sweeps - 1,
                nodes: label.len(),
            });
        }
        let mut changed = false;
        for &(u, v) in &edges {
            let (lu, lv) = (label[&u], label[&v]);
            if lu != lv {
                let low = lu.min(lv);
                label.insert(u, low);
                label.insert(v, low);
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }
    log::debug!(
        "shared-point propagation settled after {sweeps} sweeps over {} nodes",
        label.len()
    );

    // Processors spanned by each group.
    let mut spans: HashMap<usize, Vec<usize>> = HashMap::new();
    for (&node, &l) in &label {
        let (mesh, _) = nodes.split(node);
        let procs = spans.entry(l).or_default();
        if !procs.contains(&mesh) {
            procs.push(mesh);
        }
    }

    let mut members: Vec<usize> = label.keys().copied().collect();
    members.sort_unstable();
    let mut canonical: HashMap<usize, usize> = HashMap::new();
    let mut per_mesh = vec![MeshSharedPoints::default(); meshes.len()];
    for node in members {
        let l = label[&node];
        if spans[&l].len() < 3 {
            continue;
        }
        let next = canonical.len();
        let idx = *canonical.entry(l).or_insert(next);
        let (mesh, point) = nodes.split(node);
        per_mesh[mesh].local_points.push(point);
        per_mesh[mesh].shared_index.push(idx);
    }
    let set = SharedPointSet {
        n_shared: canonical.len(),
        per_mesh,
    };
    log::info!("{} points are shared by three or more processors", set.n_shared);
    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algs::decompose::{DecomposeOptions, decompose_mesh};
    use crate::algs::meshgen::{BlockSpec, hex_block};
    use crate::algs::patch_match::match_processor_patches;

    #[test]
    fn four_way_split_shares_the_centre_line() {
        // 2×2×1 block, one cell per processor: the two points on the central
        // vertical edge are seen by all four processors.
        let mesh = hex_block(&BlockSpec::new(2, 2, 1)).unwrap();
        let dec = decompose_mesh(&mesh, &[0, 1, 2, 3], 4, &DecomposeOptions::default()).unwrap();
        let meshes: Vec<PolyMesh> = dec.processors.iter().map(|p| p.mesh.clone()).collect();
        let corr = match_processor_patches(&meshes, None, 1e-4).unwrap();
        let shared = resolve_shared_points(&meshes, &corr).unwrap();
        assert_eq!(shared.n_shared, 2);
        for (m, sp) in shared.per_mesh.iter().enumerate() {
            assert_eq!(sp.len(), 2, "processor {m}");
        }
        for group in shared.groups() {
            let global: Vec<usize> = group
                .iter()
                .map(|&(m, p)| dec.processors[m].addressing.point[p])
                .collect();
            assert_eq!(group.len(), 4);
            assert!(global.windows(2).all(|w| w[0] == w[1]));
        }
    }

    #[test]
    fn two_way_split_has_no_shared_points() {
        let mesh = hex_block(&BlockSpec::new(4, 1, 1)).unwrap();
        let dec = decompose_mesh(&mesh, &[0, 0, 1, 1], 2, &DecomposeOptions::default()).unwrap();
        let meshes: Vec<PolyMesh> = dec.processors.iter().map(|p| p.mesh.clone()).collect();
        let corr = match_processor_patches(&meshes, None, 1e-4).unwrap();
        let shared = resolve_shared_points(&meshes, &corr).unwrap();
        assert_eq!(shared.n_shared, 0);
        assert_eq!(shared.shared_index(0, 0), None);
    }
}
