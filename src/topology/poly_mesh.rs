//! `PolyMesh`: face-based polyhedral mesh description.
//!
//! Cells are implicit: every face names an owner cell and, for the first
//! `n_internal_faces()` faces, a neighbour cell. The remaining faces are
//! boundary faces, split into contiguous [`Patch`] ranges in order.
//!
//! The same structure describes area meshes, where the "cells" are surface
//! faces and the "faces" are their two-point edges.

use crate::debug_invariants::DebugInvariants;
use crate::mesh_error::MeshDecomposeError;
use crate::topology::face::{self, Vec3};
use crate::topology::patch::Patch;

#[derive(Clone, Debug, PartialEq)]
pub struct PolyMesh {
    pub points: Vec<Vec3>,
    pub faces: Vec<Vec<usize>>,
    pub owner: Vec<usize>,
    pub neighbour: Vec<usize>,
    pub patches: Vec<Patch>,
    n_cells: usize,
}

impl PolyMesh {
    /// Build and validate a mesh. The cell count is inferred from the
    /// owner/neighbour lists.
    pub fn new(
        points: Vec<Vec3>,
        faces: Vec<Vec<usize>>,
        owner: Vec<usize>,
        neighbour: Vec<usize>,
        patches: Vec<Patch>,
    ) -> Result<Self, MeshDecomposeError> {
        let n_cells = owner
            .iter()
            .chain(neighbour.iter())
            .copied()
            .max()
            .map_or(0, |c| c + 1);
        Self::with_cells(points, faces, owner, neighbour, patches, n_cells)
    }

    /// Build and validate a mesh with an explicit cell count.
    pub fn with_cells(
        points: Vec<Vec3>,
        faces: Vec<Vec<usize>>,
        owner: Vec<usize>,
        neighbour: Vec<usize>,
        patches: Vec<Patch>,
        n_cells: usize,
    ) -> Result<Self, MeshDecomposeError> {
        let mesh = Self {
            points,
            faces,
            owner,
            neighbour,
            patches,
            n_cells,
        };
        mesh.validate_invariants()?;
        Ok(mesh)
    }

    pub fn n_points(&self) -> usize {
        self.points.len()
    }

    pub fn n_faces(&self) -> usize {
        self.faces.len()
    }

    pub fn n_internal_faces(&self) -> usize {
        self.neighbour.len()
    }

    pub fn n_cells(&self) -> usize {
        self.n_cells
    }

    pub fn is_internal_face(&self, face: usize) -> bool {
        face < self.neighbour.len()
    }

    /// Index of the patch containing boundary face `face`.
    pub fn which_patch(&self, face: usize) -> Option<usize> {
        if self.is_internal_face(face) {
            return None;
        }
        // Patches are contiguous and sorted by start.
        let idx = self.patches.partition_point(|p| p.start + p.size <= face);
        self.patches
            .get(idx)
            .filter(|p| p.range().contains(&face))
            .map(|_| idx)
    }

    /// Index of the patch called `name`.
    pub fn find_patch(&self, name: &str) -> Option<usize> {
        self.patches.iter().position(|p| p.name == name)
    }

    /// Distinct points of a patch, in order of first appearance.
    pub fn patch_points(&self, patch: usize) -> Vec<usize> {
        let mut seen = hashbrown::HashSet::new();
        let mut out = Vec::new();
        for f in self.patches[patch].range() {
            for &p in &self.faces[f] {
                if seen.insert(p) {
                    out.push(p);
                }
            }
        }
        out
    }

    pub fn face_centre(&self, face: usize) -> Vec3 {
        face::face_centre(&self.points, &self.faces[face])
    }

    pub fn face_area_vector(&self, face: usize) -> Vec3 {
        face::face_area_vector(&self.points, &self.faces[face])
    }

    /// Approximate cell centres: area-weighted mean of the cell's face centres.
    pub fn cell_centres(&self) -> Vec<Vec3> {
        let mut sum = vec![[0.0; 3]; self.n_cells];
        let mut weight = vec![0.0; self.n_cells];
        let mut accumulate = |cell: usize, c: Vec3, w: f64| {
            sum[cell] = face::add(sum[cell], face::scale(c, w));
            weight[cell] += w;
        };
        for f in 0..self.n_faces() {
            let c = self.face_centre(f);
            let w = face::mag(self.face_area_vector(f)).max(f64::MIN_POSITIVE);
            accumulate(self.owner[f], c, w);
            if let Some(&n) = self.neighbour.get(f) {
                accumulate(n, c, w);
            }
        }
        sum.into_iter()
            .zip(weight)
            .map(|(s, w)| if w > 0.0 { face::scale(s, 1.0 / w) } else { s })
            .collect()
    }

    /// Check the upper-triangular ordering rule: `neighbour > owner` on every
    /// internal face.
    pub fn check_upper_triangular(&self) -> Result<(), MeshDecomposeError> {
        for (f, (&o, &n)) in self.owner.iter().zip(self.neighbour.iter()).enumerate() {
            if n <= o {
                return Err(MeshDecomposeError::InvalidMesh(format!(
                    "internal face {f} has owner {o} >= neighbour {n}"
                )));
            }
        }
        Ok(())
    }
}

impl DebugInvariants for PolyMesh {
    fn validate_invariants(&self) -> Result<(), MeshDecomposeError> {
        let n_faces = self.faces.len();
        if self.owner.len() != n_faces {
            return Err(MeshDecomposeError::InvalidMesh(format!(
                "owner list has {} entries for {n_faces} faces",
                self.owner.len()
            )));
        }
        if self.neighbour.len() > n_faces {
            return Err(MeshDecomposeError::InvalidMesh(format!(
                "neighbour list has {} entries for {n_faces} faces",
                self.neighbour.len()
            )));
        }
        if let Some((f, &c)) = self
            .owner
            .iter()
            .chain(self.neighbour.iter())
            .enumerate()
            .find(|&(_, &c)| c >= self.n_cells)
        {
            return Err(MeshDecomposeError::InvalidMesh(format!(
                "cell {c} referenced by face entry {f} is out of range ({} cells)",
                self.n_cells
            )));
        }
        self.check_upper_triangular()?;
        for (f, pts) in self.faces.iter().enumerate() {
            if pts.len() < 2 {
                return Err(MeshDecomposeError::InvalidMesh(format!(
                    "face {f} has {} points",
                    pts.len()
                )));
            }
            if let Some(&p) = pts.iter().find(|&&p| p >= self.points.len()) {
                return Err(MeshDecomposeError::InvalidMesh(format!(
                    "face {f} references point {p} out of range ({} points)",
                    self.points.len()
                )));
            }
        }
        let mut next = self.neighbour.len();
        for patch in &self.patches {
            if patch.start != next {
                return Err(MeshDecomposeError::InvalidMesh(format!(
                    "patch `{}` starts at {} but the previous range ends at {next}",
                    patch.name, patch.start
                )));
            }
            if let Some((my, nbr)) = patch.kind.processor_pair() {
                if my == nbr {
                    return Err(MeshDecomposeError::InvalidMesh(format!(
                        "processor patch `{}` couples processor {my} with itself",
                        patch.name
                    )));
                }
            }
            next += patch.size;
        }
        if next != n_faces {
            return Err(MeshDecomposeError::InvalidMesh(format!(
                "patches cover faces up to {next}, mesh has {n_faces}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::patch::PatchKind;

    fn two_cell_strip() -> PolyMesh {
        // Two unit squares as an area mesh: edges are the faces.
        let points = vec![
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [2.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [1.0, 1.0, 0.0],
            [2.0, 1.0, 0.0],
        ];
        let faces = vec![vec![1, 4], vec![0, 1], vec![1, 2], vec![3, 4], vec![4, 5], vec![0, 3], vec![2, 5]];
        let owner = vec![0, 0, 1, 0, 1, 0, 1];
        let neighbour = vec![1];
        let patches = vec![Patch::new("walls", PatchKind::Wall, 1, 6)];
        PolyMesh::new(points, faces, owner, neighbour, patches).unwrap()
    }

    #[test]
    fn counts_and_patch_lookup() {
        let mesh = two_cell_strip();
        assert_eq!(mesh.n_cells(), 2);
        assert_eq!(mesh.n_internal_faces(), 1);
        assert_eq!(mesh.which_patch(0), None);
        assert_eq!(mesh.which_patch(3), Some(0));
        assert_eq!(mesh.find_patch("walls"), Some(0));
    }

    #[test]
    fn rejects_lower_triangular_face() {
        let mut mesh = two_cell_strip();
        mesh.owner[0] = 1;
        mesh.neighbour[0] = 0;
        assert!(matches!(
            mesh.validate_invariants(),
            Err(MeshDecomposeError::InvalidMesh(_))
        ));
    }

    #[test]
    fn rejects_gap_in_patches() {
        let mut mesh = two_cell_strip();
        mesh.patches[0].size = 5;
        assert!(mesh.validate_invariants().is_err());
    }
}
