//! Addressing tables relating a processor mesh to the global mesh.
//!
//! Four tables are built per processor: point, face, cell and boundary. The
//! face table records orientation as an explicit flag; the signed,
//! one-offset integer form is only an on-disk encoding.

use crate::debug_invariants::DebugInvariants;
use crate::mesh_error::MeshDecomposeError;
use crate::topology::poly_mesh::PolyMesh;
use serde::{Deserialize, Serialize};

/// Global face referenced by a local face, plus whether the local face is
/// presented with reversed orientation.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FaceAddress {
    pub face: usize,
    pub flipped: bool,
}

impl FaceAddress {
    pub fn new(face: usize, flipped: bool) -> Self {
        Self { face, flipped }
    }

    /// Same orientation as the global face.
    pub fn forward(face: usize) -> Self {
        Self::new(face, false)
    }

    /// Reversed orientation relative to the global face.
    pub fn reversed(face: usize) -> Self {
        Self::new(face, true)
    }

    /// Encode as `±(face + 1)`; negative means flipped.
    pub fn encode(self) -> i64 {
        let v = self.face as i64 + 1;
        if self.flipped { -v } else { v }
    }

    /// Decode the `±(face + 1)` form. Zero has no meaning and is rejected.
    pub fn decode(raw: i64) -> Option<Self> {
        match raw {
            0 => None,
            r if r > 0 => Some(Self::forward((r - 1) as usize)),
            r => Some(Self::reversed((-r - 1) as usize)),
        }
    }
}

/// The four addressing tables of one processor mesh.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcAddressing {
    /// Local point → global point.
    pub point: Vec<usize>,
    /// Local face → global face and orientation.
    pub face: Vec<FaceAddress>,
    /// Local cell → global cell.
    pub cell: Vec<usize>,
    /// Local patch → global patch; `None` for processor patches.
    pub boundary: Vec<Option<usize>>,
}

impl ProcAddressing {
    /// Check the tables against the processor mesh they describe and the
    /// global mesh they point into.
    pub fn check_against(
        &self,
        proc_no: usize,
        local: &PolyMesh,
        global: Option<&PolyMesh>,
    ) -> Result<(), MeshDecomposeError> {
        let invalid = |reason: String| MeshDecomposeError::InvalidAddressing { proc_no, reason };
        if self.point.len() != local.n_points() {
            return Err(invalid(format!(
                "{} point addresses for {} points",
                self.point.len(),
                local.n_points()
            )));
        }
        if self.face.len() != local.n_faces() {
            return Err(invalid(format!(
                "{} face addresses for {} faces",
                self.face.len(),
                local.n_faces()
            )));
        }
        if self.cell.len() != local.n_cells() {
            return Err(invalid(format!(
                "{} cell addresses for {} cells",
                self.cell.len(),
                local.n_cells()
            )));
        }
        if self.boundary.len() != local.patches.len() {
            return Err(invalid(format!(
                "{} boundary addresses for {} patches",
                self.boundary.len(),
                local.patches.len()
            )));
        }
        for (idx, (patch, addr)) in local.patches.iter().zip(&self.boundary).enumerate() {
            if patch.is_processor() != addr.is_none() {
                return Err(invalid(format!(
                    "patch {idx} (`{}`) has boundary address {addr:?}",
                    patch.name
                )));
            }
        }
        if let Some(global) = global {
            if let Some(&p) = self.point.iter().find(|&&p| p >= global.n_points()) {
                return Err(invalid(format!("point address {p} out of range")));
            }
            if let Some(f) = self.face.iter().find(|f| f.face >= global.n_faces()) {
                return Err(invalid(format!("face address {} out of range", f.face)));
            }
            if let Some(&c) = self.cell.iter().find(|&&c| c >= global.n_cells()) {
                return Err(invalid(format!("cell address {c} out of range")));
            }
            if let Some(&b) = self
                .boundary
                .iter()
                .flatten()
                .find(|&&b| b >= global.patches.len())
            {
                return Err(invalid(format!("boundary address {b} out of range")));
            }
        }
        Ok(())
    }
}

impl DebugInvariants for ProcAddressing {
    /// Cell addressing is strictly increasing; point and face addressing are
    /// injective.
    fn validate_invariants(&self) -> Result<(), MeshDecomposeError> {
        let invalid = |reason: String| MeshDecomposeError::InvalidAddressing {
            proc_no: usize::MAX,
            reason,
        };
        if let Some(w) = self.cell.windows(2).find(|w| w[0] >= w[1]) {
            return Err(invalid(format!(
                "cell addressing is not increasing ({} then {})",
                w[0], w[1]
            )));
        }
        let mut seen = hashbrown::HashSet::with_capacity(self.point.len());
        if let Some(p) = self.point.iter().find(|&&p| !seen.insert(p)) {
            return Err(invalid(format!("global point {p} addressed twice")));
        }
        let mut seen = hashbrown::HashSet::with_capacity(self.face.len());
        if let Some(f) = self.face.iter().find(|f| !seen.insert(f.face)) {
            return Err(invalid(format!("global face {} addressed twice", f.face)));
        }
        Ok(())
    }
}
