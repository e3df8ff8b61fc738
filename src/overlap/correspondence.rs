//! Face and point correspondences across a pair of processor patches.
//!
//! A [`PatchPair`] names the two sides of an inter-processor interface; side
//! `a` always belongs to the lower-numbered processor. A
//! [`PatchCorrespondence`] lists, for that pair, which local face on `a`
//! coincides with which local face on `b`, and (for plain processor patches)
//! which local points coincide.

use serde::{Deserialize, Serialize};

/// One side of an interface: a processor and a patch index in its mesh.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PatchSide {
    pub proc_no: usize,
    pub patch: usize,
}

impl PatchSide {
    pub fn new(proc_no: usize, patch: usize) -> Self {
        Self { proc_no, patch }
    }
}

/// Two processor patches facing each other.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchPair {
    /// Side on the lower-numbered processor.
    pub a: PatchSide,
    pub b: PatchSide,
    /// Processor-cyclic pair: the faces are two halves of a cyclic
    /// interface rather than the same physical face.
    pub cyclic: bool,
}

impl PatchPair {
    pub fn procs(&self) -> (usize, usize) {
        (self.a.proc_no, self.b.proc_no)
    }
}

/// Matched faces and points of a [`PatchPair`], as local indices of each
/// side's mesh.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchCorrespondence {
    pub pair: PatchPair,
    /// `(face on a, face on b)`, in patch order of side `a`.
    pub faces: Vec<(usize, usize)>,
    /// `(point on a, point on b)`, each point of side `a` listed once.
    /// Empty for processor-cyclic pairs.
    pub points: Vec<(usize, usize)>,
}

impl PatchCorrespondence {
    pub fn is_cyclic(&self) -> bool {
        self.pair.cyclic
    }

    pub fn n_faces(&self) -> usize {
        self.faces.len()
    }

    /// Point on side `b` matched with point `point` of side `a`.
    pub fn partner_point(&self, point: usize) -> Option<usize> {
        self.points
            .iter()
            .find(|&&(pa, _)| pa == point)
            .map(|&(_, pb)| pb)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partner_lookup() {
        let corr = PatchCorrespondence {
            pair: PatchPair {
                a: PatchSide::new(0, 6),
                b: PatchSide::new(1, 6),
                cyclic: false,
            },
            faces: vec![(9, 4)],
            points: vec![(3, 0), (5, 2)],
        };
        assert_eq!(corr.pair.procs(), (0, 1));
        assert_eq!(corr.partner_point(5), Some(2));
        assert_eq!(corr.partner_point(4), None);
        assert!(!corr.is_cyclic());
    }
}
