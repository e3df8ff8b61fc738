//! Boundary patches: contiguous face ranges with a name and a type.

use serde::{Deserialize, Serialize};

/// Type of a boundary patch.
///
/// Processor patches are synthesized by decomposition and carry the
/// `(myProc, neighbProc)` tag of the interface they represent.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PatchKind {
    Patch,
    Wall,
    Empty,
    Symmetry,
    /// Periodic patch paired face-by-face with `neighbour_patch`.
    Cyclic {
        #[serde(rename = "neighbourPatch")]
        neighbour_patch: String,
    },
    /// Interface to another processor.
    Processor {
        #[serde(rename = "myProcNo")]
        my_proc: usize,
        #[serde(rename = "neighbProcNo")]
        neighbour_proc: usize,
    },
    /// Interface to another processor through a split cyclic patch.
    /// `neighbour_patch` is the cyclic partner of `referred_patch`, so the
    /// counterpart on the other processor refers to it.
    ProcessorCyclic {
        #[serde(rename = "myProcNo")]
        my_proc: usize,
        #[serde(rename = "neighbProcNo")]
        neighbour_proc: usize,
        #[serde(rename = "referPatch")]
        referred_patch: String,
        #[serde(rename = "neighbourPatch", default)]
        neighbour_patch: String,
    },
}

impl PatchKind {
    /// True for both processor patch flavours.
    pub fn is_processor(&self) -> bool {
        matches!(
            self,
            PatchKind::Processor { .. } | PatchKind::ProcessorCyclic { .. }
        )
    }

    /// `(myProc, neighbProc)` for processor patches.
    pub fn processor_pair(&self) -> Option<(usize, usize)> {
        match self {
            PatchKind::Processor {
                my_proc,
                neighbour_proc,
            }
            | PatchKind::ProcessorCyclic {
                my_proc,
                neighbour_proc,
                ..
            } => Some((*my_proc, *neighbour_proc)),
            _ => None,
        }
    }

    /// Name of the cyclic patch a processor-cyclic patch was split from.
    pub fn referred_patch(&self) -> Option<&str> {
        match self {
            PatchKind::ProcessorCyclic { referred_patch, .. } => Some(referred_patch),
            _ => None,
        }
    }

    /// Cyclic partner of the referred patch, when recorded.
    pub fn referred_partner(&self) -> Option<&str> {
        match self {
            PatchKind::ProcessorCyclic {
                neighbour_patch, ..
            } if !neighbour_patch.is_empty() => Some(neighbour_patch),
            _ => None,
        }
    }

    /// Short type name, as written to field files.
    pub fn type_name(&self) -> &'static str {
        match self {
            PatchKind::Patch => "patch",
            PatchKind::Wall => "wall",
            PatchKind::Empty => "empty",
            PatchKind::Symmetry => "symmetry",
            PatchKind::Cyclic { .. } => "cyclic",
            PatchKind::Processor { .. } => "processor",
            PatchKind::ProcessorCyclic { .. } => "processorCyclic",
        }
    }
}

/// A named, contiguous range of boundary faces.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patch {
    pub name: String,
    #[serde(flatten)]
    pub kind: PatchKind,
    #[serde(rename = "startFace")]
    pub start: usize,
    #[serde(rename = "nFaces")]
    pub size: usize,
}

impl Patch {
    pub fn new(name: impl Into<String>, kind: PatchKind, start: usize, size: usize) -> Self {
        Self {
            name: name.into(),
            kind,
            start,
            size,
        }
    }

    /// Global face labels covered by this patch.
    pub fn range(&self) -> std::ops::Range<usize> {
        self.start..self.start + self.size
    }

    pub fn is_processor(&self) -> bool {
        self.kind.is_processor()
    }
}

/// Name of the plain processor patch from `my_proc` to `neighbour_proc`.
pub fn processor_patch_name(my_proc: usize, neighbour_proc: usize) -> String {
    format!("procBoundary{my_proc}to{neighbour_proc}")
}

/// Name of the processor patch that carries faces of a split cyclic patch.
pub fn processor_cyclic_patch_name(my_proc: usize, neighbour_proc: usize, referred: &str) -> String {
    format!("procBoundary{my_proc}to{neighbour_proc}through{referred}")
}
