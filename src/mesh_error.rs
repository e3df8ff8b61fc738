//! MeshDecomposeError: unified error type for mesh-decompose public APIs
//!
//! Every fatal condition carries enough context (entity id, processor ids)
//! to diagnose a corrupted decomposition. Decomposition and reconstruction are
//! pure functions of their inputs, so none of these errors is retried.

use thiserror::Error;

/// Entity kind named in addressing errors.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EntityKind {
    Point,
    Face,
    Cell,
    Patch,
    /// Face of the named boundary patch, indexed within the patch.
    PatchFace,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EntityKind::Point => "point",
            EntityKind::Face => "face",
            EntityKind::Cell => "cell",
            EntityKind::Patch => "patch",
            EntityKind::PatchFace => "patch face",
        };
        f.write_str(name)
    }
}

/// Unified error type for mesh-decompose operations.
#[derive(Debug, Error)]
pub enum MeshDecomposeError {
    /// A partition label is out of range, or an entity has no label at all.
    #[error("Malformed partition: {0}")]
    MalformedPartition(String),

    /// Processor meshes cannot be aligned with each other.
    #[error("Inconsistent topology between processor {proc_a} and processor {proc_b}: {reason}")]
    InconsistentTopology {
        proc_a: usize,
        proc_b: usize,
        reason: String,
    },

    /// Shared-point propagation did not reach a fixed point.
    #[error("Shared-point propagation did not converge after {sweeps} sweeps over {nodes} nodes")]
    NonConvergent { sweeps: usize, nodes: usize },

    /// A global entity received no contribution from any processor.
    #[error("Addressing gap: global {kind} {index} is not covered by any processor{context}")]
    AddressingGap {
        kind: EntityKind,
        index: usize,
        context: String,
    },

    /// A global entity received contributions from more than one processor.
    #[error(
        "Addressing overlap: global {kind} {index} is covered by processor {first} and processor {second}"
    )]
    AddressingOverlap {
        kind: EntityKind,
        index: usize,
        first: usize,
        second: usize,
    },

    /// An addressing table refers outside the mesh it describes.
    #[error("Addressing on processor {proc_no}: {reason}")]
    InvalidAddressing { proc_no: usize, reason: String },

    /// A processor has no data for a field (non-fatal during reconstruction).
    #[error("Field `{field}` is missing on processor {proc_no}")]
    MissingField { field: String, proc_no: usize },

    /// A mesh violates a structural invariant.
    #[error("Invalid mesh: {0}")]
    InvalidMesh(String),

    /// A patch mapper is malformed (weights, addressing or sizes).
    #[error("Invalid patch mapper: {0}")]
    InvalidMapper(String),

    /// A field does not match the mesh it is mapped on.
    #[error("Field `{field}` does not fit the mesh: {reason}")]
    FieldShape { field: String, reason: String },

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed on-disk data.
    #[error("Parse error in {path}: {reason}")]
    Parse { path: String, reason: String },

    /// Underlying filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl MeshDecomposeError {
    /// Returns `true` for the only non-fatal kind, [`MeshDecomposeError::MissingField`].
    pub fn is_missing_field(&self) -> bool {
        matches!(self, MeshDecomposeError::MissingField { .. })
    }

    pub(crate) fn inconsistent(proc_a: usize, proc_b: usize, reason: impl Into<String>) -> Self {
        MeshDecomposeError::InconsistentTopology {
            proc_a,
            proc_b,
            reason: reason.into(),
        }
    }

    pub(crate) fn parse(path: impl Into<String>, reason: impl Into<String>) -> Self {
        MeshDecomposeError::Parse {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for MeshDecomposeError {
    fn from(e: serde_json::Error) -> Self {
        MeshDecomposeError::parse("<json>", e.to_string())
    }
}
