//! Re-export public algorithms.

pub mod assemble;
pub mod decompose;
pub mod meshgen;
pub mod patch_match;
pub mod reconstruct;
pub mod shared_points;

pub use assemble::{AssembledMesh, assemble, assemble_with_addressing};
pub use decompose::{DecomposeOptions, Decomposition, DecompositionStats, decompose_mesh, decompose_with_config};
pub use patch_match::{find_patch_pairs, match_processor_patches};
pub use reconstruct::{ReconstructMode, Reconstruction, reconstruct_mesh};
pub use shared_points::{SharedPointSet, resolve_shared_points};
