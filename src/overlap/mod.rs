//! Overlap module: records how processor meshes touch each other across
//! processor and processor-cyclic patches.

pub mod correspondence;

pub use correspondence::{PatchCorrespondence, PatchPair, PatchSide};
