//! Field data: containers, patch mappers, and the decompose/reconstruct
//! transfer between a global mesh and its processor meshes.

pub mod decompose;
pub mod field;
pub mod mapper;
pub mod reconstruct;

pub use decompose::{FieldDecomposer, FieldDecomposerSet, PatchSource, VolPatchMap};
pub use field::{FieldValue, PatchField, PointField, SurfaceField, VolField, default_patch_type};
pub use mapper::PatchMapper;
pub use reconstruct::{FieldReconstructor, reconstruct_patch_mapped};
