//! Mesh data model: face-based polyhedral meshes, boundary patches,
//! processor sub-meshes and their addressing tables.

pub mod addressing;
pub mod equivalence;
pub mod face;
pub mod patch;
pub mod poly_mesh;
pub mod processor;

pub use addressing::{FaceAddress, ProcAddressing};
pub use equivalence::{NodeNumbering, PointEquivalence};
pub use patch::{Patch, PatchKind};
pub use poly_mesh::PolyMesh;
pub use processor::ProcessorMesh;
