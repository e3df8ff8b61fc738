#![cfg_attr(docsrs, feature(doc_cfg))]
//! # mesh-decompose
//!
//! mesh-decompose splits a face-based polyhedral mesh into processor
//! sub-meshes for parallel finite-volume runs, and puts them back together
//! afterwards. Fields follow the same path: cell, face and point values are
//! scattered to the processors and gathered back onto the global mesh.
//!
//! ## Features
//! - Processor meshes with synthesized processor and processor-cyclic patches
//! - Point, face, cell and boundary addressing tables back to the global mesh
//! - Exact reconstruction through saved addressing, or topological matching
//!   of processor patches when no addressing is available
//! - Shared-point resolution for points on three or more processors
//! - Field decomposition with direct and weighted patch mappers
//! - Fixed-layout ASCII/binary list files and JSON patch/field files
//!
//! ## Determinism
//!
//! Decomposition and reconstruction are pure functions of their inputs. All
//! orderings (cells, faces, points, patches, shared points) are defined by
//! global numbering and processor number, so repeated runs produce identical
//! files. The optional `rayon` feature parallelizes field decomposition over
//! processors without changing results.
//!
//! ## Usage
//!
//! ```toml
//! [dependencies]
//! mesh-decompose = "0.3"
//! # features = ["rayon"]
//! ```
//!
//! ```
//! use mesh_decompose::prelude::*;
//!
//! let mesh = hex_block(&BlockSpec::new(4, 1, 1)).unwrap();
//! let dec = decompose_mesh(&mesh, &[0, 0, 1, 1], 2, &DecomposeOptions::default()).unwrap();
//! let meshes: Vec<PolyMesh> = dec.processors.iter().map(|p| p.mesh.clone()).collect();
//! let rec = reconstruct_mesh(&meshes, None, &DecomposeConfig::default()).unwrap();
//! assert_eq!(rec.mesh.n_cells(), 4);
//! ```

pub mod algs;
pub mod config;
pub mod data;
pub mod debug_invariants;
pub mod io;
pub mod mesh_error;
pub mod overlap;
pub mod topology;

pub use debug_invariants::DebugInvariants;
pub use mesh_error::MeshDecomposeError;

/// A convenient prelude to import the most-used traits & types:
pub mod prelude {
    pub use crate::algs::assemble::{AssembledMesh, assemble, assemble_with_addressing};
    pub use crate::algs::decompose::{DecomposeOptions, Decomposition, decompose_mesh};
    pub use crate::algs::meshgen::{BlockSpec, hex_block, quad_block};
    pub use crate::algs::patch_match::match_processor_patches;
    pub use crate::algs::reconstruct::{ReconstructMode, Reconstruction, reconstruct_mesh};
    pub use crate::algs::shared_points::{SharedPointSet, resolve_shared_points};
    pub use crate::config::{DecomposeConfig, WriteFormat};
    pub use crate::data::decompose::{FieldDecomposer, FieldDecomposerSet};
    pub use crate::data::field::{FieldValue, PatchField, PointField, SurfaceField, VolField};
    pub use crate::data::mapper::PatchMapper;
    pub use crate::data::reconstruct::FieldReconstructor;
    pub use crate::debug_invariants::DebugInvariants;
    pub use crate::io::case::CaseLayout;
    pub use crate::mesh_error::{EntityKind, MeshDecomposeError};
    pub use crate::overlap::correspondence::{PatchCorrespondence, PatchPair, PatchSide};
    pub use crate::topology::{FaceAddress, Patch, PatchKind, PolyMesh, ProcAddressing, ProcessorMesh};
}
