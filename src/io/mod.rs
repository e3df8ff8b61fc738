//! On-disk persistence of processor meshes, addressing tables and fields.
//!
//! Lists (points, faces, owner, neighbour, addressing) use the fixed layout of
//! [`list`]; patch descriptions and fields are JSON. [`case::CaseLayout`]
//! resolves where each processor's files live.

pub mod addressing;
pub mod case;
pub mod field;
pub mod list;
pub mod poly_mesh;

pub use addressing::{has_addressing, read_addressing, write_addressing};
pub use case::{CaseLayout, read_processors, write_decomposition};
pub use field::{read_field, read_field_opt, read_processor_fields, write_field};
pub use list::{ListHeader, read_faces, read_labels, read_points, write_faces, write_labels, write_points};
pub use poly_mesh::{read_poly_mesh, write_poly_mesh};

use crate::mesh_error::MeshDecomposeError;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

pub(crate) fn source_name(path: &Path) -> String {
    path.display().to_string()
}

pub(crate) fn create_file(path: &Path) -> Result<BufWriter<File>, MeshDecomposeError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(BufWriter::new(File::create(path)?))
}

pub(crate) fn open_file(path: &Path) -> Result<BufReader<File>, MeshDecomposeError> {
    Ok(BufReader::new(File::open(path)?))
}

pub(crate) fn to_labels(values: &[usize]) -> Vec<i64> {
    values.iter().map(|&v| v as i64).collect()
}

pub(crate) fn from_labels(values: Vec<i64>, source: &str) -> Result<Vec<usize>, MeshDecomposeError> {
    values
        .into_iter()
        .map(|v| {
            usize::try_from(v)
                .map_err(|_| MeshDecomposeError::parse(source, format!("negative label {v}")))
        })
        .collect()
}
