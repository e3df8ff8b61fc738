//! Field files: one JSON document per field and time directory.

use crate::io::case::CaseLayout;
use crate::io::{create_file, open_file, source_name};
use crate::mesh_error::MeshDecomposeError;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;

pub fn write_field<F: Serialize>(path: &Path, field: &F) -> Result<(), MeshDecomposeError> {
    serde_json::to_writer_pretty(create_file(path)?, field)
        .map_err(|e| MeshDecomposeError::parse(source_name(path), e.to_string()))
}

/// Read a field file of processor `proc_no`; an absent file is
/// [`MeshDecomposeError::MissingField`].
pub fn read_field<F: DeserializeOwned>(
    path: &Path,
    proc_no: usize,
) -> Result<F, MeshDecomposeError> {
    if !path.is_file() {
        let field = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        return Err(MeshDecomposeError::MissingField { field, proc_no });
    }
    serde_json::from_reader(open_file(path)?)
        .map_err(|e| MeshDecomposeError::parse(source_name(path), e.to_string()))
}

/// Like [`read_field`], with a missing file mapped to `None`.
pub fn read_field_opt<F: DeserializeOwned>(
    path: &Path,
    proc_no: usize,
) -> Result<Option<F>, MeshDecomposeError> {
    match read_field(path, proc_no) {
        Ok(f) => Ok(Some(f)),
        Err(e) if e.is_missing_field() => {
            log::warn!("{e}, skipping");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Field `name` at `time` from every processor, `None` where absent.
pub fn read_processor_fields<F: DeserializeOwned>(
    layout: &CaseLayout,
    n_procs: usize,
    time: &str,
    name: &str,
) -> Result<Vec<Option<F>>, MeshDecomposeError> {
    (0..n_procs)
        .map(|p| read_field_opt(&layout.field_path(Some(p), time, name), p))
        .collect()
}
