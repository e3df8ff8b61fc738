//! Addressing files of one processor.
//!
//! Four label lists next to the processor mesh: point, cell and boundary
//! addresses as plain labels (`-1` marks a processor patch) and face
//! addresses in the signed `±(face + 1)` encoding.

use crate::config::WriteFormat;
use crate::io::list::{read_labels, write_labels};
use crate::io::{create_file, from_labels, open_file, source_name, to_labels};
use crate::mesh_error::MeshDecomposeError;
use crate::topology::addressing::{FaceAddress, ProcAddressing};
use std::path::Path;

pub const POINT_ADDRESSING: &str = "pointProcAddressing";
pub const FACE_ADDRESSING: &str = "faceProcAddressing";
pub const CELL_ADDRESSING: &str = "cellProcAddressing";
pub const BOUNDARY_ADDRESSING: &str = "boundaryProcAddressing";

const ALL: [&str; 4] = [
    POINT_ADDRESSING,
    FACE_ADDRESSING,
    CELL_ADDRESSING,
    BOUNDARY_ADDRESSING,
];

/// True when all four addressing files exist in `dir`.
pub fn has_addressing(dir: &Path) -> bool {
    ALL.iter().all(|name| dir.join(name).is_file())
}

fn write_list(dir: &Path, object: &str, values: &[i64], format: WriteFormat) -> Result<(), MeshDecomposeError> {
    write_labels(create_file(&dir.join(object))?, object, values, format)
}

fn read_list(dir: &Path, object: &str) -> Result<(String, Vec<i64>), MeshDecomposeError> {
    let path = dir.join(object);
    let source = source_name(&path);
    let (_, values) = read_labels(open_file(&path)?, &source)?;
    Ok((source, values))
}

pub fn write_addressing(
    dir: &Path,
    addr: &ProcAddressing,
    format: WriteFormat,
) -> Result<(), MeshDecomposeError> {
    write_list(dir, POINT_ADDRESSING, &to_labels(&addr.point), format)?;
    let faces: Vec<i64> = addr.face.iter().map(|f| f.encode()).collect();
    write_list(dir, FACE_ADDRESSING, &faces, format)?;
    write_list(dir, CELL_ADDRESSING, &to_labels(&addr.cell), format)?;
    let boundary: Vec<i64> = addr
        .boundary
        .iter()
        .map(|b| b.map_or(-1, |g| g as i64))
        .collect();
    write_list(dir, BOUNDARY_ADDRESSING, &boundary, format)?;
    log::debug!(
        "wrote addressing to {} ({} points, {} faces, {} cells)",
        dir.display(),
        addr.point.len(),
        addr.face.len(),
        addr.cell.len()
    );
    Ok(())
}

pub fn read_addressing(dir: &Path) -> Result<ProcAddressing, MeshDecomposeError> {
    let (source, raw) = read_list(dir, POINT_ADDRESSING)?;
    let point = from_labels(raw, &source)?;

    let (source, raw) = read_list(dir, FACE_ADDRESSING)?;
    let face = raw
        .into_iter()
        .map(|v| {
            FaceAddress::decode(v)
                .ok_or_else(|| MeshDecomposeError::parse(source.as_str(), "face address 0"))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let (source, raw) = read_list(dir, CELL_ADDRESSING)?;
    let cell = from_labels(raw, &source)?;

    let (source, raw) = read_list(dir, BOUNDARY_ADDRESSING)?;
    let boundary = raw
        .into_iter()
        .map(|v| match v {
            -1 => Ok(None),
            v if v >= 0 => Ok(Some(v as usize)),
            v => Err(MeshDecomposeError::parse(
                source.as_str(),
                format!("invalid boundary address {v}"),
            )),
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ProcAddressing {
        point,
        face,
        cell,
        boundary,
    })
}
