//! Mesh directory: `points`, `faces`, `owner`, `neighbour` lists plus a JSON
//! `boundary` file describing the patches.

use crate::config::WriteFormat;
use crate::io::list::{read_faces, read_labels, read_points, write_faces, write_labels, write_points};
use crate::io::{create_file, from_labels, open_file, source_name, to_labels};
use crate::mesh_error::MeshDecomposeError;
use crate::topology::patch::Patch;
use crate::topology::poly_mesh::PolyMesh;
use std::path::Path;

pub const POINTS: &str = "points";
pub const FACES: &str = "faces";
pub const OWNER: &str = "owner";
pub const NEIGHBOUR: &str = "neighbour";
pub const BOUNDARY: &str = "boundary";

pub fn write_poly_mesh(dir: &Path, mesh: &PolyMesh, format: WriteFormat) -> Result<(), MeshDecomposeError> {
    write_points(create_file(&dir.join(POINTS))?, POINTS, &mesh.points, format)?;
    write_faces(create_file(&dir.join(FACES))?, FACES, &mesh.faces, format)?;
    write_labels(create_file(&dir.join(OWNER))?, OWNER, &to_labels(&mesh.owner), format)?;
    write_labels(
        create_file(&dir.join(NEIGHBOUR))?,
        NEIGHBOUR,
        &to_labels(&mesh.neighbour),
        format,
    )?;
    serde_json::to_writer_pretty(create_file(&dir.join(BOUNDARY))?, &mesh.patches)
        .map_err(|e| MeshDecomposeError::parse(source_name(&dir.join(BOUNDARY)), e.to_string()))?;
    log::debug!(
        "wrote mesh to {} ({} points, {} faces, {} cells)",
        dir.display(),
        mesh.n_points(),
        mesh.n_faces(),
        mesh.n_cells()
    );
    Ok(())
}

fn read_cells(dir: &Path, object: &str) -> Result<Vec<usize>, MeshDecomposeError> {
    let path = dir.join(object);
    let source = source_name(&path);
    let (_, raw) = read_labels(open_file(&path)?, &source)?;
    from_labels(raw, &source)
}

/// Read and validate a mesh directory.
pub fn read_poly_mesh(dir: &Path) -> Result<PolyMesh, MeshDecomposeError> {
    let path = dir.join(POINTS);
    let (_, points) = read_points(open_file(&path)?, &source_name(&path))?;
    let path = dir.join(FACES);
    let (_, faces) = read_faces(open_file(&path)?, &source_name(&path))?;
    let owner = read_cells(dir, OWNER)?;
    let neighbour = read_cells(dir, NEIGHBOUR)?;
    let path = dir.join(BOUNDARY);
    let patches: Vec<Patch> = serde_json::from_reader(open_file(&path)?)
        .map_err(|e| MeshDecomposeError::parse(source_name(&path), e.to_string()))?;
    PolyMesh::new(points, faces, owner, neighbour, patches)
}
