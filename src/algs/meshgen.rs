//! Basic mesh generators for structured blocks.
//!
//! Produced meshes follow the face-ordering conventions the decomposition
//! relies on: internal faces sorted by owner then neighbour (so every
//! internal face is upper-triangular), followed by one patch per block side.

use crate::mesh_error::MeshDecomposeError;
use crate::topology::face::{Vec3, reverse_face};
use crate::topology::patch::{Patch, PatchKind};
use crate::topology::poly_mesh::PolyMesh;

/// Size and options of a structured hexahedral block.
#[derive(Clone, Debug, PartialEq)]
pub struct BlockSpec {
    pub nx: usize,
    pub ny: usize,
    pub nz: usize,
    /// Edge lengths of the block along x, y and z.
    pub lengths: Vec3,
    /// Pair the `xmin`/`xmax` sides as cyclic patches.
    pub cyclic_x: bool,
}

impl BlockSpec {
    /// Unit-spaced block of `nx × ny × nz` cells.
    pub fn new(nx: usize, ny: usize, nz: usize) -> Self {
        Self {
            nx,
            ny,
            nz,
            lengths: [nx as f64, ny as f64, nz as f64],
            cyclic_x: false,
        }
    }

    pub fn with_lengths(mut self, lengths: Vec3) -> Self {
        self.lengths = lengths;
        self
    }

    pub fn with_cyclic_x(mut self) -> Self {
        self.cyclic_x = true;
        self
    }
}

fn invalid(message: impl Into<String>) -> MeshDecomposeError {
    MeshDecomposeError::InvalidMesh(message.into())
}

/// Generate a hexahedral block mesh with patches
/// `xmin, xmax, ymin, ymax, zmin, zmax`.
pub fn hex_block(spec: &BlockSpec) -> Result<PolyMesh, MeshDecomposeError> {
    let (nx, ny, nz) = (spec.nx, spec.ny, spec.nz);
    if nx == 0 || ny == 0 || nz == 0 {
        return Err(invalid("block dimensions must be non-zero"));
    }
    let v = |i: usize, j: usize, k: usize| i + (nx + 1) * (j + (ny + 1) * k);
    let cell = |i: usize, j: usize, k: usize| i + nx * (j + ny * k);
    // Faces normal to x, y and z at the given lower corner, oriented along +axis.
    let face_x = |i, j, k| vec![v(i, j, k), v(i, j + 1, k), v(i, j + 1, k + 1), v(i, j, k + 1)];
    let face_y = |i, j, k| vec![v(i, j, k), v(i, j, k + 1), v(i + 1, j, k + 1), v(i + 1, j, k)];
    let face_z = |i, j, k| vec![v(i, j, k), v(i + 1, j, k), v(i + 1, j + 1, k), v(i, j + 1, k)];

    let mut points = Vec::with_capacity((nx + 1) * (ny + 1) * (nz + 1));
    let [lx, ly, lz] = spec.lengths;
    for k in 0..=nz {
        for j in 0..=ny {
            for i in 0..=nx {
                points.push([
                    lx * i as f64 / nx as f64,
                    ly * j as f64 / ny as f64,
                    lz * k as f64 / nz as f64,
                ]);
            }
        }
    }

    let mut faces = Vec::new();
    let mut owner = Vec::new();
    let mut neighbour = Vec::new();
    for k in 0..nz {
        for j in 0..ny {
            for i in 0..nx {
                let c = cell(i, j, k);
                if i + 1 < nx {
                    faces.push(face_x(i + 1, j, k));
                    owner.push(c);
                    neighbour.push(cell(i + 1, j, k));
                }
                if j + 1 < ny {
                    faces.push(face_y(i, j + 1, k));
                    owner.push(c);
                    neighbour.push(cell(i, j + 1, k));
                }
                if k + 1 < nz {
                    faces.push(face_z(i, j, k + 1));
                    owner.push(c);
                    neighbour.push(cell(i, j, k + 1));
                }
            }
        }
    }

    let mut patches = Vec::with_capacity(6);
    let mut add_patch = |name: &str, kind: PatchKind, side: Vec<(Vec<usize>, usize)>| {
        patches.push(Patch::new(name, kind, faces.len(), side.len()));
        for (f, c) in side {
            faces.push(f);
            owner.push(c);
        }
    };
    let (xmin_kind, xmax_kind) = if spec.cyclic_x {
        (
            PatchKind::Cyclic {
                neighbour_patch: "xmax".into(),
            },
            PatchKind::Cyclic {
                neighbour_patch: "xmin".into(),
            },
        )
    } else {
        (PatchKind::Patch, PatchKind::Patch)
    };

    let mut xmin = Vec::new();
    let mut xmax = Vec::new();
    for k in 0..nz {
        for j in 0..ny {
            xmin.push((reverse_face(&face_x(0, j, k)), cell(0, j, k)));
            xmax.push((face_x(nx, j, k), cell(nx - 1, j, k)));
        }
    }
    add_patch("xmin", xmin_kind, xmin);
    add_patch("xmax", xmax_kind, xmax);

    let mut ymin = Vec::new();
    let mut ymax = Vec::new();
    for k in 0..nz {
        for i in 0..nx {
            ymin.push((reverse_face(&face_y(i, 0, k)), cell(i, 0, k)));
            ymax.push((face_y(i, ny, k), cell(i, ny - 1, k)));
        }
    }
    add_patch("ymin", PatchKind::Wall, ymin);
    add_patch("ymax", PatchKind::Wall, ymax);

    let mut zmin = Vec::new();
    let mut zmax = Vec::new();
    for j in 0..ny {
        for i in 0..nx {
            zmin.push((reverse_face(&face_z(i, j, 0)), cell(i, j, 0)));
            zmax.push((face_z(i, j, nz), cell(i, j, nz - 1)));
        }
    }
    add_patch("zmin", PatchKind::Empty, zmin);
    add_patch("zmax", PatchKind::Empty, zmax);

    PolyMesh::with_cells(points, faces, owner, neighbour, patches, nx * ny * nz)
}

/// Generate an area mesh of `nx × ny` unit quads in the `z = 0` plane.
///
/// The quads are the cells; their two-point edges are the faces. Patches are
/// `xmin, xmax, ymin, ymax`.
pub fn quad_block(nx: usize, ny: usize) -> Result<PolyMesh, MeshDecomposeError> {
    if nx == 0 || ny == 0 {
        return Err(invalid("block dimensions must be non-zero"));
    }
    let v = |i: usize, j: usize| i + (nx + 1) * j;
    let cell = |i: usize, j: usize| i + nx * j;

    let mut points = Vec::with_capacity((nx + 1) * (ny + 1));
    for j in 0..=ny {
        for i in 0..=nx {
            points.push([i as f64, j as f64, 0.0]);
        }
    }

    let mut faces = Vec::new();
    let mut owner = Vec::new();
    let mut neighbour = Vec::new();
    for j in 0..ny {
        for i in 0..nx {
            if i + 1 < nx {
                faces.push(vec![v(i + 1, j), v(i + 1, j + 1)]);
                owner.push(cell(i, j));
                neighbour.push(cell(i + 1, j));
            }
            if j + 1 < ny {
                faces.push(vec![v(i + 1, j + 1), v(i, j + 1)]);
                owner.push(cell(i, j));
                neighbour.push(cell(i, j + 1));
            }
        }
    }

    let mut patches = Vec::with_capacity(4);
    let mut add_patch = |name: &str, side: Vec<(Vec<usize>, usize)>| {
        patches.push(Patch::new(name, PatchKind::Patch, faces.len(), side.len()));
        for (f, c) in side {
            faces.push(f);
            owner.push(c);
        }
    };
    add_patch(
        "xmin",
        (0..ny).map(|j| (vec![v(0, j + 1), v(0, j)], cell(0, j))).collect(),
    );
    add_patch(
        "xmax",
        (0..ny)
            .map(|j| (vec![v(nx, j), v(nx, j + 1)], cell(nx - 1, j)))
            .collect(),
    );
    add_patch(
        "ymin",
        (0..nx).map(|i| (vec![v(i, 0), v(i + 1, 0)], cell(i, 0))).collect(),
    );
    add_patch(
        "ymax",
        (0..nx)
            .map(|i| (vec![v(i + 1, ny), v(i, ny)], cell(i, ny - 1)))
            .collect(),
    );

    PolyMesh::with_cells(points, faces, owner, neighbour, patches, nx * ny)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::face::{dot, sub};

    #[test]
    fn ten_cell_channel_counts() {
        let mesh = hex_block(&BlockSpec::new(10, 1, 1)).unwrap();
        assert_eq!(mesh.n_cells(), 10);
        assert_eq!(mesh.n_points(), 11 * 2 * 2);
        assert_eq!(mesh.n_internal_faces(), 9);
        assert_eq!(mesh.patches.len(), 6);
        assert_eq!(mesh.n_faces(), 9 + 1 + 1 + 10 * 4);
    }

    #[test]
    fn faces_point_out_of_their_owner() {
        let mesh = hex_block(&BlockSpec::new(3, 2, 2).with_lengths([3.0, 0.5, 2.0])).unwrap();
        assert_eq!(mesh.points.last(), Some(&[3.0, 0.5, 2.0]));
        let centres = mesh.cell_centres();
        for f in 0..mesh.n_faces() {
            let d = sub(mesh.face_centre(f), centres[mesh.owner[f]]);
            assert!(dot(d, mesh.face_area_vector(f)) > 0.0, "face {f} points inwards");
        }
    }

    #[test]
    fn area_edges_point_out_of_their_owner() {
        let mesh = quad_block(3, 2).unwrap();
        let centres = mesh.cell_centres();
        for f in 0..mesh.n_faces() {
            let d = sub(mesh.face_centre(f), centres[mesh.owner[f]]);
            assert!(dot(d, mesh.face_area_vector(f)) > 0.0, "edge {f} points inwards");
        }
    }
}
