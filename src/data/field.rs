//! Field containers: values on cells, faces or points, with per-patch
//! boundary values.

use crate::mesh_error::MeshDecomposeError;
use crate::topology::patch::{Patch, PatchKind};
use crate::topology::poly_mesh::PolyMesh;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Value type stored in a field.
///
/// Only the operations the mappers need: a zero and a scaled accumulate.
pub trait FieldValue: Copy + Debug + PartialEq + Send + Sync + 'static {
    fn zero() -> Self;
    /// `self + weight * other`.
    fn add_scaled(self, other: Self, weight: f64) -> Self;
}

macro_rules! impl_scalar_field_value {
    ($($t:ty),*) => {$(
        impl FieldValue for $t {
            fn zero() -> Self {
                0 as $t
            }

            fn add_scaled(self, other: Self, weight: f64) -> Self {
                let w: $t = num_traits::cast(weight).unwrap_or(0 as $t);
                self + w * other
            }
        }
    )*};
}

impl_scalar_field_value!(f32, f64);

macro_rules! impl_array_field_value {
    ($($n:literal),*) => {$(
        impl FieldValue for [f64; $n] {
            fn zero() -> Self {
                [0.0; $n]
            }

            fn add_scaled(mut self, other: Self, weight: f64) -> Self {
                for (a, b) in self.iter_mut().zip(other) {
                    *a += weight * b;
                }
                self
            }
        }
    )*};
}

// Vectors, symmetric tensors and tensors.
impl_array_field_value!(2, 3, 6, 9);

/// Values on the faces of one boundary patch.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchField<T> {
    /// Boundary condition type, e.g. `fixedValue` or `processor`.
    pub patch_type: String,
    pub values: Vec<T>,
}

impl<T: FieldValue> PatchField<T> {
    pub fn new(patch_type: impl Into<String>, values: Vec<T>) -> Self {
        Self {
            patch_type: patch_type.into(),
            values,
        }
    }

    pub fn uniform(patch_type: impl Into<String>, value: T, size: usize) -> Self {
        Self::new(patch_type, vec![value; size])
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

fn shape_error(field: &str, reason: String) -> MeshDecomposeError {
    MeshDecomposeError::FieldShape {
        field: field.to_owned(),
        reason,
    }
}

fn check_boundary<T>(
    name: &str,
    mesh: &PolyMesh,
    boundary: &[PatchField<T>],
) -> Result<(), MeshDecomposeError> {
    if boundary.len() != mesh.patches.len() {
        return Err(shape_error(
            name,
            format!("{} patch fields for {} patches", boundary.len(), mesh.patches.len()),
        ));
    }
    for (pf, patch) in boundary.iter().zip(&mesh.patches) {
        if pf.values.len() != patch.size {
            return Err(shape_error(
                name,
                format!(
                    "patch `{}` has {} faces but {} values",
                    patch.name,
                    patch.size,
                    pf.values.len()
                ),
            ));
        }
    }
    Ok(())
}

/// Cell-centred field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VolField<T> {
    pub name: String,
    /// One value per cell.
    pub internal: Vec<T>,
    /// One patch field per mesh patch.
    pub boundary: Vec<PatchField<T>>,
}

impl<T: FieldValue> VolField<T> {
    /// Uniform field; every patch gets the `calculated` type.
    pub fn uniform(name: impl Into<String>, mesh: &PolyMesh, value: T) -> Self {
        Self {
            name: name.into(),
            internal: vec![value; mesh.n_cells()],
            boundary: mesh
                .patches
                .iter()
                .map(|p| PatchField::uniform(default_patch_type(p), value, p.size))
                .collect(),
        }
    }

    pub fn check_shape(&self, mesh: &PolyMesh) -> Result<(), MeshDecomposeError> {
        if self.internal.len() != mesh.n_cells() {
            return Err(shape_error(
                &self.name,
                format!("{} cell values for {} cells", self.internal.len(), mesh.n_cells()),
            ));
        }
        check_boundary(&self.name, mesh, &self.boundary)
    }

    /// Boundary values concatenated in patch order, i.e. indexed by
    /// `face - n_internal_faces`.
    pub fn flat_boundary(&self) -> Vec<T> {
        self.boundary.iter().flat_map(|p| p.values.iter().copied()).collect()
    }
}

/// Face field: one value per internal face plus patch fields.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SurfaceField<T> {
    pub name: String,
    pub internal: Vec<T>,
    pub boundary: Vec<PatchField<T>>,
}

impl<T: FieldValue> SurfaceField<T> {
    pub fn uniform(name: impl Into<String>, mesh: &PolyMesh, value: T) -> Self {
        Self {
            name: name.into(),
            internal: vec![value; mesh.n_internal_faces()],
            boundary: mesh
                .patches
                .iter()
                .map(|p| PatchField::uniform(default_patch_type(p), value, p.size))
                .collect(),
        }
    }

    pub fn check_shape(&self, mesh: &PolyMesh) -> Result<(), MeshDecomposeError> {
        if self.internal.len() != mesh.n_internal_faces() {
            return Err(shape_error(
                &self.name,
                format!(
                    "{} internal face values for {} internal faces",
                    self.internal.len(),
                    mesh.n_internal_faces()
                ),
            ));
        }
        check_boundary(&self.name, mesh, &self.boundary)
    }

    /// All values in face order.
    pub fn flat(&self) -> Vec<T> {
        self.internal
            .iter()
            .copied()
            .chain(self.boundary.iter().flat_map(|p| p.values.iter().copied()))
            .collect()
    }
}

/// Point field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PointField<T> {
    pub name: String,
    pub values: Vec<T>,
}

impl<T: FieldValue> PointField<T> {
    pub fn check_shape(&self, mesh: &PolyMesh) -> Result<(), MeshDecomposeError> {
        if self.values.len() != mesh.n_points() {
            return Err(shape_error(
                &self.name,
                format!("{} values for {} points", self.values.len(), mesh.n_points()),
            ));
        }
        Ok(())
    }
}

/// Patch field type used for generated fields.
pub fn default_patch_type(patch: &Patch) -> String {
    match &patch.kind {
        PatchKind::Empty => "empty".into(),
        PatchKind::Cyclic { .. } => "cyclic".into(),
        k if k.is_processor() => k.type_name().into(),
        _ => "calculated".into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algs::meshgen::{BlockSpec, hex_block};

    #[test]
    fn scaled_accumulate() {
        assert_eq!(1.0f64.add_scaled(4.0, 0.25), 2.0);
        assert_eq!(2.0f32.add_scaled(2.0, 0.5), 3.0);
        assert_eq!([1.0f64, 0.0, 0.0].add_scaled([0.0, 2.0, 4.0], 0.5), [1.0, 1.0, 2.0]);
    }

    #[test]
    fn uniform_field_fits_mesh() {
        let mesh = hex_block(&BlockSpec::new(3, 2, 1)).unwrap();
        let field = VolField::uniform("p", &mesh, 1.5f64);
        field.check_shape(&mesh).unwrap();
        assert_eq!(field.flat_boundary().len(), mesh.n_faces() - mesh.n_internal_faces());
        let surface = SurfaceField::uniform("phi", &mesh, 0.0f64);
        assert_eq!(surface.flat().len(), mesh.n_faces());
    }

    #[test]
    fn shape_mismatch_is_reported() {
        let mesh = hex_block(&BlockSpec::new(2, 1, 1)).unwrap();
        let mut field = VolField::uniform("T", &mesh, 300.0f64);
        field.boundary[0].values.pop();
        let err = field.check_shape(&mesh).unwrap_err();
        assert!(matches!(err, MeshDecomposeError::FieldShape { .. }));
    }
}
