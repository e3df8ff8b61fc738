//! Decompose global fields onto processor meshes.
//!
//! A [`FieldDecomposer`] is built once per processor from the global mesh and
//! the processor's addressing, precomputing one [`PatchMapper`] per local
//! patch. Interior values are gathered through the cell and face tables.
//! Patches that are slices of a global patch copy their values directly.
//! Processor patches have no global boundary values to copy; for cell fields
//! they are interpolated from the two cells on either side of the interface,
//! for face fields they take the value of the global face they stand for.
//!
//! Orientation flags are not applied to values: flipping the sign of
//! oriented quantities is left to the caller's field algebra.

use crate::data::field::{FieldValue, PatchField, PointField, SurfaceField, VolField};
use crate::data::mapper::PatchMapper;
use crate::mesh_error::MeshDecomposeError;
use crate::topology::addressing::FaceAddress;
use crate::topology::face::{Vec3, distance};
use crate::topology::patch::PatchKind;
use crate::topology::poly_mesh::PolyMesh;
use crate::topology::processor::ProcessorMesh;

/// Array a volume-field patch mapper reads from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PatchSource {
    /// Global boundary values concatenated in face order.
    GlobalBoundary,
    /// Global cell values.
    GlobalCells,
}

#[derive(Clone, Debug, PartialEq)]
pub struct VolPatchMap {
    pub source: PatchSource,
    pub mapper: PatchMapper,
}

/// Field decomposition for one processor.
#[derive(Clone, Debug)]
pub struct FieldDecomposer<'a> {
    global: &'a PolyMesh,
    processor: &'a ProcessorMesh,
    vol_maps: Vec<VolPatchMap>,
    surface_maps: Vec<PatchMapper>,
}

/// Interpolation weight of the near cell, from the distances of the face
/// centre to the near and far cell centres.
fn linear_weight(d_near: f64, d_far: f64) -> f64 {
    let sum = d_near + d_far;
    if sum > 0.0 && sum.is_finite() {
        d_far / sum
    } else {
        0.5
    }
}

fn bad_address(proc_no: usize, reason: String) -> MeshDecomposeError {
    MeshDecomposeError::InvalidAddressing { proc_no, reason }
}

impl<'a> FieldDecomposer<'a> {
    pub fn new(global: &'a PolyMesh, processor: &'a ProcessorMesh) -> Result<Self, MeshDecomposeError> {
        Self::with_cell_centres(global, &global.cell_centres(), processor)
    }

    /// Build with precomputed global cell centres.
    pub fn with_cell_centres(
        global: &'a PolyMesh,
        centres: &[Vec3],
        processor: &'a ProcessorMesh,
    ) -> Result<Self, MeshDecomposeError> {
        let proc_no = processor.proc_no;
        let local = &processor.mesh;
        let addr = &processor.addressing;
        addr.check_against(proc_no, local, Some(global))?;
        let n_internal = global.n_internal_faces();

        let mut vol_maps = Vec::with_capacity(local.patches.len());
        let mut surface_maps = Vec::with_capacity(local.patches.len());
        for patch in &local.patches {
            let faces = &addr.face[patch.range()];
            surface_maps.push(PatchMapper::Direct {
                addressing: faces.iter().map(|a| a.face).collect(),
            });
            let map = match &patch.kind {
                PatchKind::Processor { .. } => VolPatchMap {
                    source: PatchSource::GlobalCells,
                    mapper: interface_weights(global, centres, faces, proc_no)?,
                },
                PatchKind::ProcessorCyclic { .. } => VolPatchMap {
                    source: PatchSource::GlobalCells,
                    mapper: cyclic_weights(global, centres, faces, proc_no)?,
                },
                _ => {
                    let addressing = faces
                        .iter()
                        .map(|a| {
                            a.face.checked_sub(n_internal).ok_or_else(|| {
                                bad_address(
                                    proc_no,
                                    format!(
                                        "patch `{}` addresses internal face {}",
                                        patch.name, a.face
                                    ),
                                )
                            })
                        })
                        .collect::<Result<Vec<_>, _>>()?;
                    VolPatchMap {
                        source: PatchSource::GlobalBoundary,
                        mapper: PatchMapper::Direct { addressing },
                    }
                }
            };
            vol_maps.push(map);
        }
        log::debug!(
            "processor {proc_no}: {} patch mappers ({} weighted)",
            vol_maps.len(),
            vol_maps.iter().filter(|m| !m.mapper.is_direct()).count()
        );
        Ok(Self {
            global,
            processor,
            vol_maps,
            surface_maps,
        })
    }

    pub fn proc_no(&self) -> usize {
        self.processor.proc_no
    }

    /// Mappers used for cell fields, one per local patch.
    pub fn vol_maps(&self) -> &[VolPatchMap] {
        &self.vol_maps
    }

    fn patch_type<T>(&self, local_patch: usize, global_boundary: &[PatchField<T>]) -> String {
        match self.processor.addressing.boundary[local_patch] {
            Some(g) => global_boundary[g].patch_type.clone(),
            None => self.processor.mesh.patches[local_patch].kind.type_name().to_owned(),
        }
    }

    pub fn decompose_vol<T: FieldValue>(&self, field: &VolField<T>) -> Result<VolField<T>, MeshDecomposeError> {
        field.check_shape(self.global)?;
        let addr = &self.processor.addressing;
        let flat = field.flat_boundary();
        let boundary = self
            .vol_maps
            .iter()
            .enumerate()
            .map(|(lp, map)| {
                let values = match map.source {
                    PatchSource::GlobalBoundary => map.mapper.map(&flat)?,
                    PatchSource::GlobalCells => map.mapper.map(&field.internal)?,
                };
                Ok(PatchField {
                    patch_type: self.patch_type(lp, &field.boundary),
                    values,
                })
            })
            .collect::<Result<Vec<_>, MeshDecomposeError>>()?;
        Ok(VolField {
            name: field.name.clone(),
            internal: addr.cell.iter().map(|&c| field.internal[c]).collect(),
            boundary,
        })
    }

    pub fn decompose_surface<T: FieldValue>(
        &self,
        field: &SurfaceField<T>,
    ) -> Result<SurfaceField<T>, MeshDecomposeError> {
        field.check_shape(self.global)?;
        let addr = &self.processor.addressing;
        let flat = field.flat();
        let n_internal = self.processor.mesh.n_internal_faces();
        let boundary = self
            .surface_maps
            .iter()
            .enumerate()
            .map(|(lp, mapper)| {
                Ok(PatchField {
                    patch_type: self.patch_type(lp, &field.boundary),
                    values: mapper.map(&flat)?,
                })
            })
            .collect::<Result<Vec<_>, MeshDecomposeError>>()?;
        Ok(SurfaceField {
            name: field.name.clone(),
            internal: addr.face[..n_internal].iter().map(|a| flat[a.face]).collect(),
            boundary,
        })
    }

    pub fn decompose_point<T: FieldValue>(
        &self,
        field: &PointField<T>,
    ) -> Result<PointField<T>, MeshDecomposeError> {
        field.check_shape(self.global)?;
        Ok(PointField {
            name: field.name.clone(),
            values: self
                .processor
                .addressing
                .point
                .iter()
                .map(|&p| field.values[p])
                .collect(),
        })
    }
}

/// Weights over the cells on both sides of cut internal faces, near side first.
fn interface_weights(
    global: &PolyMesh,
    centres: &[Vec3],
    faces: &[FaceAddress],
    proc_no: usize,
) -> Result<PatchMapper, MeshDecomposeError> {
    let mut addressing = Vec::with_capacity(faces.len());
    let mut weights = Vec::with_capacity(faces.len());
    for a in faces {
        if !global.is_internal_face(a.face) {
            return Err(bad_address(
                proc_no,
                format!("processor face addresses boundary face {}", a.face),
            ));
        }
        let (own, nbr) = (global.owner[a.face], global.neighbour[a.face]);
        let (near, far) = if a.flipped { (nbr, own) } else { (own, nbr) };
        let cf = global.face_centre(a.face);
        let w = linear_weight(distance(cf, centres[near]), distance(cf, centres[far]));
        addressing.push(vec![near, far]);
        weights.push(vec![w, 1.0 - w]);
    }
    PatchMapper::weighted(addressing, weights)
}

/// Weights over the cells on both halves of split cyclic face pairs.
fn cyclic_weights(
    global: &PolyMesh,
    centres: &[Vec3],
    faces: &[FaceAddress],
    proc_no: usize,
) -> Result<PatchMapper, MeshDecomposeError> {
    let mut addressing = Vec::with_capacity(faces.len());
    let mut weights = Vec::with_capacity(faces.len());
    for a in faces {
        let partner = global
            .which_patch(a.face)
            .and_then(|g| {
                let patch = &global.patches[g];
                match &patch.kind {
                    PatchKind::Cyclic { neighbour_patch } => global
                        .find_patch(neighbour_patch)
                        .map(|h| global.patches[h].start + (a.face - patch.start)),
                    _ => None,
                }
            })
            .filter(|&f| f < global.n_faces())
            .ok_or_else(|| {
                bad_address(
                    proc_no,
                    format!("processor-cyclic face addresses non-cyclic face {}", a.face),
                )
            })?;
        let (near, far) = (global.owner[a.face], global.owner[partner]);
        let w = linear_weight(
            distance(global.face_centre(a.face), centres[near]),
            distance(global.face_centre(partner), centres[far]),
        );
        addressing.push(vec![near, far]);
        weights.push(vec![w, 1.0 - w]);
    }
    PatchMapper::weighted(addressing, weights)
}

/// Field decomposers for every processor of a decomposition.
#[derive(Clone, Debug)]
pub struct FieldDecomposerSet<'a> {
    decomposers: Vec<FieldDecomposer<'a>>,
}

impl<'a> FieldDecomposerSet<'a> {
    pub fn new(global: &'a PolyMesh, processors: &'a [ProcessorMesh]) -> Result<Self, MeshDecomposeError> {
        let centres = global.cell_centres();
        let decomposers = processors
            .iter()
            .map(|p| FieldDecomposer::with_cell_centres(global, &centres, p))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { decomposers })
    }

    pub fn decomposers(&self) -> &[FieldDecomposer<'a>] {
        &self.decomposers
    }

    fn for_each<R, F>(&self, f: F) -> Result<Vec<R>, MeshDecomposeError>
    where
        R: Send,
        F: Fn(&FieldDecomposer<'a>) -> Result<R, MeshDecomposeError> + Sync + Send,
    {
        #[cfg(feature = "rayon")]
        {
            use rayon::prelude::*;
            self.decomposers.par_iter().map(f).collect()
        }
        #[cfg(not(feature = "rayon"))]
        {
            self.decomposers.iter().map(f).collect()
        }
    }

    /// Decompose a cell field for every processor, in processor order.
    pub fn decompose_vol<T: FieldValue>(&self, field: &VolField<T>) -> Result<Vec<VolField<T>>, MeshDecomposeError> {
        let out = self.for_each(|d| d.decompose_vol(field))?;
        log::info!("decomposed cell field `{}` onto {} processors", field.name, out.len());
        Ok(out)
    }

    pub fn decompose_surface<T: FieldValue>(
        &self,
        field: &SurfaceField<T>,
    ) -> Result<Vec<SurfaceField<T>>, MeshDecomposeError> {
        let out = self.for_each(|d| d.decompose_surface(field))?;
        log::info!("decomposed face field `{}` onto {} processors", field.name, out.len());
        Ok(out)
    }

    pub fn decompose_point<T: FieldValue>(
        &self,
        field: &PointField<T>,
    ) -> Result<Vec<PointField<T>>, MeshDecomposeError> {
        let out = self.for_each(|d| d.decompose_point(field))?;
        log::info!("decomposed point field `{}` onto {} processors", field.name, out.len());
        Ok(out)
    }
}
