//! Reconstruct global fields from per-processor fields.
//!
//! Values are scattered back through the addressing tables. Every global
//! cell, face and patch face must receive exactly one contribution: a hole is
//! an [`MeshDecomposeError::AddressingGap`], a second contribution an
//! [`MeshDecomposeError::AddressingOverlap`]. Processors without the field
//! (`None`) are skipped; if that leaves entities uncovered the gap is
//! reported, never filled with zeros.

use crate::data::field::{FieldValue, PatchField, PointField, SurfaceField, VolField, default_patch_type};
use crate::data::mapper::PatchMapper;
use crate::mesh_error::{EntityKind, MeshDecomposeError};
use crate::topology::addressing::ProcAddressing;
use crate::topology::patch::PatchKind;
use crate::topology::poly_mesh::PolyMesh;
use crate::topology::processor::ProcessorMesh;

type Slot<T> = Option<(T, usize)>;

fn place<T: Copy>(
    slots: &mut [Slot<T>],
    index: usize,
    global_index: usize,
    value: T,
    proc_no: usize,
    kind: EntityKind,
) -> Result<(), MeshDecomposeError> {
    let slot = slots
        .get_mut(index)
        .ok_or_else(|| MeshDecomposeError::InvalidAddressing {
            proc_no,
            reason: format!("{kind} address {global_index} out of range"),
        })?;
    if let Some((_, first)) = *slot {
        return Err(MeshDecomposeError::AddressingOverlap {
            kind,
            index: global_index,
            first,
            second: proc_no,
        });
    }
    *slot = Some((value, proc_no));
    Ok(())
}

/// Map per-processor slices of a patch onto a target patch.
///
/// `mapper` indexes the concatenation of the slices in processor order;
/// `sizes` gives each slice's length so missing slices keep their place.
pub fn reconstruct_patch_mapped<T: FieldValue>(
    slices: &[Option<&[T]>],
    sizes: &[usize],
    mapper: &PatchMapper,
) -> Result<Vec<T>, MeshDecomposeError> {
    if slices.len() != sizes.len() {
        return Err(MeshDecomposeError::InvalidMapper(format!(
            "{} slices for {} sizes",
            slices.len(),
            sizes.len()
        )));
    }
    let mut source = Vec::with_capacity(sizes.iter().sum());
    for (proc_no, (slice, &size)) in slices.iter().zip(sizes).enumerate() {
        match slice {
            Some(values) if values.len() != size => {
                return Err(MeshDecomposeError::InvalidMapper(format!(
                    "processor {proc_no} contributes {} values, expected {size}",
                    values.len()
                )));
            }
            Some(values) => source.extend(values.iter().map(|&v| Some(v))),
            None => source.extend(std::iter::repeat_n(None, size)),
        }
    }
    mapper.map_sparse(&source)
}

/// Field reconstruction onto one global mesh.
#[derive(Clone, Debug)]
pub struct FieldReconstructor<'a> {
    global: &'a PolyMesh,
    procs: Vec<(&'a PolyMesh, &'a ProcAddressing)>,
}

impl<'a> FieldReconstructor<'a> {
    /// Reconstructor for processor meshes and their addressing into `global`.
    pub fn new(
        global: &'a PolyMesh,
        meshes: &'a [PolyMesh],
        addressing: &'a [ProcAddressing],
    ) -> Result<Self, MeshDecomposeError> {
        if meshes.len() != addressing.len() {
            return Err(MeshDecomposeError::InvalidAddressing {
                proc_no: meshes.len().min(addressing.len()),
                reason: format!(
                    "{} addressing sets for {} meshes",
                    addressing.len(),
                    meshes.len()
                ),
            });
        }
        Self::from_pairs(global, meshes.iter().zip(addressing).collect())
    }

    pub fn from_processors(
        global: &'a PolyMesh,
        processors: &'a [ProcessorMesh],
    ) -> Result<Self, MeshDecomposeError> {
        Self::from_pairs(
            global,
            processors.iter().map(|p| (&p.mesh, &p.addressing)).collect(),
        )
    }

    fn from_pairs(
        global: &'a PolyMesh,
        procs: Vec<(&'a PolyMesh, &'a ProcAddressing)>,
    ) -> Result<Self, MeshDecomposeError> {
        for (proc_no, (mesh, addr)) in procs.iter().enumerate() {
            addr.check_against(proc_no, mesh, Some(global))?;
        }
        Ok(Self { global, procs })
    }

    pub fn n_procs(&self) -> usize {
        self.procs.len()
    }

    fn check_count<F>(&self, fields: &[Option<F>]) -> Result<(), MeshDecomposeError> {
        if fields.len() != self.procs.len() {
            return Err(MeshDecomposeError::InvalidAddressing {
                proc_no: fields.len().min(self.procs.len()),
                reason: format!(
                    "{} field slots for {} processors",
                    fields.len(),
                    self.procs.len()
                ),
            });
        }
        Ok(())
    }

    fn field_name<'f, F>(fields: &'f [Option<F>], name: impl Fn(&'f F) -> &'f str) -> Option<&'f str> {
        fields.iter().flatten().next().map(name)
    }

    /// Boundary patch values and types from per-face slots, in global patch
    /// order.
    fn collect_patches<T: FieldValue>(
        &self,
        slots: &[Slot<T>],
        types: Vec<Option<String>>,
    ) -> Result<Vec<PatchField<T>>, MeshDecomposeError> {
        let n_internal = self.global.n_internal_faces();
        self.global
            .patches
            .iter()
            .zip(types)
            .map(|(patch, ty)| {
                let values = patch
                    .range()
                    .enumerate()
                    .map(|(k, f)| {
                        slots[f - n_internal].map(|(v, _)| v).ok_or_else(|| {
                            MeshDecomposeError::AddressingGap {
                                kind: EntityKind::PatchFace,
                                index: k,
                                context: format!(" of patch `{}`", patch.name),
                            }
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(PatchField {
                    patch_type: ty.unwrap_or_else(|| default_patch_type(patch)),
                    values,
                })
            })
            .collect()
    }

    fn record_type(&self, types: &mut [Option<String>], addr: &ProcAddressing, lp: usize, ty: &str) {
        if let Some(g) = addr.boundary[lp] {
            types[g].get_or_insert_with(|| ty.to_owned());
        }
    }

    /// Reconstruct a cell field. Processor patch values are not carried over:
    /// the global mesh has no processor patches.
    ///
    /// Faces of a cyclic patch split across processors come back from their
    /// processor-cyclic patches, which hold the coupled value interpolated
    /// between the cells on both sides of the periodic interface. Only cyclic
    /// faces whose two halves stayed on one processor keep the original
    /// patch values.
    pub fn reconstruct_vol<T: FieldValue>(
        &self,
        fields: &[Option<VolField<T>>],
    ) -> Result<VolField<T>, MeshDecomposeError> {
        self.check_count(fields)?;
        let name = Self::field_name(fields, |f| f.name.as_str()).unwrap_or_default().to_owned();
        let n_internal = self.global.n_internal_faces();
        let mut cells: Vec<Slot<T>> = vec![None; self.global.n_cells()];
        let mut faces: Vec<Slot<T>> = vec![None; self.global.n_faces() - n_internal];
        let mut types: Vec<Option<String>> = vec![None; self.global.patches.len()];

        for (proc_no, ((mesh, addr), field)) in self.procs.iter().zip(fields).enumerate() {
            let Some(field) = field else {
                log::debug!("processor {proc_no} has no `{name}`, skipping");
                continue;
            };
            field.check_shape(mesh)?;
            for (c, &g) in addr.cell.iter().enumerate() {
                place(&mut cells, g, g, field.internal[c], proc_no, EntityKind::Cell)?;
            }
            for (lp, patch) in mesh.patches.iter().enumerate() {
                if matches!(patch.kind, PatchKind::Processor { .. }) {
                    continue;
                }
                self.record_type(&mut types, addr, lp, &field.boundary[lp].patch_type);
                for (k, f) in patch.range().enumerate() {
                    let g = addr.face[f].face;
                    let idx = g.checked_sub(n_internal).ok_or_else(|| {
                        MeshDecomposeError::InvalidAddressing {
                            proc_no,
                            reason: format!("boundary face {f} addresses internal face {g}"),
                        }
                    })?;
                    place(&mut faces, idx, g, field.boundary[lp].values[k], proc_no, EntityKind::Face)?;
                }
            }
        }

        let internal = cells
            .into_iter()
            .enumerate()
            .map(|(g, s)| {
                s.map(|(v, _)| v).ok_or_else(|| MeshDecomposeError::AddressingGap {
                    kind: EntityKind::Cell,
                    index: g,
                    context: format!(" in field `{name}`"),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let boundary = self.collect_patches(&faces, types)?;
        log::info!("reconstructed cell field `{name}`");
        Ok(VolField {
            name,
            internal,
            boundary,
        })
    }

    /// Reconstruct a face field. Cut faces take the value of the processor
    /// that owns them, falling back to the other side when the owner has no
    /// contribution.
    pub fn reconstruct_surface<T: FieldValue>(
        &self,
        fields: &[Option<SurfaceField<T>>],
    ) -> Result<SurfaceField<T>, MeshDecomposeError> {
        self.check_count(fields)?;
        let name = Self::field_name(fields, |f| f.name.as_str()).unwrap_or_default().to_owned();
        let n_internal = self.global.n_internal_faces();
        let mut slots: Vec<Slot<T>> = vec![None; self.global.n_faces()];
        let mut flipped = Vec::new();
        let mut types: Vec<Option<String>> = vec![None; self.global.patches.len()];

        for (proc_no, ((mesh, addr), field)) in self.procs.iter().zip(fields).enumerate() {
            let Some(field) = field else {
                log::debug!("processor {proc_no} has no `{name}`, skipping");
                continue;
            };
            field.check_shape(mesh)?;
            for (f, &value) in field.internal.iter().enumerate() {
                let g = addr.face[f].face;
                place(&mut slots, g, g, value, proc_no, EntityKind::Face)?;
            }
            for (lp, patch) in mesh.patches.iter().enumerate() {
                self.record_type(&mut types, addr, lp, &field.boundary[lp].patch_type);
                for (k, f) in patch.range().enumerate() {
                    let a = addr.face[f];
                    let value = field.boundary[lp].values[k];
                    if a.flipped {
                        flipped.push((a.face, value, proc_no));
                    } else {
                        place(&mut slots, a.face, a.face, value, proc_no, EntityKind::Face)?;
                    }
                }
            }
        }
        for (g, value, proc_no) in flipped {
            if let Some(slot) = slots.get_mut(g) {
                slot.get_or_insert((value, proc_no));
            }
        }

        let internal = slots[..n_internal]
            .iter()
            .enumerate()
            .map(|(g, s)| {
                s.map(|(v, _)| v).ok_or_else(|| MeshDecomposeError::AddressingGap {
                    kind: EntityKind::Face,
                    index: g,
                    context: format!(" in field `{name}`"),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let boundary = self.collect_patches(&slots[n_internal..], types)?;
        log::info!("reconstructed face field `{name}`");
        Ok(SurfaceField {
            name,
            internal,
            boundary,
        })
    }

    /// Reconstruct a point field. Points on processor interfaces are seen by
    /// several processors; the first contribution wins.
    pub fn reconstruct_point<T: FieldValue>(
        &self,
        fields: &[Option<PointField<T>>],
    ) -> Result<PointField<T>, MeshDecomposeError> {
        self.check_count(fields)?;
        let name = Self::field_name(fields, |f| f.name.as_str()).unwrap_or_default().to_owned();
        let mut values: Vec<Option<T>> = vec![None; self.global.n_points()];
        for (proc_no, ((mesh, addr), field)) in self.procs.iter().zip(fields).enumerate() {
            let Some(field) = field else {
                log::debug!("processor {proc_no} has no `{name}`, skipping");
                continue;
            };
            field.check_shape(mesh)?;
            for (&g, &v) in addr.point.iter().zip(&field.values) {
                values[g].get_or_insert(v);
            }
        }
        let values = values
            .into_iter()
            .enumerate()
            .map(|(g, v)| {
                v.ok_or_else(|| MeshDecomposeError::AddressingGap {
                    kind: EntityKind::Point,
                    index: g,
                    context: format!(" in field `{name}`"),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(PointField { name, values })
    }

    /// Size of the patch named `name` on every processor (zero where absent).
    pub fn patch_sizes(&self, name: &str) -> Vec<usize> {
        self.procs
            .iter()
            .map(|(mesh, _)| mesh.find_patch(name).map_or(0, |p| mesh.patches[p].size))
            .collect()
    }

    /// Reconstruct the values of patch `patch_name` through an explicit
    /// mapper over the per-processor slices of that patch.
    pub fn reconstruct_patch<T: FieldValue>(
        &self,
        patch_name: &str,
        fields: &[Option<VolField<T>>],
        mapper: &PatchMapper,
    ) -> Result<Vec<T>, MeshDecomposeError> {
        self.check_count(fields)?;
        let slices: Vec<Option<&[T]>> = self
            .procs
            .iter()
            .zip(fields)
            .map(|((mesh, _), field)| {
                let field = field.as_ref()?;
                let lp = mesh.find_patch(patch_name)?;
                field.boundary.get(lp).map(|pf| pf.values.as_slice())
            })
            .collect();
        let sizes = self.patch_sizes(patch_name);
        // A processor without the patch contributes an empty slice.
        let slices: Vec<Option<&[T]>> = slices
            .into_iter()
            .zip(&sizes)
            .map(|(s, &n)| if n == 0 { Some(&[][..]) } else { s })
            .collect();
        reconstruct_patch_mapped(&slices, &sizes, mapper)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algs::decompose::{DecomposeOptions, decompose_mesh};
    use crate::algs::meshgen::{BlockSpec, hex_block};
    use crate::data::decompose::FieldDecomposerSet;

    #[test]
    fn vol_round_trip_is_exact() {
        let mesh = hex_block(&BlockSpec::new(4, 2, 1)).unwrap();
        let dec = decompose_mesh(&mesh, &[0, 1, 1, 0, 2, 2, 0, 1], 3, &DecomposeOptions::default()).unwrap();
        let mut field = VolField::uniform("T", &mesh, 0.0f64);
        field.internal = (0..8).map(|c| c as f64 * 1.5).collect();
        for pf in &mut field.boundary {
            pf.patch_type = "fixedValue".into();
            for (k, v) in pf.values.iter_mut().enumerate() {
                *v = 100.0 + k as f64;
            }
        }
        let parts = FieldDecomposerSet::new(&mesh, &dec.processors)
            .unwrap()
            .decompose_vol(&field)
            .unwrap();
        let rec = FieldReconstructor::from_processors(&mesh, &dec.processors).unwrap();
        let back = rec.reconstruct_vol(&parts.into_iter().map(Some).collect::<Vec<_>>()).unwrap();
        assert_eq!(back, field);
    }

    #[test]
    fn missing_processor_leaves_a_gap() {
        let mesh = hex_block(&BlockSpec::new(2, 1, 1)).unwrap();
        let dec = decompose_mesh(&mesh, &[0, 1], 2, &DecomposeOptions::default()).unwrap();
        let field = VolField::uniform("p", &mesh, 1.0f64);
        let parts = FieldDecomposerSet::new(&mesh, &dec.processors)
            .unwrap()
            .decompose_vol(&field)
            .unwrap();
        let rec = FieldReconstructor::from_processors(&mesh, &dec.processors).unwrap();
        let err = rec.reconstruct_vol(&[Some(parts[0].clone()), None]).unwrap_err();
        assert!(matches!(
            err,
            MeshDecomposeError::AddressingGap {
                kind: EntityKind::Cell,
                index: 1,
                ..
            }
        ));
        let err = rec.reconstruct_vol::<f64>(&[None, None]).unwrap_err();
        assert!(matches!(err, MeshDecomposeError::AddressingGap { .. }));
    }

    #[test]
    fn double_contribution_is_an_overlap() {
        let mesh = hex_block(&BlockSpec::new(2, 1, 1)).unwrap();
        let dec = decompose_mesh(&mesh, &[0, 1], 2, &DecomposeOptions::default()).unwrap();
        let mut addressing: Vec<ProcAddressing> = dec.processors.iter().map(|p| p.addressing.clone()).collect();
        addressing[1].cell[0] = 0;
        let meshes: Vec<PolyMesh> = dec.processors.iter().map(|p| p.mesh.clone()).collect();
        let rec = FieldReconstructor::new(&mesh, &meshes, &addressing).unwrap();
        let fields: Vec<_> = meshes
            .iter()
            .map(|m| Some(VolField::uniform("p", m, 1.0f64)))
            .collect();
        let err = rec.reconstruct_vol(&fields).unwrap_err();
        assert!(matches!(
            err,
            MeshDecomposeError::AddressingOverlap {
                kind: EntityKind::Cell,
                index: 0,
                first: 0,
                second: 1
            }
        ));
    }

    #[test]
    fn surface_and_point_round_trip() {
        let mesh = hex_block(&BlockSpec::new(3, 2, 1)).unwrap();
        let labels = [0, 1, 1, 0, 0, 1];
        let dec = decompose_mesh(&mesh, &labels, 2, &DecomposeOptions::default()).unwrap();
        let set = FieldDecomposerSet::new(&mesh, &dec.processors).unwrap();
        let rec = FieldReconstructor::from_processors(&mesh, &dec.processors).unwrap();

        let mut phi = SurfaceField::uniform("phi", &mesh, 0.0f64);
        phi.internal = (0..mesh.n_internal_faces()).map(|f| f as f64).collect();
        let parts: Vec<_> = set.decompose_surface(&phi).unwrap().into_iter().map(Some).collect();
        let back = rec.reconstruct_surface(&parts).unwrap();
        assert_eq!(back.internal, phi.internal);

        let pts = PointField {
            name: "pointDisplacement".into(),
            values: mesh.points.clone(),
        };
        let parts: Vec<_> = set.decompose_point(&pts).unwrap().into_iter().map(Some).collect();
        assert_eq!(rec.reconstruct_point(&parts).unwrap(), pts);
    }

    #[test]
    fn split_cyclic_faces_take_coupled_values() {
        let mesh = hex_block(&BlockSpec::new(4, 1, 1).with_cyclic_x()).unwrap();
        let dec = decompose_mesh(&mesh, &[0, 0, 1, 1], 2, &DecomposeOptions::default()).unwrap();
        let mut field = VolField::uniform("T", &mesh, 0.0f64);
        field.internal = vec![1.0, 2.0, 3.0, 4.0];
        let xmin = mesh.find_patch("xmin").unwrap();
        let xmax = mesh.find_patch("xmax").unwrap();
        field.boundary[xmin].values = vec![100.0];
        field.boundary[xmax].values = vec![-100.0];
        let parts = FieldDecomposerSet::new(&mesh, &dec.processors)
            .unwrap()
            .decompose_vol(&field)
            .unwrap();
        let rec = FieldReconstructor::from_processors(&mesh, &dec.processors).unwrap();
        let back = rec.reconstruct_vol(&parts.into_iter().map(Some).collect::<Vec<_>>()).unwrap();
        assert_eq!(back.internal, field.internal);
        // Cells 0 and 3 sit half a cell from the periodic interface.
        assert_eq!(back.boundary[xmin].values, vec![2.5]);
        assert_eq!(back.boundary[xmax].values, vec![2.5]);
        let ymin = mesh.find_patch("ymin").unwrap();
        assert_eq!(back.boundary[ymin], field.boundary[ymin]);
    }

    #[test]
    fn weighted_patch_reconstruction() {
        let mesh = hex_block(&BlockSpec::new(2, 1, 1)).unwrap();
        let dec = decompose_mesh(&mesh, &[0, 1], 2, &DecomposeOptions::default()).unwrap();
        let mut field = VolField::uniform("p", &mesh, 0.0f64);
        let ymin = mesh.find_patch("ymin").unwrap();
        field.boundary[ymin].values = vec![2.0, 6.0];
        let parts: Vec<_> = FieldDecomposerSet::new(&mesh, &dec.processors)
            .unwrap()
            .decompose_vol(&field)
            .unwrap()
            .into_iter()
            .map(Some)
            .collect();
        let rec = FieldReconstructor::from_processors(&mesh, &dec.processors).unwrap();
        assert_eq!(rec.patch_sizes("ymin"), vec![1, 1]);
        // One agglomerated face averaging both processor slices.
        let mapper = PatchMapper::weighted(vec![vec![0, 1]], vec![vec![0.5, 0.5]]).unwrap();
        assert_eq!(rec.reconstruct_patch("ymin", &parts, &mapper).unwrap(), vec![4.0]);
    }
}
