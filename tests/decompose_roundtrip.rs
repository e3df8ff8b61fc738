mod util;

use mesh_decompose::prelude::*;
use mesh_decompose::topology::face::{FaceMatch, compare_faces};
use proptest::prelude::*;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use util::*;

#[test]
fn channel_split_at_midplane() {
    let mesh = block(10, 1, 1);
    let labels: Vec<usize> = (0..10).map(|c| c / 5).collect();
    let dec = split(&mesh, &labels, 2);

    for pm in &dec.processors {
        assert_eq!(pm.mesh.n_cells(), 5);
        let procs: Vec<&Patch> = pm.mesh.patches.iter().filter(|p| p.is_processor()).collect();
        assert_eq!(procs.len(), 1);
        assert_eq!(procs[0].size, 1);
        assert_eq!(pm.neighbour_procs(), vec![1 - pm.proc_no]);
    }
    assert!(dec.processors[0].mesh.find_patch("procBoundary0to1").is_some());
    assert!(dec.processors[1].mesh.find_patch("procBoundary1to0").is_some());

    let p = 3.0f64;
    let field = VolField::uniform("p", &mesh, p);
    let parts = FieldDecomposerSet::new(&mesh, &dec.processors)
        .unwrap()
        .decompose_vol(&field)
        .unwrap();
    for part in &parts {
        assert!(part.internal.iter().all(|&v| v == p));
        assert!(part.boundary.iter().flat_map(|b| &b.values).all(|&v| v == p));
    }
    let rec = FieldReconstructor::from_processors(&mesh, &dec.processors).unwrap();
    let back = rec
        .reconstruct_vol(&parts.into_iter().map(Some).collect::<Vec<_>>())
        .unwrap();
    assert_eq!(back, field);
}

#[test]
fn labels_must_cover_every_cell() {
    let mesh = block(3, 1, 1);
    let err = decompose_mesh(&mesh, &[0, 1], 2, &DecomposeOptions::default()).unwrap_err();
    assert!(matches!(err, MeshDecomposeError::MalformedPartition(_)));
    let err = decompose_mesh(&mesh, &[0, 1, 5], 2, &DecomposeOptions::default()).unwrap_err();
    assert!(matches!(err, MeshDecomposeError::MalformedPartition(_)));
}

#[test]
fn random_vector_fields_survive_exact_round_trip() {
    let mut rng = SmallRng::seed_from_u64(0x5eed);
    let mesh = block(6, 4, 3);
    let n_procs = 5;
    let mut labels: Vec<usize> = (0..mesh.n_cells()).map(|_| rng.gen_range(0..n_procs)).collect();
    labels[..n_procs].copy_from_slice(&[0, 1, 2, 3, 4]);
    let dec = split(&mesh, &labels, n_procs);
    let meshes = meshes_of(&dec);
    let addressing = addressing_of(&dec);

    let mut u = VolField::uniform("U", &mesh, [0.0f64; 3]);
    for v in u.internal.iter_mut().chain(u.boundary.iter_mut().flat_map(|b| b.values.iter_mut())) {
        *v = [rng.r#gen(), rng.r#gen(), rng.r#gen()];
    }
    let point = PointField {
        name: "pointDisplacement".into(),
        values: (0..mesh.n_points()).map(|_| rng.r#gen::<f64>()).collect(),
    };

    let set = FieldDecomposerSet::new(&mesh, &dec.processors).unwrap();
    let rec = FieldReconstructor::new(&mesh, &meshes, &addressing).unwrap();
    let parts = set.decompose_vol(&u).unwrap();
    assert_eq!(rec.reconstruct_vol(&parts.into_iter().map(Some).collect::<Vec<_>>()).unwrap(), u);
    let parts = set.decompose_point(&point).unwrap();
    assert_eq!(
        rec.reconstruct_point(&parts.into_iter().map(Some).collect::<Vec<_>>()).unwrap(),
        point
    );
}

fn check_bijective(mesh: &PolyMesh, dec: &Decomposition) {
    let cells: Vec<usize> = dec.processors.iter().flat_map(|p| p.addressing.cell.iter().copied()).collect();
    assert_permutation(&cells, mesh.n_cells());

    let mut used = vec![false; mesh.n_points()];
    for pm in &dec.processors {
        for &g in &pm.addressing.point {
            used[g] = true;
        }
    }
    assert!(used.iter().all(|&u| u));
}

fn check_face_flips(dec: &Decomposition) {
    for pm in &dec.processors {
        for patch in &pm.mesh.patches {
            let PatchKind::Processor { my_proc, neighbour_proc } = patch.kind else {
                continue;
            };
            assert_ne!(my_proc, neighbour_proc);
            let other = &dec.processors[neighbour_proc];
            let twin = other
                .mesh
                .patches
                .iter()
                .find(|p| p.kind == PatchKind::Processor { my_proc: neighbour_proc, neighbour_proc: my_proc })
                .unwrap();
            assert_eq!(twin.size, patch.size);
            for (f, g) in patch.range().zip(twin.range()) {
                let (a, b) = (pm.addressing.face[f], other.addressing.face[g]);
                assert_eq!(a.face, b.face);
                assert_ne!(a.flipped, b.flipped);
                assert_eq!(
                    compare_faces(&global_face(pm, f), &global_face(other, g)),
                    FaceMatch::Reversed
                );
            }
        }
    }
}

fn check_boundary_coverage(mesh: &PolyMesh, dec: &Decomposition) {
    let mut internal = vec![0usize; mesh.n_faces()];
    let mut processor = vec![0usize; mesh.n_faces()];
    let mut boundary = vec![0usize; mesh.n_faces()];
    for pm in &dec.processors {
        let m = &pm.mesh;
        for f in 0..m.n_internal_faces() {
            internal[pm.addressing.face[f].face] += 1;
        }
        for patch in &m.patches {
            let counts = if matches!(patch.kind, PatchKind::Processor { .. }) {
                &mut processor
            } else {
                &mut boundary
            };
            for f in patch.range() {
                counts[pm.addressing.face[f].face] += 1;
            }
        }
    }
    for g in 0..mesh.n_faces() {
        if mesh.is_internal_face(g) {
            assert!(
                (internal[g], processor[g], boundary[g]) == (1, 0, 0)
                    || (internal[g], processor[g], boundary[g]) == (0, 2, 0),
                "internal face {g}: {} internal, {} processor, {} boundary",
                internal[g],
                processor[g],
                boundary[g]
            );
        } else {
            assert_eq!((internal[g], processor[g], boundary[g]), (0, 0, 1), "boundary face {g}");
        }
    }
}

#[derive(Clone, Debug)]
struct SplitCase {
    spec: BlockSpec,
    n_procs: usize,
    labels: Vec<usize>,
    filter: bool,
}

impl SplitCase {
    fn mesh(&self) -> PolyMesh {
        hex_block(&self.spec).unwrap()
    }

    fn split(&self, mesh: &PolyMesh) -> Decomposition {
        split_filtered(mesh, &self.labels, self.n_procs, self.filter)
    }
}

fn split_case() -> impl Strategy<Value = SplitCase> {
    (2usize..6, 1usize..4, 1usize..3, 2usize..5, any::<bool>(), any::<bool>()).prop_flat_map(
        |(nx, ny, nz, n_procs, cyclic, filter)| {
            let n_cells = nx * ny * nz;
            let n_procs = n_procs.min(n_cells);
            let mut spec = BlockSpec::new(nx, ny, nz);
            if cyclic {
                spec = spec.with_cyclic_x();
            }
            proptest::collection::vec(0..n_procs, n_cells).prop_map(move |mut labels| {
                // Every processor gets at least one cell.
                for (p, label) in labels.iter_mut().enumerate().take(n_procs) {
                    *label = p;
                }
                SplitCase {
                    spec: spec.clone(),
                    n_procs,
                    labels,
                    filter,
                }
            })
        },
    )
}

/// Cell values and non-cyclic patch values survive; faces of split cyclic
/// patches carry coupled values instead.
fn assert_vol_round_trip(mesh: &PolyMesh, back: &VolField<f64>, field: &VolField<f64>) {
    assert_eq!(back.internal, field.internal);
    for (patch, (b, f)) in mesh.patches.iter().zip(back.boundary.iter().zip(&field.boundary)) {
        if !matches!(patch.kind, PatchKind::Cyclic { .. }) {
            assert_eq!(b, f, "patch `{}`", patch.name);
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn decomposition_invariants(case in split_case()) {
        let mesh = case.mesh();
        let dec = case.split(&mesh);
        check_bijective(&mesh, &dec);
        check_face_flips(&dec);
        check_boundary_coverage(&mesh, &dec);
        for pm in &dec.processors {
            pm.mesh.check_upper_triangular().unwrap();
        }
    }

    #[test]
    fn exact_round_trip(case in split_case()) {
        let mesh = case.mesh();
        let dec = case.split(&mesh);
        let meshes = meshes_of(&dec);
        let addressing = addressing_of(&dec);
        let rec = reconstruct_mesh(&meshes, Some(&addressing), &DecomposeConfig::default()).unwrap();
        prop_assert_eq!(rec.mode, ReconstructMode::Exact);
        prop_assert_eq!(&rec.mesh, &mesh);
        prop_assert_eq!(&rec.addressing, &addressing);

        let mut field = VolField::uniform("T", &mesh, 0.0f64);
        field.internal = (0..mesh.n_cells()).map(|c| 0.25 * c as f64).collect();
        let parts = FieldDecomposerSet::new(&mesh, &dec.processors)
            .unwrap()
            .decompose_vol(&field)
            .unwrap();
        let back = FieldReconstructor::new(&rec.mesh, &meshes, &rec.addressing)
            .unwrap()
            .reconstruct_vol(&parts.into_iter().map(Some).collect::<Vec<_>>())
            .unwrap();
        assert_vol_round_trip(&mesh, &back, &field);
    }

    #[test]
    fn merged_round_trip_is_isomorphic(case in split_case()) {
        let mesh = case.mesh();
        let dec = case.split(&mesh);
        let meshes = meshes_of(&dec);
        let rec = reconstruct_mesh(&meshes, None, &DecomposeConfig::default()).unwrap();
        prop_assert_eq!(rec.mode, ReconstructMode::Merged);
        prop_assert_eq!(rec.mesh.n_internal_faces(), mesh.n_internal_faces());
        prop_assert_eq!(patch_sizes(&rec.mesh), patch_sizes(&mesh));
        rec.mesh.check_upper_triangular().unwrap();
        assert_isomorphic(&mesh, &dec, &rec);

        let field = VolField::uniform("p", &mesh, 3.0f64);
        let parts = FieldDecomposerSet::new(&mesh, &dec.processors)
            .unwrap()
            .decompose_vol(&field)
            .unwrap();
        let back = FieldReconstructor::new(&rec.mesh, &meshes, &rec.addressing)
            .unwrap()
            .reconstruct_vol(&parts.into_iter().map(Some).collect::<Vec<_>>())
            .unwrap();
        prop_assert!(back.internal.iter().all(|&v| v == 3.0));
    }
}
