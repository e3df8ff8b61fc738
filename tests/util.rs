#![allow(dead_code)]
use mesh_decompose::prelude::*;
use std::path::PathBuf;

pub fn block(nx: usize, ny: usize, nz: usize) -> PolyMesh {
    hex_block(&BlockSpec::new(nx, ny, nz)).unwrap()
}

pub fn split(mesh: &PolyMesh, labels: &[usize], n_procs: usize) -> Decomposition {
    decompose_mesh(mesh, labels, n_procs, &DecomposeOptions::default()).unwrap()
}

pub fn meshes_of(dec: &Decomposition) -> Vec<PolyMesh> {
    dec.processors.iter().map(|p| p.mesh.clone()).collect()
}

pub fn addressing_of(dec: &Decomposition) -> Vec<ProcAddressing> {
    dec.processors.iter().map(|p| p.addressing.clone()).collect()
}

/// Assert `got` is a permutation of `0..n`.
pub fn assert_permutation(got: &[usize], n: usize) {
    let mut a = got.to_vec();
    a.sort_unstable();
    let want: Vec<usize> = (0..n).collect();
    assert_eq!(a, want, "not a permutation of 0..{n}\n got={got:?}");
}

/// Patch names with their sizes, sorted by name.
pub fn patch_sizes(mesh: &PolyMesh) -> Vec<(String, usize)> {
    let mut out: Vec<(String, usize)> = mesh.patches.iter().map(|p| (p.name.clone(), p.size)).collect();
    out.sort();
    out
}

/// Empty scratch directory unique to this test process.
pub fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("mesh-decompose-{name}-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    dir
}

/// Global point labels of a local face.
pub fn global_face(pm: &ProcessorMesh, face: usize) -> Vec<usize> {
    pm.mesh.faces[face].iter().map(|&p| pm.addressing.point[p]).collect()
}

/// Decompose with `filter_empty_patches` set as given.
pub fn split_filtered(mesh: &PolyMesh, labels: &[usize], n_procs: usize, filter: bool) -> Decomposition {
    let opts = DecomposeOptions {
        filter_empty_patches: filter,
    };
    decompose_mesh(mesh, labels, n_procs, &opts).unwrap()
}

fn link(map: &mut [Option<usize>], pairs: impl Iterator<Item = (usize, usize)>, what: &str) {
    for (g, m) in pairs {
        match map[g] {
            Some(prev) => assert_eq!(prev, m, "{what} {g} maps to both {prev} and {m}"),
            None => map[g] = Some(m),
        }
    }
}

fn bijection(map: Vec<Option<usize>>, n: usize, what: &str) -> Vec<usize> {
    let map: Vec<usize> = map
        .into_iter()
        .enumerate()
        .map(|(g, m)| m.unwrap_or_else(|| panic!("{what} {g} is not reached by any processor")))
        .collect();
    assert_permutation(&map, n);
    map
}

fn patch_name(mesh: &PolyMesh, face: usize) -> Option<&str> {
    mesh.which_patch(face).map(|p| mesh.patches[p].name.as_str())
}

/// Assert `rec.mesh` is `mesh` up to renumbering. The decomposition and
/// reconstruction addressing of every processor entity must induce
/// bijections of points, faces and cells that keep each face's points, its
/// owner and neighbour cells and its patch.
pub fn assert_isomorphic(mesh: &PolyMesh, dec: &Decomposition, rec: &Reconstruction) {
    let merged = &rec.mesh;
    let mut points = vec![None; mesh.n_points()];
    let mut faces = vec![None; mesh.n_faces()];
    let mut cells = vec![None; mesh.n_cells()];
    for (pm, addr) in dec.processors.iter().zip(&rec.addressing) {
        let orig = &pm.addressing;
        link(&mut points, orig.point.iter().copied().zip(addr.point.iter().copied()), "point");
        link(
            &mut faces,
            orig.face.iter().map(|a| a.face).zip(addr.face.iter().map(|a| a.face)),
            "face",
        );
        link(&mut cells, orig.cell.iter().copied().zip(addr.cell.iter().copied()), "cell");
    }
    let points = bijection(points, merged.n_points(), "point");
    let faces = bijection(faces, merged.n_faces(), "face");
    let cells = bijection(cells, merged.n_cells(), "cell");

    let cell_pair = |owner: usize, neighbour: Option<usize>| {
        let mut v: Vec<usize> = std::iter::once(owner).chain(neighbour).collect();
        v.sort_unstable();
        v
    };
    for (g, &m) in faces.iter().enumerate() {
        let mut want: Vec<usize> = mesh.faces[g].iter().map(|&p| points[p]).collect();
        let mut got = merged.faces[m].clone();
        want.sort_unstable();
        got.sort_unstable();
        assert_eq!(got, want, "points of face {g}");
        assert_eq!(
            cell_pair(merged.owner[m], merged.neighbour.get(m).copied()),
            cell_pair(cells[mesh.owner[g]], mesh.neighbour.get(g).map(|&n| cells[n])),
            "cells of face {g}"
        );
        assert_eq!(patch_name(merged, m), patch_name(mesh, g), "patch of face {g}");
    }
}
