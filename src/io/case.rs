//! Case directory layout: where each processor's mesh, addressing and
//! fields live.
//!
//! A plain case keeps processor directories next to the global mesh:
//! `<case>/processorN/constant/polyMesh`. A distributed case puts
//! `processorN` under one shared root or under one root per processor.

use crate::algs::decompose::Decomposition;
use crate::config::{DecomposeConfig, WriteFormat};
use crate::io::addressing::{has_addressing, read_addressing, write_addressing};
use crate::io::poly_mesh::{read_poly_mesh, write_poly_mesh};
use crate::mesh_error::MeshDecomposeError;
use crate::topology::addressing::ProcAddressing;
use crate::topology::poly_mesh::PolyMesh;
use crate::topology::processor::ProcessorMesh;
use std::path::{Path, PathBuf};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CaseLayout {
    case: PathBuf,
    roots: Option<Vec<PathBuf>>,
}

impl CaseLayout {
    pub fn new(case: impl Into<PathBuf>, cfg: &DecomposeConfig) -> Self {
        Self {
            case: case.into(),
            roots: cfg.distributed.then(|| cfg.roots.clone()),
        }
    }

    /// Non-distributed layout rooted at `case`.
    pub fn plain(case: impl Into<PathBuf>) -> Self {
        Self {
            case: case.into(),
            roots: None,
        }
    }

    pub fn case_dir(&self) -> &Path {
        &self.case
    }

    pub fn is_distributed(&self) -> bool {
        self.roots.is_some()
    }

    pub fn global_mesh_dir(&self) -> PathBuf {
        self.case.join("constant").join("polyMesh")
    }

    pub fn processor_dir(&self, proc_no: usize) -> PathBuf {
        let root = match &self.roots {
            Some(roots) => roots
                .get(proc_no)
                .or_else(|| roots.first())
                .unwrap_or(&self.case),
            None => &self.case,
        };
        root.join(format!("processor{proc_no}"))
    }

    pub fn processor_mesh_dir(&self, proc_no: usize) -> PathBuf {
        self.processor_dir(proc_no).join("constant").join("polyMesh")
    }

    /// Field file of a processor, `None` for the global case.
    pub fn field_path(&self, proc_no: Option<usize>, time: &str, name: &str) -> PathBuf {
        let base = match proc_no {
            Some(p) => self.processor_dir(p),
            None => self.case.clone(),
        };
        base.join(time).join(name)
    }

    /// Number of consecutive `processorN` directories, starting at zero.
    pub fn count_processors(&self) -> usize {
        (0..).take_while(|&p| self.processor_dir(p).is_dir()).count()
    }
}

/// Write every processor mesh with its addressing.
pub fn write_decomposition(
    layout: &CaseLayout,
    dec: &Decomposition,
    format: WriteFormat,
) -> Result<(), MeshDecomposeError> {
    for pm in &dec.processors {
        write_processor(layout, pm, format)?;
    }
    log::info!(
        "wrote {} processor meshes under {}",
        dec.n_procs,
        layout.case_dir().display()
    );
    Ok(())
}

pub fn write_processor(
    layout: &CaseLayout,
    pm: &ProcessorMesh,
    format: WriteFormat,
) -> Result<(), MeshDecomposeError> {
    let dir = layout.processor_mesh_dir(pm.proc_no);
    write_poly_mesh(&dir, &pm.mesh, format)?;
    write_addressing(&dir, &pm.addressing, format)
}

/// Read `n_procs` processor meshes. Addressing is returned only when every
/// processor has a complete set of addressing files.
pub fn read_processors(
    layout: &CaseLayout,
    n_procs: usize,
) -> Result<(Vec<PolyMesh>, Option<Vec<ProcAddressing>>), MeshDecomposeError> {
    let dirs: Vec<PathBuf> = (0..n_procs).map(|p| layout.processor_mesh_dir(p)).collect();
    let meshes = dirs
        .iter()
        .map(|dir| read_poly_mesh(dir))
        .collect::<Result<Vec<_>, _>>()?;
    let with_addressing = dirs.iter().filter(|dir| has_addressing(dir)).count();
    let addressing = if with_addressing == n_procs {
        Some(
            dirs.iter()
                .map(|dir| read_addressing(dir))
                .collect::<Result<Vec<_>, _>>()?,
        )
    } else {
        if with_addressing > 0 {
            log::warn!(
                "only {with_addressing} of {n_procs} processors have addressing; matching topologically"
            );
        }
        None
    };
    Ok((meshes, addressing))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn processor_directories() {
        let plain = CaseLayout::plain("/case");
        assert!(!plain.is_distributed());
        assert_eq!(plain.global_mesh_dir(), PathBuf::from("/case/constant/polyMesh"));
        assert_eq!(
            plain.processor_mesh_dir(3),
            PathBuf::from("/case/processor3/constant/polyMesh")
        );
        assert_eq!(
            plain.field_path(None, "0", "U"),
            PathBuf::from("/case/0/U")
        );

        let cfg = DecomposeConfig {
            distributed: true,
            roots: vec!["/r0".into(), "/r1".into()],
            ..DecomposeConfig::default()
        };
        let dist = CaseLayout::new("/case", &cfg);
        assert!(dist.is_distributed());
        assert_eq!(dist.processor_dir(1), PathBuf::from("/r1/processor1"));
        assert_eq!(
            dist.field_path(Some(0), "0.5", "p"),
            PathBuf::from("/r0/processor0/0.5/p")
        );

        let shared = CaseLayout::new(
            "/case",
            &DecomposeConfig {
                distributed: true,
                roots: vec!["/scratch".into()],
                ..DecomposeConfig::default()
            },
        );
        assert_eq!(shared.processor_dir(5), PathBuf::from("/scratch/processor5"));
    }
}
