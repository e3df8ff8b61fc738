//! Run configuration for decomposition and reconstruction.
//!
//! Only a handful of knobs affect the core: whether empty patches are dropped
//! from processor meshes, where processor directories live, the on-disk list
//! format, and the geometric tolerance used when matching processor patches
//! without saved addressing.

use crate::mesh_error::MeshDecomposeError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Encoding of on-disk lists.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteFormat {
    #[default]
    Ascii,
    Binary,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DecomposeConfig {
    /// Drop non-processor patches that are empty on a processor.
    pub filter_empty_patches: bool,
    /// Processor directories live under per-processor roots instead of the case.
    pub distributed: bool,
    /// Roots used when `distributed` is set: one shared root, or one per processor.
    pub roots: Vec<PathBuf>,
    pub write_format: WriteFormat,
    /// Relative tolerance for geometric patch matching.
    pub match_tolerance: f64,
}

impl Default for DecomposeConfig {
    fn default() -> Self {
        Self {
            filter_empty_patches: false,
            distributed: false,
            roots: Vec::new(),
            write_format: WriteFormat::Ascii,
            match_tolerance: 1e-4,
        }
    }
}

impl DecomposeConfig {
    /// Parse a JSON configuration; missing keys take their defaults.
    pub fn from_json_str(s: &str) -> Result<Self, MeshDecomposeError> {
        let cfg: Self = serde_json::from_str(s)
            .map_err(|e| MeshDecomposeError::Config(e.to_string()))?;
        cfg.validate(None)?;
        Ok(cfg)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, MeshDecomposeError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&text)
    }

    /// Validate, optionally against a known processor count.
    pub fn validate(&self, n_procs: Option<usize>) -> Result<(), MeshDecomposeError> {
        if !(self.match_tolerance > 0.0 && self.match_tolerance.is_finite()) {
            return Err(MeshDecomposeError::Config(format!(
                "matchTolerance must be positive, got {}",
                self.match_tolerance
            )));
        }
        if self.distributed {
            if self.roots.is_empty() {
                return Err(MeshDecomposeError::Config(
                    "distributed case requires at least one root".into(),
                ));
            }
            if let Some(n) = n_procs {
                if self.roots.len() != 1 && self.roots.len() != n {
                    return Err(MeshDecomposeError::Config(format!(
                        "distributed case has {} roots for {n} processors",
                        self.roots.len()
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_keys() {
        let cfg = DecomposeConfig::from_json_str(r#"{ "filterEmptyPatches": true }"#).unwrap();
        assert!(cfg.filter_empty_patches);
        assert!(!cfg.distributed);
        assert_eq!(cfg.write_format, WriteFormat::Ascii);
        assert_eq!(cfg.match_tolerance, 1e-4);
    }

    #[test]
    fn distributed_requires_roots() {
        let err = DecomposeConfig::from_json_str(r#"{ "distributed": true }"#).unwrap_err();
        assert!(matches!(err, MeshDecomposeError::Config(_)));

        let cfg = DecomposeConfig::from_json_str(
            r#"{ "distributed": true, "roots": ["/a", "/b"], "writeFormat": "binary" }"#,
        )
        .unwrap();
        assert_eq!(cfg.write_format, WriteFormat::Binary);
        assert!(cfg.validate(Some(2)).is_ok());
        assert!(cfg.validate(Some(3)).is_err());
    }

    #[test]
    #[serial_test::serial]
    fn reads_config_file() {
        let path = std::env::temp_dir().join(format!("mesh-decompose-config-{}.json", std::process::id()));
        std::fs::write(&path, r#"{ "matchTolerance": 0.01 }"#).unwrap();
        let cfg = DecomposeConfig::from_path(&path).unwrap();
        assert_eq!(cfg.match_tolerance, 0.01);
        std::fs::remove_file(&path).unwrap();
        assert!(matches!(DecomposeConfig::from_path(&path), Err(MeshDecomposeError::Io(_))));
    }
}
