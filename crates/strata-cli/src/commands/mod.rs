//! CLI commands

use std::path::{Path, PathBuf};

use strata_common::DeploymentConfig;

use crate::{Error, Result};

pub mod manifests;
pub mod plan;

/// Load the deployment config, honoring `--config` and `$STRATA_CONFIG`.
pub fn load_config(path: Option<&Path>) -> Result<DeploymentConfig> {
    Ok(DeploymentConfig::load(path)?)
}

/// Directories given on the command line, else the configured ones.
pub fn manifest_dirs(explicit: Vec<PathBuf>, config: &DeploymentConfig) -> Result<Vec<PathBuf>> {
    if !explicit.is_empty() {
        return Ok(explicit);
    }
    if config.manifest_dirs.is_empty() {
        return Err(Error::validation(
            "no manifest directories given and none configured in manifestDirs",
        ));
    }
    Ok(config.manifest_dirs.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_dirs_win() {
        let config = DeploymentConfig {
            manifest_dirs: vec![PathBuf::from("/etc/strata/manifests")],
            ..Default::default()
        };
        let dirs = manifest_dirs(vec![PathBuf::from("./local")], &config).unwrap();
        assert_eq!(dirs, vec![PathBuf::from("./local")]);
    }

    #[test]
    fn falls_back_to_configured_dirs() {
        let config = DeploymentConfig {
            manifest_dirs: vec![PathBuf::from("/etc/strata/manifests")],
            ..Default::default()
        };
        let dirs = manifest_dirs(Vec::new(), &config).unwrap();
        assert_eq!(dirs, config.manifest_dirs);
    }

    #[test]
    fn no_dirs_at_all_is_an_error() {
        let err = manifest_dirs(Vec::new(), &DeploymentConfig::default()).unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
    }
}
