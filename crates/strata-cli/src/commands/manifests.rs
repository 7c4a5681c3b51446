//! Manifests commands

use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};
use strata_manifest::{apply_chain, load_chain, KubeTarget};
use tracing::info;

use super::{load_config, manifest_dirs};
use crate::Result;

#[derive(Subcommand, Debug)]
pub enum ManifestsCommand {
    /// Load manifest directories and print the resulting chain
    Load(LoadArgs),
    /// Apply the chain to a cluster, one document at a time
    Apply(ApplyArgs),
}

#[derive(Args, Debug)]
pub struct LoadArgs {
    /// Manifest directories, applied in the order given (defaults to manifestDirs)
    pub dirs: Vec<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ApplyArgs {
    /// Manifest directories, applied in the order given (defaults to manifestDirs)
    pub dirs: Vec<PathBuf>,

    /// Path to kubeconfig (defaults to $KUBECONFIG, in-cluster, then ~/.kube/config)
    #[arg(long)]
    pub kubeconfig: Option<PathBuf>,
}

pub async fn run(cmd: ManifestsCommand, config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    match cmd {
        ManifestsCommand::Load(args) => {
            let chain = load_chain(&manifest_dirs(args.dirs, &config)?)?;
            if chain.is_empty() {
                println!("no documents found");
            } else {
                print!("{chain}");
            }
            Ok(())
        }
        ManifestsCommand::Apply(args) => {
            let chain = load_chain(&manifest_dirs(args.dirs, &config)?)?;
            if chain.is_empty() {
                println!("no documents found, nothing to apply");
                return Ok(());
            }

            let target = KubeTarget::connect(args.kubeconfig.as_deref()).await?;
            info!(documents = chain.len(), "applying manifest chain");
            let report = apply_chain(&chain, &target).await?;
            println!("applied {} documents", report.applied.len());
            Ok(())
        }
    }
}
