//! Running `manifests load` end to end against a temp directory

use std::fs;

use strata_cli::commands::manifests::{self, LoadArgs, ManifestsCommand};
use tempfile::TempDir;

#[tokio::test]
async fn load_succeeds_on_directory_and_config() {
    let dir = TempDir::new().unwrap();
    let manifests_dir = dir.path().join("manifests");
    fs::create_dir(&manifests_dir).unwrap();
    fs::write(
        manifests_dir.join("00-namespace.yaml"),
        "apiVersion: v1\nkind: Namespace\nmetadata:\n  name: shop\n",
    )
    .unwrap();

    // Relative manifestDirs resolve against the config file's directory
    let config = dir.path().join("strata.yaml");
    fs::write(&config, "stage: test\nmanifestDirs:\n  - manifests\n").unwrap();

    manifests::run(ManifestsCommand::Load(LoadArgs { dirs: Vec::new() }), Some(&config))
        .await
        .unwrap();
}

#[tokio::test]
async fn load_fails_on_malformed_manifest() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("bad.yaml"), "kind: [unclosed\n").unwrap();
    let config_dir = TempDir::new().unwrap();
    let config = config_dir.path().join("strata.yaml");
    fs::write(&config, "stage: test\n").unwrap();

    let err = manifests::run(
        ManifestsCommand::Load(LoadArgs {
            dirs: vec![dir.path().to_path_buf()],
        }),
        Some(&config),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, strata_cli::Error::Load(_)));
}
