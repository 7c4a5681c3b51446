//! Directory loading
//!
//! Files are taken in byte order of their names, non-recursively, and only
//! regular files with a recognized extension are read. Every document of a
//! multi-document file becomes its own chain element; empty documents (a
//! stray `---`, a comment-only section) are dropped and do not consume an
//! index.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use strata_common::yaml::parse_yaml_multi;
use tracing::{debug, info};

use crate::chain::Chain;
use crate::document::{Document, DocumentId};
use crate::error::LoadError;

/// What files the loader picks up
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoaderOptions {
    /// Recognized file extensions, without the dot; case-sensitive
    pub extensions: Vec<String>,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            extensions: vec!["yaml".to_string()],
        }
    }
}

impl LoaderOptions {
    /// The extension is whatever follows the last dot, so a file named
    /// exactly `.yaml` is a manifest with an empty stem.
    fn accepts(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|name| name.to_str())
            .and_then(|name| name.rsplit_once('.'))
            .is_some_and(|(_, ext)| self.extensions.iter().any(|e| e == ext))
    }
}

/// Load every document under `dir` with the default options.
pub fn load_directory(dir: &Path) -> Result<Vec<Document>, LoadError> {
    load_directory_with(dir, &LoaderOptions::default())
}

/// Load every document under `dir`.
pub fn load_directory_with(
    dir: &Path,
    options: &LoaderOptions,
) -> Result<Vec<Document>, LoadError> {
    let read_dir_err = |source| LoadError::ReadDirectory {
        path: dir.to_path_buf(),
        source,
    };

    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(read_dir_err)? {
        let path = entry.map_err(read_dir_err)?.path();
        if !path.is_file() {
            debug!(path = %path.display(), "skipping non-file entry");
            continue;
        }
        if !options.accepts(&path) {
            debug!(path = %path.display(), "skipping file without a manifest extension");
            continue;
        }
        files.push(path);
    }
    // On unix `file_name` compares by raw bytes
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    let mut documents = Vec::new();
    for file in &files {
        documents.extend(load_file(file)?);
    }
    ensure_unique(&documents)?;

    info!(
        dir = %dir.display(),
        files = files.len(),
        documents = documents.len(),
        "loaded manifest directory"
    );
    Ok(documents)
}

/// Parse every non-empty document in one file.
///
/// A parse error anywhere in the file fails the whole file.
pub fn load_file(path: &Path) -> Result<Vec<Document>, LoadError> {
    let content = fs::read_to_string(path).map_err(|source| LoadError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    let values = parse_yaml_multi(&content).map_err(|e| LoadError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = name.rsplit_once('.').map_or(name.as_str(), |(stem, _)| stem);

    let mut documents = Vec::new();
    for value in values.into_iter().filter(|v| !v.is_null()) {
        let index = documents.len();
        documents.push(Document::from_value(path, stem, index, value)?);
    }
    debug!(path = %path.display(), documents = documents.len(), "parsed manifest file");
    Ok(documents)
}

/// Load `dirs` in order and link everything into one chain.
pub fn load_chain<P: AsRef<Path>>(dirs: &[P]) -> Result<Chain, LoadError> {
    load_chain_with(dirs, &LoaderOptions::default())
}

/// Like [`load_chain`] with explicit loader options.
pub fn load_chain_with<P: AsRef<Path>>(
    dirs: &[P],
    options: &LoaderOptions,
) -> Result<Chain, LoadError> {
    let mut documents = Vec::new();
    for dir in dirs {
        documents.extend(load_directory_with(dir.as_ref(), options)?);
    }
    ensure_unique(&documents)?;
    Ok(Chain::from_documents(documents))
}

/// Ids must be unique since each one is the dependency target of the next.
///
/// Collisions are possible: `a1.yaml` document 0 and the eleventh document
/// of `a.yaml` are both `a10`.
fn ensure_unique(documents: &[Document]) -> Result<(), LoadError> {
    let mut seen: HashMap<&DocumentId, &PathBuf> = HashMap::new();
    for doc in documents {
        if let Some(first) = seen.insert(&doc.id, &doc.source) {
            return Err(LoadError::DuplicateDocument {
                id: doc.id.clone(),
                first: first.clone(),
                second: doc.source.clone(),
            });
        }
    }
    Ok(())
}
