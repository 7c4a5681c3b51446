//! A single resource document and its chain identity

use std::fmt;
use std::path::{Path, PathBuf};

use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use k8s_openapi::Resource;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::LoadError;

/// Chain identity of a document: `<file-stem><index>`
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    /// Id of the `index`-th document of a file with stem `stem`
    pub fn new(stem: &str, index: usize) -> Self {
        Self(format!("{stem}{index}"))
    }

    /// The id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for DocumentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// One declarative resource parsed from a manifest file
#[derive(Clone, Debug, PartialEq)]
pub struct Document {
    /// Chain identity
    pub id: DocumentId,
    /// File the document was read from
    pub source: PathBuf,
    /// Position among the file's non-empty documents
    pub index: usize,
    /// `apiVersion`
    pub api_version: String,
    /// `kind`
    pub kind: String,
    /// `metadata.name`
    pub name: String,
    /// `metadata.namespace`, if set
    pub namespace: Option<String>,
    /// The full document
    pub value: Value,
}

impl Document {
    /// Validate identity fields and build a document.
    pub(crate) fn from_value(
        source: &Path,
        stem: &str,
        index: usize,
        value: Value,
    ) -> Result<Self, LoadError> {
        let invalid = |message: &str| LoadError::InvalidDocument {
            path: source.to_path_buf(),
            index,
            message: message.to_string(),
        };

        if !value.is_object() {
            return Err(invalid("document is not a mapping"));
        }
        let api_version = value
            .get("apiVersion")
            .and_then(Value::as_str)
            .ok_or_else(|| invalid("missing apiVersion"))?
            .to_string();
        let kind = value
            .get("kind")
            .and_then(Value::as_str)
            .ok_or_else(|| invalid("missing kind"))?
            .to_string();
        let name = value
            .pointer("/metadata/name")
            .and_then(Value::as_str)
            .ok_or_else(|| invalid("missing metadata.name"))?
            .to_string();
        let namespace = value
            .pointer("/metadata/namespace")
            .and_then(Value::as_str)
            .map(str::to_string);

        Ok(Self {
            id: DocumentId::new(stem, index),
            source: source.to_path_buf(),
            index,
            api_version,
            kind,
            name,
            namespace,
            value,
        })
    }

    /// `(group, version)` split of `apiVersion`; the core group is `""`.
    pub fn group_version(&self) -> (String, String) {
        match self.api_version.split_once('/') {
            Some((group, version)) => (group.to_string(), version.to_string()),
            None => (String::new(), self.api_version.clone()),
        }
    }

    /// Whether applying this document registers a new API type
    pub fn is_crd(&self) -> bool {
        self.kind == CustomResourceDefinition::KIND
            && self.group_version().0 == CustomResourceDefinition::GROUP
    }

    /// `kind/name`, as printed in logs and chain listings
    pub fn display_name(&self) -> String {
        format!("{}/{}", self.kind, self.name)
    }
}
