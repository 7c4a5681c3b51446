//! Linear apply chain
//!
//! Each document depends on exactly the one before it. There is no attempt
//! to infer finer-grained edges between documents: the cluster gets a total
//! order and nothing is applied in parallel.

use std::fmt;

use crate::document::{Document, DocumentId};

/// A document at its position in the chain
#[derive(Clone, Debug, PartialEq)]
pub struct ChainLink {
    /// Zero-based position
    pub position: usize,
    /// The document
    pub document: Document,
    /// Document that must be applied first; `None` for the head
    pub predecessor: Option<DocumentId>,
}

/// Totally ordered sequence of documents
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Chain {
    links: Vec<ChainLink>,
}

impl Chain {
    /// Link `documents` in the order given.
    pub fn from_documents(documents: Vec<Document>) -> Self {
        let mut links: Vec<ChainLink> = Vec::with_capacity(documents.len());
        for (position, document) in documents.into_iter().enumerate() {
            let predecessor = links.last().map(|prev| prev.document.id.clone());
            links.push(ChainLink {
                position,
                document,
                predecessor,
            });
        }
        Self { links }
    }

    /// Number of documents
    pub fn len(&self) -> usize {
        self.links.len()
    }

    /// Whether the chain is empty
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Links in apply order
    pub fn iter(&self) -> impl Iterator<Item = &ChainLink> {
        self.links.iter()
    }

    /// Document ids in apply order
    pub fn ids(&self) -> Vec<&DocumentId> {
        self.links.iter().map(|l| &l.document.id).collect()
    }
}

impl<'a> IntoIterator for &'a Chain {
    type Item = &'a ChainLink;
    type IntoIter = std::slice::Iter<'a, ChainLink>;

    fn into_iter(self) -> Self::IntoIter {
        self.links.iter()
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for link in &self.links {
            write!(
                f,
                "{:>3}  {:<20} {}",
                link.position + 1,
                link.document.id,
                link.document.display_name()
            )?;
            if let Some(prev) = &link.predecessor {
                write!(f, " <- {prev}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::path::Path;

    fn config_map(stem: &str, index: usize, name: &str) -> Document {
        Document::from_value(
            Path::new("/m/x.yaml"),
            stem,
            index,
            json!({ "apiVersion": "v1", "kind": "ConfigMap", "metadata": { "name": name } }),
        )
        .unwrap()
    }

    #[test]
    fn each_link_points_at_the_previous_one() {
        let chain = Chain::from_documents(vec![
            config_map("a", 0, "one"),
            config_map("a", 1, "two"),
            config_map("b", 0, "three"),
        ]);

        let ids: Vec<_> = chain.ids().into_iter().map(DocumentId::as_str).collect();
        assert_eq!(ids, vec!["a0", "a1", "b0"]);

        let preds: Vec<_> = chain
            .iter()
            .map(|l| l.predecessor.as_ref().map(DocumentId::as_str))
            .collect();
        assert_eq!(preds, vec![None, Some("a0"), Some("a1")]);
        assert_eq!(chain.iter().map(|l| l.position).collect::<Vec<_>>(), vec![0, 1, 2]);
    }

    #[test]
    fn display_shows_predecessors() {
        let chain =
            Chain::from_documents(vec![config_map("a", 0, "one"), config_map("b", 0, "two")]);
        let text = chain.to_string();
        let lines: Vec<_> = text.lines().collect();
        assert!(lines[0].ends_with("ConfigMap/one"));
        assert!(lines[1].ends_with("ConfigMap/two <- a0"));
    }

    #[test]
    fn empty_chain() {
        let chain = Chain::from_documents(Vec::new());
        assert!(chain.is_empty());
        assert_eq!(chain.to_string(), "");
    }
}
