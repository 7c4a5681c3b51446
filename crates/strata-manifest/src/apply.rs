//! Chained apply against a target cluster

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use tracing::{error, info};

use crate::chain::{Chain, ChainLink};
use crate::document::DocumentId;
use crate::error::{ChainApplyError, TargetError};

/// System that accepts documents one at a time
///
/// Implementations must record `link.predecessor` as a dependency of the
/// applied resource and must not return before the document is durably
/// accepted.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ManifestTarget: Send + Sync {
    /// Apply one chain element.
    async fn apply(&self, link: &ChainLink) -> Result<(), TargetError>;
}

/// Outcome of a fully applied chain
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ApplyReport {
    /// Ids applied, in order
    pub applied: Vec<DocumentId>,
}

/// Apply `chain` in order, stopping at the first failure.
///
/// Documents applied before the failure are left in place. Applying the same
/// chain again after fixing the cause is safe as long as the target treats
/// re-applying an unchanged document as a no-op.
pub async fn apply_chain<T>(chain: &Chain, target: &T) -> Result<ApplyReport, ChainApplyError>
where
    T: ManifestTarget + ?Sized,
{
    let total = chain.len();
    let mut report = ApplyReport::default();

    for link in chain {
        let doc = &link.document;
        if let Err(source) = target.apply(link).await {
            error!(
                id = %doc.id,
                resource = %doc.display_name(),
                position = link.position + 1,
                total,
                error = %source,
                "document failed, halting chain"
            );
            return Err(ChainApplyError {
                id: doc.id.clone(),
                position: link.position,
                total,
                applied: report.applied,
                source,
            });
        }

        info!(
            id = %doc.id,
            resource = %doc.display_name(),
            position = link.position + 1,
            total,
            "document applied"
        );
        report.applied.push(doc.id.clone());
    }

    Ok(report)
}
