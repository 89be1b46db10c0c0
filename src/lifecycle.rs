//! Install and uninstall.

use crate::blocks::strip_annotations;
use crate::defaults::{ConfigStore, DefaultSection};
use crate::model::{NOTICE_DOCUMENT, SETTINGS_DOCUMENT, STYLE_DOCUMENT};
use crate::store::{ContentRepository, DocumentStore, StoreError};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("activation failed: could not write {document}: {source}")]
    Activation {
        document: &'static str,
        #[source]
        source: StoreError,
    },

    #[error("uninstall failed: {0}")]
    Uninstall(#[from] StoreError),
}

/// Summary of an uninstall run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UninstallReport {
    pub posts_scanned: usize,
    pub posts_updated: usize,
}

/// Write the default settings and style documents where none exist yet.
/// Existing documents are left alone.
pub async fn activate(
    store: &dyn DocumentStore,
    defaults: &ConfigStore,
) -> Result<(), LifecycleError> {
    let documents = [
        (SETTINGS_DOCUMENT, DefaultSection::OptionsDefault),
        (STYLE_DOCUMENT, DefaultSection::StylesDefault),
    ];

    for (document, section) in documents {
        let existing = store
            .read_document(document)
            .await
            .map_err(|source| LifecycleError::Activation { document, source })?;
        if existing.is_some() {
            continue;
        }

        store
            .write_document(document, defaults.get(section))
            .await
            .map_err(|source| LifecycleError::Activation { document, source })?;
        info!("Wrote default {} document", document);
    }

    Ok(())
}

/// Delete every persisted document and strip block annotations from all
/// posts.
pub async fn uninstall(
    store: &dyn DocumentStore,
    posts: &dyn ContentRepository,
) -> Result<UninstallReport, LifecycleError> {
    for document in [SETTINGS_DOCUMENT, STYLE_DOCUMENT, NOTICE_DOCUMENT] {
        store.delete_document(document).await?;
    }

    let mut report = UninstallReport::default();
    for post in posts.list_posts().await? {
        report.posts_scanned += 1;
        let Some(stripped) = strip_annotations(&post.content) else {
            continue;
        };
        match posts.update_post(post.id, &stripped).await {
            Ok(()) => report.posts_updated += 1,
            Err(StoreError::PostNotFound(id)) => warn!("Post {} vanished during uninstall", id),
            Err(e) => return Err(e.into()),
        }
    }

    info!(
        "Uninstall complete: {} posts scanned, {} updated",
        report.posts_scanned, report.posts_updated
    );
    Ok(report)
}
