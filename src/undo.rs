use crate::errors::{LedgerError, StoreError};
use crate::links::sanitize_links;
use crate::models::{ImageRef, ImageRow, PurchaseRow};
use crate::store::RecordStore;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Point-in-time copy of a purchase taken just before deletion. The caller
/// owns it: feed it back into [`restore`] to undo, drop it to forget. Not
/// safe to restore from two callers at once; the second insert conflicts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteSnapshot {
    pub purchase: PurchaseRow,
    pub links: Vec<String>,
    pub images: Vec<ImageRef>,
}

/// Snapshots the purchase with its links and image metadata, then deletes
/// it. The purchase row goes first: if that delete fails, nothing has been
/// removed and the error propagates. Once the row is gone the snapshot is
/// returned no matter what, so dependent-row cleanup failures are contained
/// (the rows are orphaned, logged, and re-adopted by [`restore`]). Blobs
/// are left in storage on purpose; that is what lets [`restore`] skip
/// re-uploading.
pub async fn capture_and_delete(
    records: &dyn RecordStore,
    purchase_id: &str,
) -> Result<DeleteSnapshot, LedgerError> {
    let purchase = records
        .get_purchase(purchase_id)
        .await
        .map_err(LedgerError::at_step("purchase fetch"))?
        .ok_or_else(|| LedgerError::Persistence {
            step: "purchase fetch",
            source: StoreError::NotFound(format!("purchase {purchase_id}")),
        })?;
    let links = records
        .links_for_purchase(purchase_id)
        .await
        .map_err(LedgerError::at_step("link fetch"))?;
    let images: Vec<ImageRef> = records
        .images_for_purchase(purchase_id)
        .await
        .map_err(LedgerError::at_step("image fetch"))?
        .into_iter()
        .map(|row| ImageRef {
            id: row.id,
            storage_path: row.storage_path,
        })
        .collect();
    let snapshot = DeleteSnapshot {
        purchase,
        links,
        images,
    };

    records
        .delete_purchase(purchase_id)
        .await
        .map_err(LedgerError::at_step("purchase delete"))?;

    if let Err(err) = records.delete_links(purchase_id).await {
        warn!(purchase = %purchase_id, error = %err, "link rows left behind on delete");
    }
    let image_ids: Vec<String> = snapshot.images.iter().map(|image| image.id.clone()).collect();
    if let Err(err) = records.delete_images(&image_ids).await {
        warn!(purchase = %purchase_id, error = %err, "image rows left behind on delete");
    }

    info!(purchase = %purchase_id, "purchase deleted, snapshot captured");
    Ok(snapshot)
}

/// Replays a snapshot: the purchase row with its original id, its sanitized
/// links (full replace, so rows a failed cleanup left behind are not
/// duplicated), and every image metadata row that still names a storage
/// path and is not already present. Binary objects are not re-uploaded
/// (the delete path never removes them). Restoring the same snapshot twice
/// fails with [`LedgerError::RestoreConflict`] on the second call.
pub async fn restore(
    records: &dyn RecordStore,
    snapshot: &DeleteSnapshot,
) -> Result<(), LedgerError> {
    match records.insert_purchase(snapshot.purchase.clone()).await {
        Ok(_) => {}
        Err(StoreError::Conflict(_)) => {
            return Err(LedgerError::RestoreConflict(snapshot.purchase.id.clone()));
        }
        Err(source) => {
            return Err(LedgerError::Persistence {
                step: "purchase insert",
                source,
            });
        }
    }

    let links = sanitize_links(&snapshot.links);
    records
        .delete_links(&snapshot.purchase.id)
        .await
        .map_err(LedgerError::at_step("link replace"))?;
    records
        .insert_links(&snapshot.purchase.id, &links)
        .await
        .map_err(LedgerError::at_step("link replace"))?;

    let existing: Vec<ImageRow> = records
        .images_for_purchase(&snapshot.purchase.id)
        .await
        .map_err(LedgerError::at_step("image fetch"))?;
    let rows: Vec<ImageRow> = snapshot
        .images
        .iter()
        .filter(|image| !image.storage_path.trim().is_empty())
        .filter(|image| !existing.iter().any(|row| row.id == image.id))
        .map(|image| ImageRow {
            id: image.id.clone(),
            purchase_id: snapshot.purchase.id.clone(),
            storage_path: image.storage_path.clone(),
        })
        .collect();
    if !rows.is_empty() {
        records
            .insert_images(rows)
            .await
            .map_err(LedgerError::at_step("image row insert"))?;
    }

    info!(purchase = %snapshot.purchase.id, "purchase restored from snapshot");
    Ok(())
}
