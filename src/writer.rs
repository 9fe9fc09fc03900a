use crate::errors::{LedgerError, StoreError};
use crate::links::sanitize_links;
use crate::media::{self, UploadCandidate};
use crate::models::{
    ImageRef, ImageRow, NewPurchase, Purchase, PurchaseImage, PurchasePatch, PurchaseRow,
};
use crate::store::{BlobStore, RecordStore};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// One step of the write pipeline. Required steps abort the whole operation
/// on failure; best-effort steps degrade into the report's error list. The
/// backing store has no multi-record transactions, so committed earlier
/// steps are never rolled back either way.
#[derive(Debug, Clone, Copy)]
struct StepSpec {
    name: &'static str,
    aborts_on_failure: bool,
}

const INSERT_PURCHASE: StepSpec = StepSpec { name: "purchase insert", aborts_on_failure: true };
const PATCH_PURCHASE: StepSpec = StepSpec { name: "purchase patch", aborts_on_failure: true };
const FETCH_PURCHASE: StepSpec = StepSpec { name: "purchase fetch", aborts_on_failure: true };
const REPLACE_LINKS: StepSpec = StepSpec { name: "link replace", aborts_on_failure: true };
const REMOVE_BLOBS: StepSpec = StepSpec { name: "blob removal", aborts_on_failure: false };
const DELETE_IMAGE_ROWS: StepSpec = StepSpec { name: "image row delete", aborts_on_failure: false };
const INSERT_IMAGE_ROWS: StepSpec = StepSpec { name: "image row insert", aborts_on_failure: false };

/// A contained best-effort failure. `file_name` is set for per-file upload
/// failures so the presentation layer can name the exact file.
#[derive(Debug, Clone, Serialize)]
pub struct StepFailure {
    pub step: &'static str,
    pub file_name: Option<String>,
    pub message: String,
}

/// Outcome of a create or update: the written purchase plus any contained
/// media failures. An empty `upload_errors` means full success; a non-empty
/// one means partial success, never silent loss.
#[derive(Debug)]
pub struct WriteReport {
    pub purchase: Purchase,
    pub upload_errors: Vec<StepFailure>,
}

/// Orchestrates purchase writes together with their dependent link and
/// image records as a best-effort multi-step sequence. Assumes validated
/// input (`validate_new_purchase` is the caller's job).
pub struct PurchaseWriter {
    records: Arc<dyn RecordStore>,
    blobs: Arc<dyn BlobStore>,
}

impl PurchaseWriter {
    pub fn new(records: Arc<dyn RecordStore>, blobs: Arc<dyn BlobStore>) -> Self {
        Self { records, blobs }
    }

    /// Creates a purchase, then its links, then uploads and records its
    /// images. A purchase-insert or link-insert failure aborts; media
    /// failures are reported in the result instead.
    pub async fn create<F>(
        &self,
        fields: NewPurchase,
        links: Vec<String>,
        files: Vec<UploadCandidate>,
        on_progress: F,
    ) -> Result<WriteReport, LedgerError>
    where
        F: FnMut(usize, usize),
    {
        let row = PurchaseRow {
            id: Uuid::new_v4().to_string(),
            order_id: fields.order_id,
            customer_id: fields.customer_id,
            customer_name: fields.customer_name,
            qty: fields.qty,
            price: fields.price,
            paid_price: fields.paid_price,
            bag_size: fields.bag_size,
            pickup_point: fields.pickup_point,
            note: fields.note,
            picked_up: false,
            picked_up_at: None,
            collected: false,
            collected_at: None,
            created_at: Utc::now().to_rfc3339(),
        };
        let row = required(INSERT_PURCHASE, self.records.insert_purchase(row).await)?;
        info!(purchase = %row.id, order = %row.order_id, "purchase created");

        let links = sanitize_links(&links);
        required(
            REPLACE_LINKS,
            self.records.insert_links(&row.id, &links).await,
        )?;

        let mut upload_errors = Vec::new();
        let images = self
            .ingest_media(&row.order_id, &row.id, files, on_progress, &mut upload_errors)
            .await;

        Ok(WriteReport {
            purchase: Purchase { row, links, images },
            upload_errors,
        })
    }

    /// Patches a purchase, replaces its links wholesale, removes flagged
    /// images (blobs first, then rows), then uploads and records new files.
    pub async fn update<F>(
        &self,
        purchase_id: &str,
        patch: PurchasePatch,
        links: Vec<String>,
        images_to_remove: Vec<ImageRef>,
        new_files: Vec<UploadCandidate>,
        on_progress: F,
    ) -> Result<WriteReport, LedgerError>
    where
        F: FnMut(usize, usize),
    {
        required(
            PATCH_PURCHASE,
            self.records.update_purchase(purchase_id, patch).await,
        )?;
        let row = self.fetch_row(purchase_id).await?;

        // full replace, not a diff
        let links = sanitize_links(&links);
        required(REPLACE_LINKS, self.records.delete_links(purchase_id).await)?;
        required(
            REPLACE_LINKS,
            self.records.insert_links(purchase_id, &links).await,
        )?;

        let mut upload_errors = Vec::new();
        if !images_to_remove.is_empty() {
            let paths: Vec<String> = images_to_remove
                .iter()
                .filter(|image| !image.storage_path.trim().is_empty())
                .map(|image| image.storage_path.clone())
                .collect();
            best_effort(
                REMOVE_BLOBS,
                self.blobs.remove(&paths).await,
                &mut upload_errors,
            );
            let ids: Vec<String> = images_to_remove
                .iter()
                .map(|image| image.id.clone())
                .collect();
            best_effort(
                DELETE_IMAGE_ROWS,
                self.records.delete_images(&ids).await,
                &mut upload_errors,
            );
        }

        self.ingest_media(&row.order_id, purchase_id, new_files, on_progress, &mut upload_errors)
            .await;

        let images = required(
            FETCH_PURCHASE,
            self.records.images_for_purchase(purchase_id).await,
        )?
        .into_iter()
        .map(|image| self.to_purchase_image(image))
        .collect();
        info!(purchase = %purchase_id, "purchase updated");

        Ok(WriteReport {
            purchase: Purchase { row, links, images },
            upload_errors,
        })
    }

    /// Reads a purchase joined with its links and images.
    pub async fn fetch(&self, purchase_id: &str) -> Result<Option<Purchase>, LedgerError> {
        let Some(row) = self
            .records
            .get_purchase(purchase_id)
            .await
            .map_err(LedgerError::at_step(FETCH_PURCHASE.name))?
        else {
            return Ok(None);
        };
        let links = self
            .records
            .links_for_purchase(purchase_id)
            .await
            .map_err(LedgerError::at_step(FETCH_PURCHASE.name))?;
        let images = self
            .records
            .images_for_purchase(purchase_id)
            .await
            .map_err(LedgerError::at_step(FETCH_PURCHASE.name))?
            .into_iter()
            .map(|image| self.to_purchase_image(image))
            .collect();
        Ok(Some(Purchase { row, links, images }))
    }

    /// Records (or clears) the amount actually collected for one purchase.
    pub async fn set_paid_price(
        &self,
        purchase_id: &str,
        paid_price: Option<f64>,
    ) -> Result<(), LedgerError> {
        let patch = PurchasePatch {
            paid_price: Some(paid_price),
            ..PurchasePatch::default()
        };
        required(
            PATCH_PURCHASE,
            self.records.update_purchase(purchase_id, patch).await,
        )
    }

    pub async fn set_bag_size(&self, purchase_id: &str, bag_size: &str) -> Result<(), LedgerError> {
        let patch = PurchasePatch {
            bag_size: Some(bag_size.to_string()),
            ..PurchasePatch::default()
        };
        required(
            PATCH_PURCHASE,
            self.records.update_purchase(purchase_id, patch).await,
        )
    }

    /// Toggles pickup. Clearing pickup also clears collection: collected
    /// implies picked up.
    pub async fn set_picked_up(
        &self,
        purchase_id: &str,
        picked_up: bool,
    ) -> Result<(), LedgerError> {
        let patch = if picked_up {
            PurchasePatch {
                picked_up: Some(true),
                picked_up_at: Some(Some(Utc::now().to_rfc3339())),
                ..PurchasePatch::default()
            }
        } else {
            PurchasePatch {
                picked_up: Some(false),
                picked_up_at: Some(None),
                collected: Some(false),
                collected_at: Some(None),
                ..PurchasePatch::default()
            }
        };
        required(
            PATCH_PURCHASE,
            self.records.update_purchase(purchase_id, patch).await,
        )
    }

    /// Toggles collection. Marking collected also marks pickup if the row
    /// was not picked up yet; clearing collection leaves pickup alone.
    pub async fn set_collected(
        &self,
        purchase_id: &str,
        collected: bool,
    ) -> Result<(), LedgerError> {
        let patch = if collected {
            let row = self.fetch_row(purchase_id).await?;
            let now = Utc::now().to_rfc3339();
            PurchasePatch {
                collected: Some(true),
                collected_at: Some(Some(now.clone())),
                picked_up: Some(true),
                picked_up_at: if row.picked_up { None } else { Some(Some(now)) },
                ..PurchasePatch::default()
            }
        } else {
            PurchasePatch {
                collected: Some(false),
                collected_at: Some(None),
                ..PurchasePatch::default()
            }
        };
        required(
            PATCH_PURCHASE,
            self.records.update_purchase(purchase_id, patch).await,
        )
    }

    async fn fetch_row(&self, purchase_id: &str) -> Result<PurchaseRow, LedgerError> {
        self.records
            .get_purchase(purchase_id)
            .await
            .map_err(LedgerError::at_step(FETCH_PURCHASE.name))?
            .ok_or_else(|| LedgerError::Persistence {
                step: FETCH_PURCHASE.name,
                source: StoreError::NotFound(format!("purchase {purchase_id}")),
            })
    }

    /// Runs the upload pipeline and records metadata rows for whatever it
    /// uploaded. The blobs already exist by the time a metadata insert can
    /// fail, so that failure is reported, not thrown.
    async fn ingest_media<F>(
        &self,
        order_id: &str,
        purchase_id: &str,
        files: Vec<UploadCandidate>,
        on_progress: F,
        upload_errors: &mut Vec<StepFailure>,
    ) -> Vec<PurchaseImage>
    where
        F: FnMut(usize, usize),
    {
        let prefix = format!("{order_id}/{purchase_id}");
        let outcome = media::upload_images(self.blobs.as_ref(), &prefix, files, on_progress).await;
        for failure in outcome.errors {
            upload_errors.push(StepFailure {
                step: "image upload",
                file_name: Some(failure.file_name),
                message: failure.message,
            });
        }
        if outcome.uploaded_paths.is_empty() {
            return Vec::new();
        }

        let rows: Vec<ImageRow> = outcome
            .uploaded_paths
            .iter()
            .map(|path| ImageRow {
                id: Uuid::new_v4().to_string(),
                purchase_id: purchase_id.to_string(),
                storage_path: path.clone(),
            })
            .collect();
        match self.records.insert_images(rows.clone()).await {
            Ok(()) => rows
                .into_iter()
                .map(|row| self.to_purchase_image(row))
                .collect(),
            Err(source) => {
                warn!(step = INSERT_IMAGE_ROWS.name, error = %source, "best-effort step failed");
                upload_errors.push(StepFailure {
                    step: INSERT_IMAGE_ROWS.name,
                    file_name: None,
                    message: source.to_string(),
                });
                Vec::new()
            }
        }
    }

    fn to_purchase_image(&self, row: ImageRow) -> PurchaseImage {
        PurchaseImage {
            public_url: self.blobs.public_url(&row.storage_path),
            id: row.id,
            storage_path: row.storage_path,
        }
    }
}

fn required<T>(step: StepSpec, result: Result<T, StoreError>) -> Result<T, LedgerError> {
    debug_assert!(step.aborts_on_failure);
    result.map_err(|source| {
        error!(step = step.name, error = %source, "required write step failed");
        LedgerError::Persistence {
            step: step.name,
            source,
        }
    })
}

fn best_effort(step: StepSpec, result: Result<(), StoreError>, errors: &mut Vec<StepFailure>) {
    debug_assert!(!step.aborts_on_failure);
    if let Err(source) = result {
        warn!(step = step.name, error = %source, "best-effort step failed");
        errors.push(StepFailure {
            step: step.name,
            file_name: None,
            message: source.to_string(),
        });
    }
}
