pub mod dates;
pub mod errors;
pub mod links;
pub mod media;
pub mod models;
pub mod months;
pub mod stats;
pub mod status;
pub mod store;
pub mod undo;
pub mod writer;

pub use errors::{LedgerError, StoreError};
pub use links::sanitize_links;
pub use media::{UPLOAD_CONCURRENCY, UploadCandidate, UploadOutcome};
pub use models::{
    ImageRef, NewPurchase, OrderRow, PickupPoint, Purchase, PurchasePatch, PurchaseRow,
    validate_new_purchase,
};
pub use months::{MonthBucket, MonthlyOverview, aggregate_months};
pub use stats::{OrderStats, build_order_stats};
pub use status::{OrderStatus, StatusVariant, classify_order};
pub use store::{BlobStore, MemoryBlobStore, MemoryRecordStore, RecordStore};
pub use undo::{DeleteSnapshot, capture_and_delete, restore};
pub use writer::{PurchaseWriter, StepFailure, WriteReport};
