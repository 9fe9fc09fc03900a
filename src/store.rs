use crate::errors::StoreError;
use crate::models::{ImageRow, LinkRow, OrderRow, PurchasePatch, PurchaseRow};
use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::Mutex;

/// The opaque asynchronous record store behind the engine, one method per
/// logical-table operation. Implementations wrap whatever transport the
/// deployment uses; every call may fail with a transport-level error.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Inserts a purchase with its id already assigned. Duplicate ids must
    /// fail with [`StoreError::Conflict`].
    async fn insert_purchase(&self, row: PurchaseRow) -> Result<PurchaseRow, StoreError>;
    async fn update_purchase(&self, id: &str, patch: PurchasePatch) -> Result<(), StoreError>;
    async fn delete_purchase(&self, id: &str) -> Result<(), StoreError>;
    async fn get_purchase(&self, id: &str) -> Result<Option<PurchaseRow>, StoreError>;
    async fn purchases_for_order(&self, order_id: &str) -> Result<Vec<PurchaseRow>, StoreError>;
    async fn all_purchases(&self) -> Result<Vec<PurchaseRow>, StoreError>;

    async fn insert_links(&self, purchase_id: &str, urls: &[String]) -> Result<(), StoreError>;
    async fn delete_links(&self, purchase_id: &str) -> Result<(), StoreError>;
    async fn links_for_purchase(&self, purchase_id: &str) -> Result<Vec<String>, StoreError>;

    async fn insert_images(&self, rows: Vec<ImageRow>) -> Result<(), StoreError>;
    async fn delete_images(&self, ids: &[String]) -> Result<(), StoreError>;
    async fn images_for_purchase(&self, purchase_id: &str) -> Result<Vec<ImageRow>, StoreError>;

    async fn get_order(&self, id: &str) -> Result<Option<OrderRow>, StoreError>;
    async fn all_orders(&self) -> Result<Vec<OrderRow>, StoreError>;
}

/// The opaque blob store. Binary objects are keyed by path; public URLs are
/// derived synchronously from the path alone.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn upload(&self, path: &str, bytes: Vec<u8>) -> Result<(), StoreError>;
    async fn remove(&self, paths: &[String]) -> Result<(), StoreError>;
    fn public_url(&self, path: &str) -> String;
}

#[derive(Default)]
struct Tables {
    purchases: BTreeMap<String, PurchaseRow>,
    links: Vec<LinkRow>,
    images: Vec<ImageRow>,
    orders: BTreeMap<String, OrderRow>,
}

/// In-memory record store. Reference implementation for tests and for
/// embedding callers during development.
#[derive(Default)]
pub struct MemoryRecordStore {
    tables: Mutex<Tables>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds an order row. Order management is outside this engine, so the
    /// memory store only exposes a direct insert.
    pub async fn put_order(&self, order: OrderRow) {
        let mut tables = self.tables.lock().await;
        tables.orders.insert(order.id.clone(), order);
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn insert_purchase(&self, row: PurchaseRow) -> Result<PurchaseRow, StoreError> {
        let mut tables = self.tables.lock().await;
        if tables.purchases.contains_key(&row.id) {
            return Err(StoreError::Conflict(format!("purchase {}", row.id)));
        }
        tables.purchases.insert(row.id.clone(), row.clone());
        Ok(row)
    }

    async fn update_purchase(&self, id: &str, patch: PurchasePatch) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().await;
        match tables.purchases.get_mut(id) {
            Some(row) => {
                patch.apply(row);
                Ok(())
            }
            None => Err(StoreError::NotFound(format!("purchase {id}"))),
        }
    }

    async fn delete_purchase(&self, id: &str) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().await;
        match tables.purchases.remove(id) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound(format!("purchase {id}"))),
        }
    }

    async fn get_purchase(&self, id: &str) -> Result<Option<PurchaseRow>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables.purchases.get(id).cloned())
    }

    async fn purchases_for_order(&self, order_id: &str) -> Result<Vec<PurchaseRow>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .purchases
            .values()
            .filter(|row| row.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn all_purchases(&self) -> Result<Vec<PurchaseRow>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables.purchases.values().cloned().collect())
    }

    async fn insert_links(&self, purchase_id: &str, urls: &[String]) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().await;
        for url in urls {
            tables.links.push(LinkRow {
                purchase_id: purchase_id.to_string(),
                url: url.clone(),
            });
        }
        Ok(())
    }

    async fn delete_links(&self, purchase_id: &str) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().await;
        tables.links.retain(|link| link.purchase_id != purchase_id);
        Ok(())
    }

    async fn links_for_purchase(&self, purchase_id: &str) -> Result<Vec<String>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .links
            .iter()
            .filter(|link| link.purchase_id == purchase_id)
            .map(|link| link.url.clone())
            .collect())
    }

    async fn insert_images(&self, rows: Vec<ImageRow>) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().await;
        for row in &rows {
            if tables.images.iter().any(|existing| existing.id == row.id) {
                return Err(StoreError::Conflict(format!("image {}", row.id)));
            }
        }
        tables.images.extend(rows);
        Ok(())
    }

    async fn delete_images(&self, ids: &[String]) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().await;
        tables.images.retain(|image| !ids.contains(&image.id));
        Ok(())
    }

    async fn images_for_purchase(&self, purchase_id: &str) -> Result<Vec<ImageRow>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .images
            .iter()
            .filter(|image| image.purchase_id == purchase_id)
            .cloned()
            .collect())
    }

    async fn get_order(&self, id: &str) -> Result<Option<OrderRow>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables.orders.get(id).cloned())
    }

    async fn all_orders(&self) -> Result<Vec<OrderRow>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables.orders.values().cloned().collect())
    }
}

/// In-memory blob store keyed by path.
#[derive(Default)]
pub struct MemoryBlobStore {
    objects: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn contains(&self, path: &str) -> bool {
        self.objects.lock().await.contains_key(path)
    }

    pub async fn object_count(&self) -> usize {
        self.objects.lock().await.len()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn upload(&self, path: &str, bytes: Vec<u8>) -> Result<(), StoreError> {
        self.objects.lock().await.insert(path.to_string(), bytes);
        Ok(())
    }

    async fn remove(&self, paths: &[String]) -> Result<(), StoreError> {
        let mut objects = self.objects.lock().await;
        for path in paths {
            objects.remove(path);
        }
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        format!("memory://{path}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn purchase(id: &str) -> PurchaseRow {
        PurchaseRow {
            id: id.into(),
            order_id: "o1".into(),
            customer_id: "c1".into(),
            customer_name: "Sara".into(),
            qty: 1,
            price: 10.0,
            paid_price: None,
            bag_size: String::new(),
            pickup_point: String::new(),
            note: String::new(),
            picked_up: false,
            picked_up_at: None,
            collected: false,
            collected_at: None,
            created_at: "2026-03-01T10:00:00Z".into(),
        }
    }

    #[tokio::test]
    async fn duplicate_purchase_id_conflicts() {
        let store = MemoryRecordStore::new();
        store.insert_purchase(purchase("p1")).await.unwrap();
        let err = store.insert_purchase(purchase("p1")).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn links_keep_insertion_order() {
        let store = MemoryRecordStore::new();
        let urls = vec!["https://b.com/".to_string(), "https://a.com/".to_string()];
        store.insert_links("p1", &urls).await.unwrap();
        assert_eq!(store.links_for_purchase("p1").await.unwrap(), urls);

        store.delete_links("p1").await.unwrap();
        assert!(store.links_for_purchase("p1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn patch_reaches_stored_row() {
        let store = MemoryRecordStore::new();
        store.insert_purchase(purchase("p1")).await.unwrap();
        let patch = PurchasePatch {
            paid_price: Some(Some(8.0)),
            ..PurchasePatch::default()
        };
        store.update_purchase("p1", patch).await.unwrap();
        let row = store.get_purchase("p1").await.unwrap().unwrap();
        assert_eq!(row.paid_price, Some(8.0));

        let err = store
            .update_purchase("missing", PurchasePatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn blob_store_round_trip() {
        let blobs = MemoryBlobStore::new();
        blobs.upload("o1/p1/a.jpg", vec![1, 2, 3]).await.unwrap();
        assert!(blobs.contains("o1/p1/a.jpg").await);
        assert_eq!(blobs.public_url("o1/p1/a.jpg"), "memory://o1/p1/a.jpg");
        blobs.remove(&["o1/p1/a.jpg".to_string()]).await.unwrap();
        assert_eq!(blobs.object_count().await, 0);
    }
}
