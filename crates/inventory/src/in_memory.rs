//! In-memory catalog — useful for testing, demos and `chat` without a database.

use async_trait::async_trait;
use motoasesor_core::error::StoreError;
use motoasesor_core::inventory::{InventoryRow, InventorySource};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::model::Motorcycle;

/// A catalog held in a Vec. Rows can be replaced at runtime.
pub struct StaticInventory {
    rows: Arc<RwLock<Vec<InventoryRow>>>,
}

impl StaticInventory {
    pub fn new(rows: Vec<InventoryRow>) -> Self {
        Self {
            rows: Arc::new(RwLock::new(rows)),
        }
    }

    /// Build from full listings, numbering them from 1.
    pub fn from_listings(listings: &[Motorcycle]) -> Self {
        Self::new(
            listings
                .iter()
                .zip(1..)
                .map(|(bike, id)| bike.to_row(id))
                .collect(),
        )
    }

    pub async fn replace(&self, rows: Vec<InventoryRow>) {
        *self.rows.write().await = rows;
    }
}

impl Default for StaticInventory {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

#[async_trait]
impl InventorySource for StaticInventory {
    fn name(&self) -> &str {
        "static"
    }

    async fn fetch_available(&self) -> Result<Vec<InventoryRow>, StoreError> {
        let mut available: Vec<InventoryRow> = self
            .rows
            .read()
            .await
            .iter()
            .filter(|r| r.stock > 0)
            .cloned()
            .collect();
        available.sort_by_key(|r| r.id);
        Ok(available)
    }
}
