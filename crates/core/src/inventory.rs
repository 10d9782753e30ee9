//! Inventory trait — read access to the dealership catalog.
//!
//! The relay only ever asks one question of the store: "which motorcycles are
//! in stock right now?". Everything else about the schema is the store's
//! business.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::StoreError;

/// A read-only snapshot of one catalog item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryRow {
    /// Catalog identifier
    pub id: i64,

    /// Manufacturer (e.g. "Honda")
    pub brand: String,

    /// Model name (e.g. "CB500F")
    pub model: String,

    /// Engine displacement in cubic centimetres
    pub displacement_cc: i32,

    /// List price
    pub price: f64,

    /// Category (e.g. "Naked", "Deportiva", "Scooter")
    pub category: String,

    /// Units available for sale
    pub stock: i32,
}

/// The core InventorySource trait.
#[async_trait]
pub trait InventorySource: Send + Sync {
    /// Backend name (e.g., "sqlite", "mysql", "static").
    fn name(&self) -> &str;

    /// Fetch every row with `stock > 0`, ordered by identifier.
    async fn fetch_available(&self) -> std::result::Result<Vec<InventoryRow>, StoreError>;

    /// Health check — can the store be queried?
    async fn health_check(&self) -> std::result::Result<bool, StoreError> {
        self.fetch_available().await.map(|_| true)
    }
}
