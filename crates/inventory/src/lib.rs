//! Catalog stores for MotoAsesor.
//!
//! Every store reads the dealership's `motocicletas` table and implements
//! `motoasesor_core::InventorySource`.

pub mod in_memory;
pub mod model;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "mysql")]
pub mod mysql;

pub use in_memory::StaticInventory;
pub use model::{Motorcycle, demo_catalog};

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteInventory;

#[cfg(feature = "mysql")]
pub use mysql::MySqlInventory;

use motoasesor_config::InventoryConfig;
use motoasesor_core::{InventorySource, StoreError};
use std::sync::Arc;

/// Open the store named by `config.backend`, creating the table if missing.
pub async fn connect(config: &InventoryConfig) -> Result<Arc<dyn InventorySource>, StoreError> {
    match config.backend.as_str() {
        #[cfg(feature = "sqlite")]
        "sqlite" => Ok(Arc::new(
            SqliteInventory::new(&config.database_url, config.max_connections).await?,
        )),
        #[cfg(feature = "mysql")]
        "mysql" => Ok(Arc::new(
            MySqlInventory::connect(&config.database_url, config.max_connections).await?,
        )),
        other => Err(StoreError::Unavailable(format!(
            "inventory backend '{other}' is not available in this build"
        ))),
    }
}
