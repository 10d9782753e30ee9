//! SQLite catalog store.
//!
//! Holds the `motocicletas` table in a single database file. The table is
//! created on open if it does not exist yet.

use async_trait::async_trait;
use motoasesor_core::error::StoreError;
use motoasesor_core::inventory::{InventoryRow, InventorySource};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::{debug, info};

use crate::model::Motorcycle;

const FETCH_AVAILABLE: &str = r#"
    SELECT ID,
           COALESCE(Marca, '') AS Marca,
           COALESCE(Modelo, '') AS Modelo,
           COALESCE(Cilindrada, 0) AS Cilindrada,
           COALESCE(Precio, 0.0) AS Precio,
           COALESCE(Tipo, '') AS Tipo,
           Stock_Disponible
    FROM motocicletas
    WHERE Stock_Disponible > 0
    ORDER BY ID
"#;

/// A SQLite-backed catalog.
pub struct SqliteInventory {
    pool: SqlitePool,
}

impl SqliteInventory {
    /// Open (or create) the catalog at `url`.
    ///
    /// Accepts `sqlite://path/to/catalog.db` or `sqlite::memory:`.
    pub async fn new(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| StoreError::Unavailable(format!("Invalid SQLite URL: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        // Every connection to `:memory:` is a separate database.
        let in_memory = url.contains(":memory:");
        let mut pool_options = SqlitePoolOptions::new()
            .max_connections(if in_memory { 1 } else { max_connections.max(1) });
        if in_memory {
            pool_options = pool_options.idle_timeout(None).max_lifetime(None);
        }

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Unavailable(format!("Failed to open SQLite: {e}")))?;

        let store = Self { pool };
        store.run_migrations().await?;
        info!("SQLite catalog opened at {url}");
        Ok(store)
    }

    /// Create from an existing pool (useful for testing).
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS motocicletas (
                ID               INTEGER PRIMARY KEY AUTOINCREMENT,
                Marca            TEXT,
                Modelo           TEXT,
                Cilindrada       INTEGER,
                Color            TEXT,
                "Año"            INTEGER,
                Precio           REAL,
                Tipo             TEXT,
                Stock_Disponible INTEGER,
                Estado           TEXT,
                Pais_Origen      TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("motocicletas table: {e}")))?;

        debug!("SQLite catalog schema ready");
        Ok(())
    }

    /// Add a listing and return its identifier.
    pub async fn insert(&self, bike: &Motorcycle) -> Result<i64, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO motocicletas
                (Marca, Modelo, Cilindrada, Color, "Año", Precio, Tipo,
                 Stock_Disponible, Estado, Pais_Origen)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&bike.brand)
        .bind(&bike.model)
        .bind(bike.displacement_cc)
        .bind(&bike.color)
        .bind(bike.year)
        .bind(bike.price)
        .bind(&bike.category)
        .bind(bike.stock)
        .bind(&bike.condition)
        .bind(&bike.origin_country)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(format!("insert listing: {e}")))?;

        Ok(result.last_insert_rowid())
    }

    /// Number of listings, in stock or not.
    pub async fn count(&self) -> Result<usize, StoreError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM motocicletas")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(e.to_string()))?;
        let n: i64 = row
            .try_get("n")
            .map_err(|e| StoreError::QueryFailed(e.to_string()))?;
        Ok(n as usize)
    }

    /// Set the available quantity of a listing.
    pub async fn set_stock(&self, id: i64, stock: i32) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE motocicletas SET Stock_Disponible = ? WHERE ID = ?")
            .bind(stock)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("update stock: {e}")))?;
        Ok(result.rows_affected() > 0)
    }

    fn row_to_inventory(row: &SqliteRow) -> Result<InventoryRow, StoreError> {
        let column = |name: &str, e: sqlx::Error| StoreError::QueryFailed(format!("{name} column: {e}"));

        Ok(InventoryRow {
            id: row.try_get("ID").map_err(|e| column("ID", e))?,
            brand: row.try_get("Marca").map_err(|e| column("Marca", e))?,
            model: row.try_get("Modelo").map_err(|e| column("Modelo", e))?,
            displacement_cc: row.try_get("Cilindrada").map_err(|e| column("Cilindrada", e))?,
            price: row.try_get("Precio").map_err(|e| column("Precio", e))?,
            category: row.try_get("Tipo").map_err(|e| column("Tipo", e))?,
            stock: row
                .try_get("Stock_Disponible")
                .map_err(|e| column("Stock_Disponible", e))?,
        })
    }
}

#[async_trait]
impl InventorySource for SqliteInventory {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn fetch_available(&self) -> Result<Vec<InventoryRow>, StoreError> {
        let rows = sqlx::query(FETCH_AVAILABLE)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::Unavailable(format!("fetch catalog: {e}")))?;

        let items = rows
            .iter()
            .map(Self::row_to_inventory)
            .collect::<Result<Vec<_>, _>>()?;
        debug!(rows = items.len(), "Fetched available catalog");
        Ok(items)
    }

    async fn health_check(&self) -> Result<bool, StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| true)
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }
}
