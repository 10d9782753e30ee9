//! `motoasesor onboard` — First-time setup.

use motoasesor_config::AppConfig;
use motoasesor_core::StoreError;
use motoasesor_inventory::{SqliteInventory, demo_catalog};

use super::ensure_catalog_dir;

pub async fn run(seed: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");

    println!("🏍️  MotoAsesor — First-Time Setup");
    println!("=================================\n");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("✅ Created config directory: {}", config_dir.display());
    } else {
        println!("  Config directory exists: {}", config_dir.display());
    }

    if config_path.exists() {
        println!("\n⚠️  Config already exists at: {}", config_path.display());
        println!("   Edit it manually or delete and re-run onboard.\n");
    } else {
        std::fs::write(&config_path, AppConfig::default_toml())?;
        println!("✅ Created config.toml at: {}", config_path.display());
    }

    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    if config.inventory.backend == "sqlite" {
        ensure_catalog_dir(&config)?;
        let (total, seeded) = prepare_catalog(&config.inventory.database_url, seed).await?;
        println!("✅ Catalog ready at {} ({total} listing(s))", config.inventory.database_url);
        if seeded > 0 {
            println!("✅ Seeded {seeded} demo listing(s)");
        } else if seed {
            println!("   Catalog already has listings; demo seed skipped");
        }
    } else {
        println!(
            "  Using the {} catalog at DATABASE_URL; nothing to create",
            config.inventory.backend
        );
    }

    println!("\n📝 Next steps:");
    println!("   1. Add your Gemini key to {} (or set GEMINI_API_KEY)", config_path.display());
    println!("   2. Point the WhatsApp bridge webhook at /webhook/whatsapp");
    println!("   3. Run: motoasesor serve   (or `motoasesor chat` to try it locally)\n");

    Ok(())
}

/// Open (creating if needed) the SQLite catalog and optionally seed it.
///
/// Demo listings only go into an empty catalog. Returns the row count after
/// seeding and how many rows were inserted.
pub(crate) async fn prepare_catalog(url: &str, seed: bool) -> Result<(usize, usize), StoreError> {
    let store = SqliteInventory::new(url, 1).await?;
    let mut seeded = 0;
    if seed && store.count().await? == 0 {
        for bike in demo_catalog() {
            store.insert(&bike).await?;
            seeded += 1;
        }
    }
    Ok((store.count().await?, seeded))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn seeds_empty_catalog() {
        let (total, seeded) = prepare_catalog("sqlite::memory:", true).await.unwrap();
        assert_eq!(seeded, demo_catalog().len());
        assert_eq!(total, seeded);
    }

    #[tokio::test]
    async fn no_seed_leaves_catalog_empty() {
        let (total, seeded) = prepare_catalog("sqlite::memory:", false).await.unwrap();
        assert_eq!((total, seeded), (0, 0));
    }
}
