//! `motoasesor catalog` — Print the catalog the way the model sees it.

use motoasesor_relay::{NO_INVENTORY, Persona, format_catalog};

use super::load_config;

pub async fn run(full_prompt: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    let inventory = motoasesor_inventory::connect(&config.inventory).await?;

    let catalog = match inventory.fetch_available().await {
        Ok(rows) => {
            eprintln!("  {} listing(s) in stock from {}", rows.len(), inventory.name());
            format_catalog(&rows)
        }
        Err(e) => {
            eprintln!("  ⚠️  Catalog unavailable: {e}");
            NO_INVENTORY.to_string()
        }
    };

    if full_prompt {
        println!("{}", Persona::from_config(&config.persona).opening_prompt(&catalog));
    } else {
        println!("{catalog}");
    }

    Ok(())
}
