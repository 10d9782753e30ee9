//! `motoasesor doctor` — Diagnose system health.

use motoasesor_channels::WhatsAppChannel;
use motoasesor_config::AppConfig;
use motoasesor_core::Channel;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("🩺 MotoAsesor Doctor — System Diagnostics");
    println!("=========================================\n");

    let mut issues = 0;

    let config_path = AppConfig::config_dir().join("config.toml");
    if !config_path.exists() {
        println!("  ⚠️  No config file — run `motoasesor onboard` (using defaults)");
        issues += 1;
    }

    let config = match AppConfig::load() {
        Ok(config) => {
            println!("  ✅ Config valid");
            config
        }
        Err(e) => {
            println!("  ❌ Config file invalid: {e}");
            println!("\n  ⚠️  1 issue(s) found; fix the config before running other checks.");
            return Ok(());
        }
    };

    if config.has_api_key() {
        println!("  ✅ API key configured for {}", config.default_provider);
    } else {
        println!("  ⚠️  No API key configured — add api_key to config.toml or set GEMINI_API_KEY");
        issues += 1;
    }

    match motoasesor_inventory::connect(&config.inventory).await {
        Ok(store) => match store.fetch_available().await {
            Ok(rows) if rows.is_empty() => {
                println!("  ⚠️  Catalog ({}) reachable but has nothing in stock", store.name());
                issues += 1;
            }
            Ok(rows) => println!("  ✅ Catalog ({}): {} listing(s) in stock", store.name(), rows.len()),
            Err(e) => {
                println!("  ❌ Catalog query failed: {e}");
                issues += 1;
            }
        },
        Err(e) => {
            println!("  ❌ Catalog unavailable: {e}");
            issues += 1;
        }
    }

    let bridge = WhatsAppChannel::new(config.whatsapp.clone());
    match bridge.health_check().await {
        Ok(true) => println!("  ✅ WhatsApp bridge connected ({})", config.whatsapp.api_url),
        Ok(false) => {
            println!(
                "  ⚠️  WhatsApp bridge reachable but instance '{}' is not connected",
                config.whatsapp.instance_name
            );
            issues += 1;
        }
        Err(e) => {
            println!("  ❌ WhatsApp bridge unreachable: {e}");
            issues += 1;
        }
    }

    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
