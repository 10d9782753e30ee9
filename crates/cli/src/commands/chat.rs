//! `motoasesor chat` — Talk to the advisor from the terminal.
//!
//! Runs the same router the gateway uses, with the terminal as transport.

use std::sync::Arc;

use motoasesor_channels::CliChannel;
use motoasesor_core::{Channel, EventBus};

use super::{ensure_catalog_dir, load_config};

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;

    if !config.has_api_key() {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    GEMINI_API_KEY=...        (Gemini, the default backend)");
        eprintln!("    OPENAI_API_KEY=...        (with default_provider = \"openai\")");
        eprintln!("    MOTOASESOR_API_KEY=...    (generic)");
        eprintln!();
        eprintln!("  Or add it to your config file:");
        eprintln!("    {}", motoasesor_config::AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    ensure_catalog_dir(&config)?;
    let inventory = motoasesor_inventory::connect(&config.inventory).await?;
    let providers = motoasesor_providers::build_from_config(&config);
    let provider = providers.default().ok_or("No default provider configured")?;

    let channel = Arc::new(CliChannel::new(config.persona.name.clone()));
    let router = motoasesor_relay::assemble(
        &config,
        inventory,
        provider,
        channel.clone(),
        Arc::new(EventBus::default()),
    );

    println!();
    println!("  ╔══════════════════════════════════════════════╗");
    println!("  ║        {:^30}        ║", format!("{} — Chat", config.persona.name));
    println!("  ╚══════════════════════════════════════════════╝");
    println!();
    println!("  Provider:  {}", config.default_provider);
    println!("  Model:     {}", config.default_model);
    println!("  Catalog:   {}", config.inventory.backend);
    println!();
    println!("  Escribe tu mensaje y presiona Enter.");
    println!("  Escribe 'salir' o Ctrl+D para terminar.");
    println!();

    let rx = channel.start().await.map_err(|e| format!("Channel error: {e}"))?;
    router.run(rx).await;

    println!();
    println!("  ¡Hasta pronto! 🏍️");
    println!();

    Ok(())
}
