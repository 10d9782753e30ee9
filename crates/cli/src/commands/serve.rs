//! `motoasesor serve` — Start the webhook gateway and relay.

use super::{ensure_catalog_dir, load_config};

pub async fn run(port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = load_config()?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    if !config.has_api_key() {
        tracing::warn!("No API key configured; every reply will be the apology message");
    }
    ensure_catalog_dir(&config)?;

    println!("🏍️  MotoAsesor Gateway");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!(
        "   Webhook:   http://{}:{}/webhook/whatsapp",
        config.gateway.host, config.gateway.port
    );
    println!("   Bridge:    {} ({})", config.whatsapp.api_url, config.whatsapp.instance_name);
    println!("   Model:     {} / {}", config.default_provider, config.default_model);

    motoasesor_gateway::start(config).await?;

    Ok(())
}
