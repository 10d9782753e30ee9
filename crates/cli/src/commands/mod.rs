pub mod catalog;
pub mod chat;
pub mod doctor;
pub mod onboard;
pub mod serve;

use motoasesor_config::AppConfig;

/// Load the config file, with environment overrides applied.
pub(crate) fn load_config() -> Result<AppConfig, Box<dyn std::error::Error>> {
    Ok(AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?)
}

/// Make sure the directory holding a file-backed SQLite catalog exists.
pub(crate) fn ensure_catalog_dir(config: &AppConfig) -> std::io::Result<()> {
    if config.inventory.backend != "sqlite" {
        return Ok(());
    }
    let path = config
        .inventory
        .database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:");
    if path.contains(":memory:") {
        return Ok(());
    }
    match std::path::Path::new(path).parent() {
        Some(dir) if !dir.as_os_str().is_empty() => std::fs::create_dir_all(dir),
        _ => Ok(()),
    }
}
