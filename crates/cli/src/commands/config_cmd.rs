//! `chatloop config`: print the effective configuration.

use chatloop_config::AppConfig;

pub fn show() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    println!("# {}", AppConfig::config_dir().join("config.toml").display());
    println!("{}", config.to_redacted_toml()?);
    Ok(())
}
