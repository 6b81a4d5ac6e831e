//! Config command implementation.

use crate::cli::{ConfigAction, Output};
use crate::config::Settings;
use anyhow::Result;
use base64::Engine as _;
use std::path::PathBuf;

/// Run the config command.
pub fn run_config(action: &ConfigAction, settings: Settings, path: Option<&str>) -> Result<()> {
    let config_path = path
        .map(PathBuf::from)
        .unwrap_or_else(Settings::default_config_path);

    match action {
        ConfigAction::Show => {
            let mut shown = settings;
            if shown.storage.signing_key.is_some() {
                shown.storage.signing_key = Some("<redacted>".to_string());
            }
            let toml_str = toml::to_string_pretty(&shown)
                .map_err(|e| anyhow::anyhow!("Failed to serialize config: {}", e))?;
            println!("{}", toml_str);
        }

        ConfigAction::Path => {
            println!("{}", config_path.display());
        }

        ConfigAction::Init { force } => {
            if config_path.exists() && !force {
                Output::warning(&format!(
                    "Config already exists at {}. Use --force to overwrite.",
                    config_path.display()
                ));
                return Ok(());
            }

            let mut fresh = Settings::default();
            fresh.storage.signing_key = Some(generate_signing_key());
            fresh.save_to(&config_path)?;
            Output::success(&format!("Wrote config to {}", config_path.display()));
        }
    }

    Ok(())
}

/// 32 random bytes, URL-safe base64.
fn generate_signing_key() -> String {
    let mut bytes = Vec::with_capacity(32);
    bytes.extend_from_slice(uuid::Uuid::new_v4().as_bytes());
    bytes.extend_from_slice(uuid::Uuid::new_v4().as_bytes());
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_init_writes_signing_key_once() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let path_str = path.to_str().unwrap();

        run_config(&ConfigAction::Init { force: false }, Settings::default(), Some(path_str))
            .unwrap();
        let first = Settings::load_from(Some(&path)).unwrap();
        let key = first.storage.signing_key.clone().unwrap();
        assert_eq!(key.len(), 43);

        run_config(&ConfigAction::Init { force: false }, Settings::default(), Some(path_str))
            .unwrap();
        let second = Settings::load_from(Some(&path)).unwrap();
        assert_eq!(second.storage.signing_key.as_deref(), Some(key.as_str()));

        run_config(&ConfigAction::Init { force: true }, Settings::default(), Some(path_str))
            .unwrap();
        let third = Settings::load_from(Some(&path)).unwrap();
        assert_ne!(third.storage.signing_key.as_deref(), Some(key.as_str()));
    }
}
