//! Configuration commands.

use std::path::Path;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Prints the effective configuration as TOML.
///
/// Secret references are printed as written, never resolved.
pub fn dump(config: &ClientConfig, path: &Path) -> ClientResult<()> {
    let toml_str = toml::to_string_pretty(config)
        .map_err(|e| ClientError::Config(format!("failed to serialize config: {}", e)))?;
    println!("# {}", path.display());
    println!("{}", toml_str);
    Ok(())
}

/// Checks that the zone and Google settings are usable.
pub fn validate(config: &ClientConfig) -> ClientResult<()> {
    let zone = config.zone()?;
    println!("Time zone: {}", zone);

    #[cfg(feature = "google")]
    match config.google {
        Some(ref google) => {
            let provider = google.to_provider_config()?;
            println!(
                "Google credentials resolve (sending as {}).",
                provider.mailbox
            );
        }
        None => println!("No [google] section; run `jess auth google` to set one up."),
    }

    println!("Configuration is valid.");
    Ok(())
}

/// Prints the configuration file path.
pub fn path(path: &Path) -> ClientResult<()> {
    println!("config: {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_rejects_bad_zone() {
        let config: ClientConfig = toml::from_str("[calendar]\ntimezone = \"Nowhere\"\n").unwrap();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn validate_accepts_defaults() {
        assert!(validate(&ClientConfig::default()).is_ok());
    }

    #[test]
    fn dump_serializes_defaults() {
        let text = toml::to_string_pretty(&ClientConfig::default()).unwrap();
        assert!(text.contains("timezone = \"America/New_York\""));
    }
}
