//! Configuration CLI command handlers

use std::path::Path;

use crate::cli::commands::{ConfigCommand, ConfigKey};
use crate::core::config::{NotifierKind, Settings};
use crate::core::pattern::PrefixConfig;
use crate::error::{PrefixError, Result};

/// Handle configuration commands against the settings file at `path`
pub fn handle_config(command: ConfigCommand, path: &Path) -> Result<()> {
    match command {
        ConfigCommand::Set { key, value } => handle_set(path, key, &value),
        ConfigCommand::Get { key } => handle_get(path, key),
        ConfigCommand::Remove { key } => handle_remove(path, key),
        ConfigCommand::Path => {
            println!("{}", path.display());
            Ok(())
        }
    }
}

/// Handle setting a configuration value
fn handle_set(path: &Path, key: ConfigKey, value: &str) -> Result<()> {
    let mut settings = Settings::load_from(path)?;
    set_value(&mut settings, key, value)?;
    settings.save_to(path)?;

    println!("✓ {} set to: {}", key.name(), get_value(&settings, key));
    Ok(())
}

/// Handle getting a configuration value
fn handle_get(path: &Path, key: ConfigKey) -> Result<()> {
    let settings = Settings::load_from(path)?;
    println!("{}", get_value(&settings, key));
    Ok(())
}

/// Handle resetting a configuration value
fn handle_remove(path: &Path, key: ConfigKey) -> Result<()> {
    let mut settings = Settings::load_from(path)?;
    reset_value(&mut settings, key);
    settings.save_to(path)?;

    println!(
        "{} reset to default: {}",
        key.name(),
        get_value(&settings, key)
    );
    Ok(())
}

/// Apply a value to the settings, rejecting anything the daemon couldn't use
fn set_value(settings: &mut Settings, key: ConfigKey, value: &str) -> Result<()> {
    match key {
        ConfigKey::PrefixPattern => {
            PrefixConfig::resolve(value, &settings.message_format)?;
            settings.prefix_pattern = value.to_string();
        }
        ConfigKey::MessageFormat => {
            PrefixConfig::resolve(&settings.prefix_pattern, value)?;
            settings.message_format = value.to_string();
        }
        ConfigKey::WatchInterval => {
            let ms = value.parse::<u64>().ok().filter(|ms| *ms > 0).ok_or_else(|| {
                PrefixError::InvalidInput(format!(
                    "Invalid watch interval '{}'. Expected a positive number of milliseconds.",
                    value
                ))
            })?;
            settings.watch_interval_ms = ms;
        }
        ConfigKey::Notifier => {
            settings.notifier = NotifierKind::from_str(value).ok_or_else(|| {
                PrefixError::InvalidInput(format!(
                    "Invalid notifier '{}'. Available notifiers: {}",
                    value,
                    NotifierKind::all()
                        .iter()
                        .map(|n| n.name())
                        .collect::<Vec<_>>()
                        .join(", ")
                ))
            })?;
        }
        ConfigKey::MessageFile => {
            if value.is_empty() || value.contains(['/', '\\']) {
                return Err(PrefixError::InvalidInput(format!(
                    "Invalid message file '{}'. Expected a file name inside the git directory.",
                    value
                )));
            }
            settings.message_file = value.to_string();
        }
    }
    Ok(())
}

fn get_value(settings: &Settings, key: ConfigKey) -> String {
    match key {
        ConfigKey::PrefixPattern => settings.prefix_pattern.clone(),
        ConfigKey::MessageFormat => settings.message_format.clone(),
        ConfigKey::WatchInterval => settings.watch_interval_ms.to_string(),
        ConfigKey::Notifier => format!(
            "{} ({})",
            settings.notifier.name(),
            settings.notifier.display_name()
        ),
        ConfigKey::MessageFile => settings.message_file.clone(),
    }
}

fn reset_value(settings: &mut Settings, key: ConfigKey) {
    let defaults = Settings::default();
    match key {
        ConfigKey::PrefixPattern => settings.prefix_pattern = defaults.prefix_pattern,
        ConfigKey::MessageFormat => settings.message_format = defaults.message_format,
        ConfigKey::WatchInterval => settings.watch_interval_ms = defaults.watch_interval_ms,
        ConfigKey::Notifier => settings.notifier = defaults.notifier,
        ConfigKey::MessageFile => settings.message_file = defaults.message_file,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_set_rejects_invalid_pattern() {
        let mut settings = Settings::default();
        let err = set_value(&mut settings, ConfigKey::PrefixPattern, "(ML-").unwrap_err();

        assert!(matches!(err, PrefixError::InvalidPattern { .. }));
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_set_values() {
        let mut settings = Settings::default();
        set_value(&mut settings, ConfigKey::Notifier, "poll").unwrap();
        set_value(&mut settings, ConfigKey::WatchInterval, "250").unwrap();
        set_value(&mut settings, ConfigKey::MessageFormat, "${prefix}: ${message}").unwrap();

        assert_eq!(settings.notifier, NotifierKind::Poll);
        assert_eq!(settings.watch_interval_ms, 250);
        assert_eq!(settings.message_format, "${prefix}: ${message}");
    }

    #[test]
    fn test_set_rejects_bad_scalars() {
        let mut settings = Settings::default();
        assert!(set_value(&mut settings, ConfigKey::WatchInterval, "0").is_err());
        assert!(set_value(&mut settings, ConfigKey::WatchInterval, "soon").is_err());
        assert!(set_value(&mut settings, ConfigKey::Notifier, "inotify").is_err());
        assert!(set_value(&mut settings, ConfigKey::MessageFile, "../x").is_err());
        assert!(set_value(&mut settings, ConfigKey::MessageFile, "").is_err());
    }

    #[test]
    fn test_set_then_remove_round_trips_through_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");

        handle_set(&path, ConfigKey::PrefixPattern, r"(BY-\d+)-.*").unwrap();
        assert_eq!(
            Settings::load_from(&path).unwrap().prefix_pattern,
            r"(BY-\d+)-.*"
        );

        handle_remove(&path, ConfigKey::PrefixPattern).unwrap();
        assert_eq!(Settings::load_from(&path).unwrap(), Settings::default());
    }
}
