use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use keyroll_core::EditorConfig;

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub(crate) struct AppConfig {
    #[serde(default)]
    pub editor: EditorConfig,
}

pub(crate) fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("keyroll")
        .join("config.toml")
}

/// Load an explicitly named file, failing loudly, or the per-user file,
/// falling back to defaults when it is missing or unreadable
pub(crate) fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            parse_config(&text).with_context(|| format!("Invalid config {}", path.display()))?
        }
        None => std::fs::read_to_string(config_path())
            .ok()
            .and_then(|s| parse_config(&s).ok())
            .unwrap_or_default(),
    };
    config.editor.validate()?;
    Ok(config)
}

pub(crate) fn parse_config(text: &str) -> Result<AppConfig> {
    Ok(toml::from_str(text)?)
}

pub(crate) fn save_config(config: &AppConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let s = toml::to_string_pretty(config)?;
    std::fs::write(path, s).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use keyroll_core::{GridResolution, InsertStyle};

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = parse_config(
            r#"
            [editor]
            tempo = 96.0
            edit_mode = "gridmono"
            grid = "1/8"
            "#,
        )
        .unwrap();
        assert_eq!(config.editor.tempo, 96.0);
        assert_eq!(config.editor.edit_mode.style, InsertStyle::Grid);
        assert!(config.editor.edit_mode.is_mono());
        assert_eq!(config.editor.grid, GridResolution::Eighth);
        assert_eq!(config.editor.timebase, 16);
    }

    #[test]
    fn test_empty_file_is_default() {
        assert_eq!(parse_config("").unwrap(), AppConfig::default());
    }

    #[test]
    fn test_round_trip_through_toml() {
        let mut config = AppConfig::default();
        config.editor.loop_end = 32;
        config.editor.default_length = Some(2);
        let text = toml::to_string_pretty(&config).unwrap();
        assert_eq!(parse_config(&text).unwrap(), config);
    }

    #[test]
    fn test_bad_mode_is_rejected() {
        assert!(parse_config("[editor]\nedit_mode = \"paint\"\n").is_err());
    }
}
