use gridview::table::{SelectionMode, TableOptions};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub default_page_size: usize,
    /// Page sizes `+`/`-` cycle through
    pub page_size_options: Vec<usize>,
    /// `single` or `multi`
    pub selection_mode: String,
    pub log_level: String,
    pub auto_reset_page_index: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_page_size: 20,
            page_size_options: vec![10, 20, 50, 100],
            selection_mode: "multi".to_string(),
            log_level: "info".to_string(),
            auto_reset_page_index: false,
        }
    }
}

impl Config {
    pub fn config_dir() -> Option<PathBuf> {
        let home = env::var("HOME").ok()?;
        Some(PathBuf::from(home).join(".gridview"))
    }

    fn config_path() -> Option<PathBuf> {
        Self::config_dir().map(|dir| dir.join("config.json"))
    }

    /// Load the user config, falling back to defaults when missing or unreadable
    ///
    /// On first run the defaults are written out so there is a file to edit.
    pub fn load() -> Config {
        let Some(path) = Self::config_path() else {
            return Config::default();
        };
        if let Some(config) = Self::load_from(&path) {
            return config;
        }
        let config = Config::default();
        if !path.exists() {
            if let Err(e) = config.save_to(&path) {
                eprintln!("Could not write default config: {:#}", e);
            }
        }
        config
    }

    pub fn load_from(path: &Path) -> Option<Config> {
        if !path.exists() {
            return None;
        }
        let contents = fs::read_to_string(path).ok()?;
        match serde_json::from_str(&contents) {
            Ok(config) => Some(config),
            Err(e) => {
                log::warn!("ignoring malformed config {}: {}", path.display(), e);
                None
            }
        }
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(dir) = path.parent() {
            if !dir.exists() {
                fs::create_dir_all(dir)?;
            }
        }
        let contents = serde_json::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    pub fn selection_mode(&self) -> SelectionMode {
        if self.selection_mode.eq_ignore_ascii_case("single") {
            SelectionMode::Single
        } else {
            SelectionMode::Multi
        }
    }

    pub fn table_options(&self) -> TableOptions {
        TableOptions {
            page_size: self.default_page_size,
            page_size_options: self.page_size_options.clone(),
            selection_mode: self.selection_mode(),
            auto_reset_page_index: self.auto_reset_page_index,
            ..TableOptions::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Config::load_from(&dir.path().join("config.json")).is_none());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = Config {
            default_page_size: 50,
            selection_mode: "single".to_string(),
            ..Config::default()
        };
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.default_page_size, 50);
        assert_eq!(loaded.selection_mode(), SelectionMode::Single);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "auto_reset_page_index": true }"#).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert!(loaded.auto_reset_page_index);
        assert_eq!(loaded.page_size_options, vec![10, 20, 50, 100]);
        assert_eq!(loaded.table_options().page_size, 20);
    }

    #[test]
    fn test_malformed_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "not json").unwrap();
        assert!(Config::load_from(&path).is_none());
    }
}
