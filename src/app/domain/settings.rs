use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::app::infrastructure::error::AppError;

/// Largest tab width accepted from the preferences and the custom size dialog.
pub const MAX_TAB_SIZE: u32 = 32;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppSettings {
    #[serde(default = "default_window_width")]
    pub window_width: i32,

    #[serde(default = "default_window_height")]
    pub window_height: i32,

    #[serde(default = "default_true")]
    pub remember_geometry: bool,

    #[serde(default = "default_true")]
    pub statusbar_visible: bool,

    /// Show the tab strip even when only one document is open
    #[serde(default)]
    pub always_show_tabs: bool,

    /// Previous/next tab wrap around at the ends
    #[serde(default)]
    pub cycle_tabs: bool,

    /// Show the full path instead of the basename in the window title
    #[serde(default)]
    pub path_in_title: bool,

    #[serde(default = "default_recent_menu_items")]
    pub recent_menu_items: usize,

    /// Comma separated list of tab sizes offered in the menu
    #[serde(default = "default_tab_sizes")]
    pub default_tab_sizes: String,

    #[serde(default = "default_true")]
    pub line_numbers_enabled: bool,

    #[serde(default = "default_true")]
    pub word_wrap_enabled: bool,

    #[serde(default)]
    pub auto_indent_enabled: bool,

    #[serde(default)]
    pub insert_spaces: bool,

    /// Tab size in spaces (default 4)
    #[serde(default = "default_tab_size")]
    pub tab_size: u32,

    #[serde(default)]
    pub search_match_case: bool,

    #[serde(default)]
    pub search_whole_word: bool,
}

fn default_window_width() -> i32 {
    600
}

fn default_window_height() -> i32 {
    400
}

fn default_true() -> bool {
    true
}

fn default_recent_menu_items() -> usize {
    10
}

fn default_tab_sizes() -> String {
    "2,3,4,8".to_string()
}

fn default_tab_size() -> u32 {
    4
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            window_width: default_window_width(),
            window_height: default_window_height(),
            remember_geometry: true,
            statusbar_visible: true,
            always_show_tabs: false,
            cycle_tabs: false,
            path_in_title: false,
            recent_menu_items: default_recent_menu_items(),
            default_tab_sizes: default_tab_sizes(),
            line_numbers_enabled: true,
            word_wrap_enabled: true,
            auto_indent_enabled: false,
            insert_spaces: false,
            tab_size: default_tab_size(),
            search_match_case: false,
            search_whole_word: false,
        }
    }
}

impl AppSettings {
    /// Tab sizes offered as radio items, in menu order. Entries that do not
    /// parse are skipped and the rest are clamped to 1..=32.
    pub fn tab_size_choices(&self) -> Vec<u32> {
        let mut sizes = Vec::new();
        for part in self.default_tab_sizes.split(',') {
            if let Ok(n) = part.trim().parse::<u32>() {
                let n = n.clamp(1, MAX_TAB_SIZE);
                if !sizes.contains(&n) {
                    sizes.push(n);
                }
            }
        }
        sizes
    }

    /// Load settings from disk, or create default if not exists
    pub fn load() -> Self {
        Self::load_from(&Self::get_config_path())
    }

    pub fn load_from(config_path: &Path) -> Self {
        match fs::read_to_string(config_path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(settings) => settings,
                Err(e) => {
                    tracing::warn!(path = %config_path.display(), error = %e, "failed to parse settings, using defaults");
                    Self::default()
                }
            },
            Err(_) => {
                // File doesn't exist, use defaults
                let default = Self::default();
                if let Err(e) = default.save_to(config_path) {
                    tracing::debug!(error = %e, "could not write default settings");
                }
                default
            }
        }
    }

    /// Save settings to disk
    pub fn save(&self) -> Result<(), AppError> {
        self.save_to(&Self::get_config_path())
    }

    pub fn save_to(&self, config_path: &Path) -> Result<(), AppError> {
        // Ensure parent directory exists
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self)?;
        fs::write(config_path, json)?;

        Ok(())
    }

    /// Get config file path (cross-platform)
    pub fn get_config_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push("quillpad");
        path.push("settings.json");
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_settings() {
        let settings = AppSettings::default();
        assert_eq!(settings.window_width, 600);
        assert_eq!(settings.window_height, 400);
        assert!(settings.statusbar_visible);
        assert!(settings.remember_geometry);
        assert!(!settings.cycle_tabs);
        assert_eq!(settings.recent_menu_items, 10);
        assert_eq!(settings.tab_size, 4);
    }

    #[test]
    fn test_serialize_deserialize() {
        let settings = AppSettings::default();
        let json = serde_json::to_string(&settings).unwrap();
        let loaded: AppSettings = serde_json::from_str(&json).unwrap();
        assert_eq!(settings, loaded);
    }

    #[test]
    fn test_partial_config() {
        // Simulate old config missing new fields
        let json = r#"{"line_numbers_enabled": false, "window_width": 900}"#;
        let settings: AppSettings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.window_height, 400);
        assert_eq!(settings.window_width, 900);
        assert!(!settings.line_numbers_enabled);
    }

    #[test]
    fn test_tab_size_choices() {
        let mut settings = AppSettings::default();
        assert_eq!(settings.tab_size_choices(), vec![2, 3, 4, 8]);

        settings.default_tab_sizes = "4, x, 0, 64, 4".to_string();
        assert_eq!(settings.tab_size_choices(), vec![4, 1, 32]);
    }

    #[test]
    fn test_save_and_load_roundtrip_on_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let settings = AppSettings {
            window_width: 1024,
            statusbar_visible: false,
            ..Default::default()
        };
        settings.save_to(&path).unwrap();
        assert_eq!(AppSettings::load_from(&path), settings);
    }

    #[test]
    fn test_corrupt_file_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{not json").unwrap();
        assert_eq!(AppSettings::load_from(&path), AppSettings::default());
    }

    #[test]
    fn test_missing_file_writes_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        let settings = AppSettings::load_from(&path);
        assert_eq!(settings, AppSettings::default());
        assert!(path.exists());
    }
}
