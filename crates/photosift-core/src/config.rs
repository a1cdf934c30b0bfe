use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DirectoryConfig {
    pub path: String,
    pub enabled: bool,
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    #[serde(default)]
    pub directories: Vec<DirectoryConfig>,
    #[serde(default = "default_view_mode")]
    pub view_mode: String,
    #[serde(default = "default_sort_field")]
    pub sort_field: String,
    #[serde(default = "default_sort_order")]
    pub sort_order: String,
    #[serde(default = "default_filter_mode")]
    pub filter_mode: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            directories: Vec::new(),
            view_mode: default_view_mode(),
            sort_field: default_sort_field(),
            sort_order: default_sort_order(),
            filter_mode: default_filter_mode(),
        }
    }
}

fn default_view_mode() -> String {
    "grid".to_string()
}

fn default_sort_field() -> String {
    "date".to_string()
}

fn default_sort_order() -> String {
    "desc".to_string()
}

fn default_filter_mode() -> String {
    "duplicates".to_string()
}

/// Per-user application data directory (`~/.config/photosift` or the
/// platform equivalent).
pub fn app_data_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("photosift")
}

impl AppConfig {
    pub fn config_path() -> PathBuf {
        app_data_dir().join("config.json")
    }

    /// Load from disk; a missing or unreadable file yields the defaults.
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
                warn!("config at {} is corrupt ({}), using defaults", path.display(), e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    pub fn save(&self) -> crate::Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> crate::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Roots the scan engine should walk: enabled entries, pruned of
    /// directories nested under another enabled directory.
    pub fn enabled_roots(&self) -> Vec<String> {
        let enabled: Vec<String> = self
            .directories
            .iter()
            .filter(|d| d.enabled)
            .map(|d| d.path.clone())
            .collect();
        non_overlapping_directories(enabled)
    }
}

/// Remove directories that are subdirectories of other directories in the
/// list.
pub fn non_overlapping_directories(dirs: Vec<String>) -> Vec<String> {
    let mut result: Vec<String> = Vec::new();

    for dir in dirs {
        let dir_path = Path::new(&dir);
        let mut should_add = true;
        let result_clone = result.clone();

        for res_dir in &result_clone {
            let res_dir_path = Path::new(res_dir);

            if dir_path.starts_with(res_dir_path) {
                should_add = false;
                break;
            }

            if res_dir_path.starts_with(dir_path) {
                result.retain(|x| x != res_dir);
                break;
            }
        }

        if should_add {
            result.push(dir);
        }
    }

    result
}
