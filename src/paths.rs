/// Platform-specific default locations for data and configuration
use std::path::{Path, PathBuf};

const APP_DIR: &str = "codebase-index";

/// Platform-agnostic path utilities
pub struct PlatformPaths;

impl PlatformPaths {
    /// Data directory for the current platform
    ///
    /// - Windows: %LOCALAPPDATA%
    /// - macOS: ~/Library/Application Support
    /// - Linux/Unix: $XDG_DATA_HOME or ~/.local/share
    pub fn data_dir() -> PathBuf {
        dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."))
    }

    /// Config directory for the current platform
    pub fn config_dir() -> PathBuf {
        dirs::config_dir().unwrap_or_else(|| PathBuf::from("."))
    }

    /// Returns: {data_dir}/codebase-index/lancedb
    pub fn default_lancedb_path() -> PathBuf {
        Self::data_dir().join(APP_DIR).join("lancedb")
    }

    /// Returns: {config_dir}/codebase-index/config.toml
    pub fn default_config_path() -> PathBuf {
        Self::config_dir().join(APP_DIR).join("config.toml")
    }

    /// Render `path` relative to `root` with forward slashes.
    ///
    /// Falls back to the full path when `path` is not under `root`.
    pub fn relative_to(root: &Path, path: &Path) -> String {
        let rel = path.strip_prefix(root).unwrap_or(path);
        rel.components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_dir_not_empty() {
        assert!(!PlatformPaths::data_dir().as_os_str().is_empty());
    }

    #[test]
    fn test_default_lancedb_path() {
        let path = PlatformPaths::default_lancedb_path();
        assert!(path.to_string_lossy().contains("codebase-index"));
        assert!(path.ends_with("lancedb"));
    }

    #[test]
    fn test_default_config_path() {
        let path = PlatformPaths::default_config_path();
        assert!(path.to_string_lossy().contains("codebase-index"));
        assert!(path.ends_with("config.toml"));
    }

    #[test]
    fn test_relative_to_uses_forward_slashes() {
        let root = Path::new("/repo");
        let file = Path::new("/repo").join("src").join("main.py");
        assert_eq!(PlatformPaths::relative_to(root, &file), "src/main.py");
    }

    #[test]
    fn test_relative_to_outside_root() {
        let root = Path::new("/repo");
        let file = Path::new("/other/a.md");
        assert!(PlatformPaths::relative_to(root, file).ends_with("other/a.md"));
    }
}
