//! Server configuration module.
//!
//! Handles loading, validating, and merging `config.toml`. User values are
//! layered over the stock defaults key by key, so a config file only needs
//! the keys it wants to change. A missing file means stock defaults.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [server]
//! host = "0.0.0.0"
//! port = 5000
//!
//! [library]
//! root = "media"            # Base directory for the kind directories
//! music_dir = "music"
//! images_dir = "images"
//! documents_dir = "documents"
//! thumbnails_dir = "thumbnails"
//! music_extensions = ["mp3", "m4a", "flac", "ogg", "wav"]
//! image_extensions = ["jpg", "jpeg", "png", "gif", "webp", "tif", "tiff"]
//!
//! [watcher]
//! enabled = true
//! debounce_ms = 500         # Quiet period before a rebuild runs
//!
//! [thumbnails]
//! max_edge = 300            # Longest thumbnail edge in pixels
//! quality = 80              # JPEG quality (1-100)
//!
//! [processing]
//! max_processes = 4         # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::{Quality, ThumbnailConfig, supported_input_extensions};
use crate::media::{Classifier, MediaKind};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Configuration loaded from `config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// HTTP listener.
    pub server: ListenConfig,
    /// Where media lives and how files are classified.
    pub library: LibraryConfig,
    /// Filesystem change watching.
    pub watcher: WatcherConfig,
    /// Thumbnail generation for images.
    pub thumbnails: ThumbnailsConfig,
    /// Parallel extraction settings.
    pub processing: ProcessingConfig,
}

impl ServerConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Validation("server.port must be non-zero".into()));
        }
        if self.watcher.debounce_ms == 0 {
            return Err(ConfigError::Validation(
                "watcher.debounce_ms must be non-zero".into(),
            ));
        }
        if self.thumbnails.max_edge == 0 {
            return Err(ConfigError::Validation(
                "thumbnails.max_edge must be non-zero".into(),
            ));
        }
        if !(1..=100).contains(&self.thumbnails.quality) {
            return Err(ConfigError::Validation(
                "thumbnails.quality must be 1-100".into(),
            ));
        }
        self.library.validate()
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ListenConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

impl ListenConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Media directories and extension lists.
///
/// Kind directories are relative to `root` unless absolute.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LibraryConfig {
    pub root: PathBuf,
    pub music_dir: PathBuf,
    pub images_dir: PathBuf,
    pub documents_dir: PathBuf,
    pub thumbnails_dir: PathBuf,
    pub music_extensions: Vec<String>,
    pub image_extensions: Vec<String>,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("media"),
            music_dir: PathBuf::from("music"),
            images_dir: PathBuf::from("images"),
            documents_dir: PathBuf::from("documents"),
            thumbnails_dir: PathBuf::from("thumbnails"),
            music_extensions: ["mp3", "m4a", "flac", "ogg", "wav"]
                .map(String::from)
                .to_vec(),
            image_extensions: supported_input_extensions()
                .iter()
                .map(|e| e.to_string())
                .collect(),
        }
    }
}

impl LibraryConfig {
    /// Resolved directory for one kind.
    pub fn dir(&self, kind: MediaKind) -> PathBuf {
        let dir = match kind {
            MediaKind::Music => &self.music_dir,
            MediaKind::Images => &self.images_dir,
            MediaKind::Documents => &self.documents_dir,
        };
        self.root.join(dir)
    }

    pub fn thumbnails(&self) -> PathBuf {
        self.root.join(&self.thumbnails_dir)
    }

    pub fn classifier(&self) -> Classifier {
        Classifier::new(&self.music_extensions, &self.image_extensions)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let normalize = |exts: &[String]| -> Vec<String> {
            exts.iter()
                .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
                .filter(|e| !e.is_empty())
                .collect()
        };
        let music = normalize(&self.music_extensions);
        let images = normalize(&self.image_extensions);

        if music.is_empty() {
            return Err(ConfigError::Validation(
                "library.music_extensions must not be empty".into(),
            ));
        }
        if images.is_empty() {
            return Err(ConfigError::Validation(
                "library.image_extensions must not be empty".into(),
            ));
        }
        if let Some(shared) = music.iter().find(|e| images.contains(e)) {
            return Err(ConfigError::Validation(format!(
                "extension '{shared}' is listed as both music and image"
            )));
        }
        Ok(())
    }
}

/// Change watcher settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WatcherConfig {
    pub enabled: bool,
    /// Quiet period in milliseconds before a rebuild runs.
    pub debounce_ms: u64,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            debounce_ms: 500,
        }
    }
}

impl WatcherConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// Thumbnail generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThumbnailsConfig {
    /// Longest edge in pixels.
    pub max_edge: u32,
    /// JPEG quality (1-100).
    pub quality: u32,
}

impl Default for ThumbnailsConfig {
    fn default() -> Self {
        Self {
            max_edge: 300,
            quality: 80,
        }
    }
}

impl From<&ThumbnailsConfig> for ThumbnailConfig {
    fn from(config: &ThumbnailsConfig) -> Self {
        ThumbnailConfig {
            max_edge: config.max_edge,
            quality: Quality::new(config.quality),
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel extraction workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the base layer user overrides are merged onto.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(ServerConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist and `Err` if it exists but
/// is not valid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<ServerConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: ServerConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from the file at `path`.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result.
pub fn load_config(path: &Path) -> Result<ServerConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = load_raw_config(path)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# mediashelf configuration
# ========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys cause an error.

# ---------------------------------------------------------------------------
# HTTP listener
# ---------------------------------------------------------------------------
[server]
host = "0.0.0.0"
port = 5000

# ---------------------------------------------------------------------------
# Media library
# ---------------------------------------------------------------------------
[library]
# Base directory. The kind directories below are relative to it.
# Overridden by --root on the command line.
root = "media"

music_dir = "music"
images_dir = "images"
documents_dir = "documents"

# Generated JPEG thumbnails for images, named <image filename>.jpg.
thumbnails_dir = "thumbnails"

# Files are classified by extension (case-insensitive). Anything that is
# neither music nor image, and not hidden, counts as a document.
music_extensions = ["mp3", "m4a", "flac", "ogg", "wav"]
image_extensions = ["jpg", "jpeg", "png", "gif", "webp", "tif", "tiff"]

# ---------------------------------------------------------------------------
# Change watcher
# ---------------------------------------------------------------------------
[watcher]
# Rebuild collections automatically when files change.
enabled = true

# Quiet period after the last change before a rebuild runs.
debounce_ms = 500

# ---------------------------------------------------------------------------
# Thumbnails
# ---------------------------------------------------------------------------
[thumbnails]
# Longest edge in pixels. Smaller images are not upscaled.
max_edge = 300

# JPEG quality (1 = worst, 100 = best).
quality = 80

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel extraction workers during a rebuild.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_values() {
        let config = ServerConfig::default();
        assert_eq!(config.server.address(), "0.0.0.0:5000");
        assert_eq!(config.library.root, PathBuf::from("media"));
        assert!(config.watcher.enabled);
        assert_eq!(config.watcher.debounce(), Duration::from_millis(500));
        assert_eq!(config.thumbnails.max_edge, 300);
        assert_eq!(config.thumbnails.quality, 80);
    }

    #[test]
    fn kind_dirs_resolve_under_root() {
        let mut library = LibraryConfig::default();
        library.root = PathBuf::from("/srv/share");
        assert_eq!(library.dir(MediaKind::Music), Path::new("/srv/share/music"));
        assert_eq!(
            library.dir(MediaKind::Documents),
            Path::new("/srv/share/documents")
        );
        assert_eq!(library.thumbnails(), Path::new("/srv/share/thumbnails"));

        library.images_dir = PathBuf::from("/mnt/photos");
        assert_eq!(library.dir(MediaKind::Images), Path::new("/mnt/photos"));
    }

    #[test]
    fn classifier_uses_configured_lists() {
        let mut library = LibraryConfig::default();
        library.music_extensions = vec!["opus".into()];
        let classifier = library.classifier();
        assert_eq!(classifier.classify_name("a.opus"), Some(MediaKind::Music));
        assert_eq!(classifier.classify_name("a.mp3"), Some(MediaKind::Documents));
    }

    #[test]
    fn thumbnail_config_from_section() {
        let section = ThumbnailsConfig {
            max_edge: 120,
            quality: 55,
        };
        let config = ThumbnailConfig::from(&section);
        assert_eq!(config.max_edge, 120);
        assert_eq!(config.quality.value(), 55);
    }

    #[test]
    fn parse_partial_config() {
        let config: ServerConfig = toml::from_str(
            r#"
[server]
port = 8080
"#,
        )
        .unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.library.music_dir, PathBuf::from("music"));
    }

    // =========================================================================
    // load_config tests
    // =========================================================================

    #[test]
    fn load_config_returns_default_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(&tmp.path().join("config.toml")).unwrap();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.thumbnails.quality, 80);
    }

    #[test]
    fn load_config_reads_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        fs::write(
            &path,
            r#"
[library]
root = "/data"
image_extensions = ["jpg", "heic"]

[watcher]
debounce_ms = 1500
"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.library.root, PathBuf::from("/data"));
        assert_eq!(config.library.image_extensions, vec!["jpg", "heic"]);
        assert_eq!(config.watcher.debounce_ms, 1500);
        // Untouched keys keep stock values
        assert_eq!(config.library.music_dir, PathBuf::from("music"));
        assert!(config.watcher.enabled);
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        fs::write(&path, "[server\nport = ").unwrap();
        assert!(matches!(load_config(&path), Err(ConfigError::Toml(_))));
    }

    #[test]
    fn unknown_key_rejected_via_load_config() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        fs::write(&path, "[watcher]\ndebounce = 100\n").unwrap();

        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("unknown field"));
    }

    #[test]
    fn unknown_section_rejected() {
        let result: Result<ServerConfig, _> = toml::from_str("[wifi]\nssid = \"x\"\n");
        assert!(result.is_err());
    }

    // =========================================================================
    // Validation tests
    // =========================================================================

    #[test]
    fn validate_default_config_passes() {
        assert!(ServerConfig::default().validate().is_ok());
    }

    #[test]
    fn validate_quality_bounds() {
        let mut config = ServerConfig::default();
        config.thumbnails.quality = 100;
        assert!(config.validate().is_ok());

        config.thumbnails.quality = 0;
        assert!(config.validate().is_err());

        config.thumbnails.quality = 101;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("quality"));
    }

    #[test]
    fn validate_zero_values() {
        let mut config = ServerConfig::default();
        config.server.port = 0;
        assert!(config.validate().is_err());

        let mut config = ServerConfig::default();
        config.watcher.debounce_ms = 0;
        assert!(config.validate().is_err());

        let mut config = ServerConfig::default();
        config.thumbnails.max_edge = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_extension_lists() {
        let mut config = ServerConfig::default();
        config.library.music_extensions = vec![" ".into()];
        assert!(config.validate().is_err());

        let mut config = ServerConfig::default();
        config.library.image_extensions = vec![".MP3".into()];
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("'mp3'"));
    }

    #[test]
    fn resolve_config_rejects_invalid_values() {
        let base = stock_defaults_value().unwrap();
        let overlay: toml::Value = toml::from_str("[thumbnails]\nquality = 200\n").unwrap();
        let result = resolve_config(base, Some(overlay));
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    // =========================================================================
    // effective_threads tests
    // =========================================================================

    #[test]
    fn effective_threads_auto() {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        assert_eq!(effective_threads(&ProcessingConfig::default()), cores);
        assert_eq!(
            effective_threads(&ProcessingConfig {
                max_processes: Some(99999)
            }),
            cores
        );
    }

    #[test]
    fn effective_threads_user_constrains_down() {
        let config = ProcessingConfig {
            max_processes: Some(1),
        };
        assert_eq!(effective_threads(&config), 1);
    }

    // =========================================================================
    // merge_toml tests
    // =========================================================================

    #[test]
    fn merge_toml_table_merge() {
        let base: toml::Value = toml::from_str("[server]\nhost = \"a\"\nport = 1\n").unwrap();
        let overlay: toml::Value = toml::from_str("[server]\nport = 2\n").unwrap();
        let merged = merge_toml(base, overlay);
        let server = merged.get("server").unwrap();
        assert_eq!(server.get("host").unwrap().as_str(), Some("a"));
        assert_eq!(server.get("port").unwrap().as_integer(), Some(2));
    }

    #[test]
    fn merge_toml_arrays_replace() {
        let base: toml::Value = toml::from_str("exts = [\"a\", \"b\"]").unwrap();
        let overlay: toml::Value = toml::from_str("exts = [\"c\"]").unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged.get("exts").unwrap().as_array().unwrap().len(), 1);
    }

    // =========================================================================
    // stock config tests
    // =========================================================================

    #[test]
    fn stock_config_toml_roundtrips_to_defaults() {
        let config: ServerConfig = toml::from_str(stock_config_toml()).unwrap();
        let defaults = ServerConfig::default();
        assert_eq!(config.server.port, defaults.server.port);
        assert_eq!(config.library.root, defaults.library.root);
        assert_eq!(
            config.library.image_extensions,
            defaults.library.image_extensions
        );
        assert_eq!(config.watcher.debounce_ms, defaults.watcher.debounce_ms);
        assert_eq!(config.thumbnails.max_edge, defaults.thumbnails.max_edge);
        assert_eq!(config.processing.max_processes, None);
    }

    #[test]
    fn stock_defaults_value_has_all_sections() {
        let val = stock_defaults_value().unwrap();
        for section in ["server", "library", "watcher", "thumbnails", "processing"] {
            assert!(val.get(section).is_some(), "missing [{section}]");
        }
    }
}
