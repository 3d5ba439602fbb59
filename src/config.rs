//! Application configuration.
//!
//! Configuration is loaded from a TOML file at:
//! 1. `$MSGREADER_CONFIG` (environment variable)
//! 2. `~/.config/msgreader/config.toml` (Linux)
//!    `~/Library/Application Support/msgreader/config.toml` (macOS)
//!    `%APPDATA%\msgreader\config.toml` (Windows)
//! 3. Built-in defaults

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Name of the scratch directory created under the home directory.
pub const SCRATCH_DIR_NAME: &str = "MsgReader_Temp";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General behavior settings.
    pub general: GeneralConfig,
    /// Scratch directory settings.
    pub scratch: ScratchConfig,
    /// Body rendering settings.
    pub render: RenderConfig,
    /// Export defaults.
    pub export: ExportConfig,
    /// How files and links are handed to the OS.
    pub launcher: LauncherConfig,
}

/// General behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Interface language ("en", "fr"). Detected from the environment when unset.
    pub lang: Option<String>,
    /// Override cache directory for logs.
    pub cache_dir: Option<PathBuf>,
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub log_level: String,
}

/// Scratch directory settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScratchConfig {
    /// Override the scratch directory. It is wiped on every load.
    pub dir: Option<PathBuf>,
}

/// Which HTML sanitizer runs on message bodies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SanitizerPolicy {
    /// Remove known-dangerous elements and event attributes, keep everything else.
    #[default]
    Blocklist,
    /// Keep only an explicit set of safe tags and attributes.
    Allowlist,
}

/// Body rendering settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Sanitizer policy: "blocklist" (default) or "allowlist".
    pub sanitizer: SanitizerPolicy,
}

/// Export defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Domain part of generated Message-IDs.
    pub message_id_domain: String,
    /// Open the `.eml` with the default mail client after export.
    pub open_after_export: bool,
}

/// How files and links are handed to the OS.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LauncherConfig {
    /// Program used instead of the platform opener (`open`, `xdg-open`, `start`).
    pub command: Option<String>,
}

// ── Default implementations ─────────────────────────────────────

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            lang: None,
            cache_dir: None,
            log_level: "warn".to_string(),
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            message_id_domain: "msgreader.local".to_string(),
            open_after_export: true,
        }
    }
}

// ── Loading ─────────────────────────────────────────────────────

/// Load configuration from [`config_file_path`].
///
/// A missing file gives the defaults silently; an unreadable or invalid one
/// is logged and also gives the defaults.
pub fn load_config() -> Config {
    let Some(path) = config_file_path().filter(|p| p.is_file()) else {
        return Config::default();
    };

    let parsed = std::fs::read_to_string(&path)
        .map_err(|e| e.to_string())
        .and_then(|text| parse_config(&text));

    match parsed {
        Ok(cfg) => {
            tracing::info!(path = %path.display(), "Loaded config");
            cfg
        }
        Err(error) => {
            tracing::warn!(path = %path.display(), %error, "Ignoring config file");
            Config::default()
        }
    }
}

/// Parse TOML text into a [`Config`], filling unset keys with defaults.
pub fn parse_config(text: &str) -> Result<Config, String> {
    toml::from_str(text).map_err(|e| e.to_string())
}

/// `$MSGREADER_CONFIG`, else `<config dir>/msgreader/config.toml`.
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(env_path) = std::env::var("MSGREADER_CONFIG") {
        return Some(PathBuf::from(env_path));
    }

    dirs::config_dir().map(|d| d.join("msgreader").join("config.toml"))
}

/// Return the scratch directory: the configured override, else `~/MsgReader_Temp`.
pub fn scratch_dir(config: &Config) -> PathBuf {
    if let Some(ref dir) = config.scratch.dir {
        return dir.clone();
    }
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(SCRATCH_DIR_NAME)
}

/// Return the cache directory for logs.
pub fn cache_dir(config: &Config) -> PathBuf {
    if let Some(ref dir) = config.general.cache_dir {
        return dir.clone();
    }
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("msgreader")
}

/// Return the log file path.
pub fn log_file_path(config: &Config) -> PathBuf {
    cache_dir(config).join("msgreader.log")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = Config::default();
        assert_eq!(cfg.general.log_level, "warn");
        assert_eq!(cfg.render.sanitizer, SanitizerPolicy::Blocklist);
        assert_eq!(cfg.export.message_id_domain, "msgreader.local");
        assert!(cfg.export.open_after_export);
        assert!(cfg.launcher.command.is_none());
    }

    #[test]
    fn test_written_config_reads_back() {
        let mut cfg = Config::default();
        cfg.render.sanitizer = SanitizerPolicy::Allowlist;
        cfg.launcher.command = Some("firefox".into());
        let text = toml::to_string_pretty(&cfg).unwrap();
        assert!(text.contains("sanitizer = \"allowlist\""));

        let back = parse_config(&text).unwrap();
        assert_eq!(back.render.sanitizer, SanitizerPolicy::Allowlist);
        assert_eq!(back.launcher.command.as_deref(), Some("firefox"));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let partial = r#"
[render]
sanitizer = "allowlist"

[export]
open_after_export = false
"#;
        let cfg = parse_config(partial).expect("parse partial");
        assert_eq!(cfg.render.sanitizer, SanitizerPolicy::Allowlist);
        assert!(!cfg.export.open_after_export);
        assert_eq!(cfg.export.message_id_domain, "msgreader.local");
        assert_eq!(cfg.general.log_level, "warn");
    }

    #[test]
    fn test_invalid_sanitizer_is_rejected() {
        let err = parse_config("[render]\nsanitizer = \"strict\"\n").unwrap_err();
        assert!(err.contains("sanitizer") || err.contains("strict"));
    }

    #[test]
    fn test_scratch_dir_override() {
        let mut cfg = Config::default();
        cfg.scratch.dir = Some(PathBuf::from("/tmp/elsewhere"));
        assert_eq!(scratch_dir(&cfg), PathBuf::from("/tmp/elsewhere"));
    }

    #[test]
    fn test_default_scratch_dir_name() {
        let cfg = Config::default();
        assert!(scratch_dir(&cfg).ends_with(SCRATCH_DIR_NAME));
    }
}
