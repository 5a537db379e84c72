//! Configuration – reads/writes the bridge's TOML config.
//!
//! Located by (first match) the first CLI argument, `FRAMEBRIDGE_CONFIG`, or
//! `~/.framebridge/config.toml`.  Every field has a default, so a partial file
//! is fine.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use framebridge_perception::{CalibrationEngine, FitMode, PairingError, PairingTable};
use framebridge_runtime::{OrchestratorConfig, ReconnectPolicy};
use framebridge_types::CorrespondencePair;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "FRAMEBRIDGE_CONFIG";

// ─────────────────────────────────────────────────────────────────────────────
// Schema
// ─────────────────────────────────────────────────────────────────────────────

/// Remote endpoint of the peer application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeerConfig {
    pub host: String,
    pub port: u16,
    pub connect_timeout_ms: u64,
}

impl Default for PeerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: 54750,
            connect_timeout_ms: 5000,
        }
    }
}

/// Cycle cadence and framing limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub poll_interval_ms: u64,
    pub receive_timeout_ms: u64,
    pub max_frame_bytes: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 20,
            receive_timeout_ms: 10,
            max_frame_bytes: framebridge_middleware::DEFAULT_MAX_FRAME_BYTES,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    pub mode: FitMode,
    pub estimate_scale: bool,
    /// Audit record location; an empty string disables the record.
    pub record_path: String,
    /// Start calibrated from an existing record.
    pub reuse_record: bool,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            mode: FitMode::Rigid,
            estimate_scale: true,
            record_path: default_record_path(),
            reuse_record: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Detection snapshot file written by the capture process.
    pub path: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            path: default_source_path(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectConfig {
    /// `0` makes a dropped connection fatal.
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            max_attempts: 0,
            initial_backoff_ms: 500,
            max_backoff_ms: 8000,
        }
    }
}

/// Persisted bridge configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub peer: PeerConfig,
    pub session: SessionConfig,
    pub calibration: CalibrationConfig,
    pub source: SourceConfig,
    pub reconnect: ReconnectConfig,
    /// Anchor ↔ detector declarations.
    pub pairs: Vec<CorrespondencePair>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_record_path() -> String {
    "calibration.json".to_string()
}
fn default_source_path() -> String {
    "output.json".to_string()
}

// ─────────────────────────────────────────────────────────────────────────────
// Conversions into runtime types
// ─────────────────────────────────────────────────────────────────────────────

impl Config {
    /// `host:port` of the peer.
    pub fn peer_addr(&self) -> String {
        format!("{}:{}", self.peer.host, self.peer.port)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.peer.connect_timeout_ms)
    }

    pub fn record_path(&self) -> Option<PathBuf> {
        let raw = self.calibration.record_path.trim();
        (!raw.is_empty()).then(|| PathBuf::from(raw))
    }

    pub fn pairing_table(&self) -> Result<PairingTable, PairingError> {
        PairingTable::new(self.pairs.iter().copied())
    }

    pub fn engine(&self) -> CalibrationEngine {
        CalibrationEngine::new(self.calibration.mode, self.calibration.estimate_scale)
    }

    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            poll_interval: Duration::from_millis(self.session.poll_interval_ms),
            receive_timeout: Duration::from_millis(self.session.receive_timeout_ms),
            record_path: self.record_path(),
            reconnect: ReconnectPolicy {
                max_attempts: self.reconnect.max_attempts,
                initial_backoff: Duration::from_millis(self.reconnect.initial_backoff_ms),
                max_backoff: Duration::from_millis(self.reconnect.max_backoff_ms),
            },
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Location
// ─────────────────────────────────────────────────────────────────────────────

/// Where the config comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigSource {
    /// Named on the command line or via `FRAMEBRIDGE_CONFIG`; must exist.
    Explicit(PathBuf),
    /// `~/.framebridge/config.toml`; written with defaults when absent.
    Default(PathBuf),
}

impl ConfigSource {
    pub fn path(&self) -> &Path {
        match self {
            ConfigSource::Explicit(p) | ConfigSource::Default(p) => p,
        }
    }
}

/// Resolve the config location from the first CLI argument and the
/// environment.
pub fn resolve(cli_arg: Option<String>) -> ConfigSource {
    if let Some(path) = cli_arg.filter(|a| !a.trim().is_empty()) {
        return ConfigSource::Explicit(PathBuf::from(path));
    }
    if let Ok(path) = std::env::var(CONFIG_ENV)
        && !path.trim().is_empty()
    {
        return ConfigSource::Explicit(PathBuf::from(path));
    }
    ConfigSource::Default(default_config_path())
}

/// Return the path to `~/.framebridge/config.toml`.
pub fn default_config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".framebridge").join("config.toml")
}

// ─────────────────────────────────────────────────────────────────────────────
// Load / save
// ─────────────────────────────────────────────────────────────────────────────

/// Load the config for `source`.
///
/// A missing explicit file is an error.  A missing default file is created
/// with defaults (a failed write only loses the file, not the run).
/// Environment overrides are applied in every case.
pub fn load(source: &ConfigSource) -> Result<Config, String> {
    let mut cfg = match (source, load_from(source.path())?) {
        (_, Some(cfg)) => cfg,
        (ConfigSource::Explicit(path), None) => {
            return Err(format!("Config file {} does not exist", path.display()));
        }
        (ConfigSource::Default(path), None) => {
            let cfg = Config::default();
            if let Err(e) = save_to(&cfg, path) {
                tracing::warn!(error = %e, "could not write default config");
            }
            cfg
        }
    };
    apply_env_overrides(&mut cfg);
    Ok(cfg)
}

/// Load the config from a specific path.  Returns `None` if the file does not
/// exist.
pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    let cfg: Config = toml::from_str(&raw)
        .map_err(|e| format!("Failed to parse config at {}: {}", path.display(), e))?;
    Ok(Some(cfg))
}

/// Apply `FRAMEBRIDGE_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `FRAMEBRIDGE_HOST` | `peer.host` |
/// | `FRAMEBRIDGE_PORT` | `peer.port` |
/// | `FRAMEBRIDGE_SOURCE` | `source.path` |
/// | `FRAMEBRIDGE_RECORD` | `calibration.record_path` |
///
/// Invalid values are ignored.
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("FRAMEBRIDGE_HOST")
        && !v.trim().is_empty()
    {
        cfg.peer.host = v.trim().to_string();
    }
    if let Ok(v) = std::env::var("FRAMEBRIDGE_PORT")
        && let Ok(port) = v.trim().parse::<u16>()
    {
        cfg.peer.port = port;
    }
    if let Ok(v) = std::env::var("FRAMEBRIDGE_SOURCE")
        && !v.trim().is_empty()
    {
        cfg.source.path = v;
    }
    if let Ok(v) = std::env::var("FRAMEBRIDGE_RECORD") {
        cfg.calibration.record_path = v;
    }
}

/// Save the config to a specific path, creating its directory if necessary.
pub(crate) fn save_to(cfg: &Config, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
        // Owner only (rwx------) on Unix.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(parent, fs::Permissions::from_mode(0o700))
                .map_err(|e| format!("Failed to set config directory permissions: {}", e))?;
        }
    }
    let raw =
        toml::to_string_pretty(cfg).map_err(|e| format!("Failed to serialize config: {}", e))?;
    // Owner-only read/write (rw-------) on Unix.
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .and_then(|mut f| {
                use std::io::Write;
                f.write_all(raw.as_bytes())
            })
            .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    }
    #[cfg(not(unix))]
    fs::write(path, raw)
        .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    Ok(())
}
