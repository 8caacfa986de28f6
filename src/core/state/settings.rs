use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::assets::RESOURCES_URL;
use crate::core::auth::{LaunchAccountProfile, DEFAULT_USERNAME};
use crate::core::downloader::{DEFAULT_CONCURRENCY, DEFAULT_FETCH_TIMEOUT};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::launch::{LaunchConfig, MemoryPolicy};
use crate::core::version::manifest::{DEFAULT_CATALOG_TTL, VERSION_MANIFEST_URL};

pub const APP_DIR_NAME: &str = "mcresolve";
pub const SETTINGS_FILE: &str = "launcher_settings.json";
pub const DATA_DIR_ENV: &str = "MCRESOLVE_DATA_DIR";

pub const WINDOW_WIDTH_RANGE: RangeInclusive<u32> = 800..=3840;
pub const WINDOW_HEIGHT_RANGE: RangeInclusive<u32> = 600..=2160;

/// Persisted launcher preferences. Missing keys take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LauncherSettings {
    pub username: String,
    /// Explicit player id; derived from the username when unset.
    pub uuid: Option<String>,
    pub memory: MemoryPolicy,
    pub window_width: u32,
    pub window_height: u32,
    /// Explicit Java binary; discovered when unset.
    pub java_path: Option<PathBuf>,
    pub extra_jvm_args: Vec<String>,
    pub concurrency: usize,
    pub fetch_timeout_secs: u64,
    pub catalog_ttl_secs: u64,
    pub catalog_url: String,
    /// Base URL for asset objects.
    pub resources_url: String,
    pub wayland_compat: bool,
    pub debug: bool,
}

impl Default for LauncherSettings {
    fn default() -> Self {
        Self {
            username: DEFAULT_USERNAME.to_string(),
            uuid: None,
            memory: MemoryPolicy::Auto,
            window_width: 1280,
            window_height: 720,
            java_path: None,
            extra_jvm_args: Vec::new(),
            concurrency: DEFAULT_CONCURRENCY,
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT.as_secs(),
            catalog_ttl_secs: DEFAULT_CATALOG_TTL.as_secs(),
            catalog_url: VERSION_MANIFEST_URL.to_string(),
            resources_url: RESOURCES_URL.to_string(),
            wayland_compat: true,
            debug: false,
        }
    }
}

impl LauncherSettings {
    /// Load from `<data_dir>/launcher_settings.json`. A missing file yields
    /// defaults; an unreadable one yields defaults with a warning.
    pub fn load(data_dir: &Path) -> Self {
        let path = data_dir.join(SETTINGS_FILE);
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!("Cannot read settings {:?}: {}; using defaults", path, e);
                }
                return Self::default();
            }
        };
        match serde_json::from_str::<Self>(&raw) {
            Ok(settings) => settings,
            Err(e) => {
                warn!("Corrupt settings {:?}: {}; using defaults", path, e);
                Self::default()
            }
        }
    }

    pub fn save(&self, data_dir: &Path) -> LauncherResult<()> {
        std::fs::create_dir_all(data_dir).map_err(|e| LauncherError::io(data_dir, e))?;
        let path = data_dir.join(SETTINGS_FILE);
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, json).map_err(|e| LauncherError::io(&path, e))?;
        debug!("Saved settings to {:?}", path);
        Ok(())
    }

    pub fn validate(&self) -> LauncherResult<()> {
        if self.window_width == 0 || self.window_height == 0 {
            return Err(LauncherError::Config("window size must be nonzero".into()));
        }
        if self.concurrency == 0 {
            return Err(LauncherError::Config("concurrency must be at least 1".into()));
        }
        if self.fetch_timeout_secs == 0 {
            return Err(LauncherError::Config("fetch timeout must be nonzero".into()));
        }
        Ok(())
    }

    /// Change the game window size. Only sizes within
    /// [`WINDOW_WIDTH_RANGE`] x [`WINDOW_HEIGHT_RANGE`] are accepted here;
    /// hand-edited files are only required to be nonzero.
    pub fn set_window_size(&mut self, width: u32, height: u32) -> LauncherResult<()> {
        if !WINDOW_WIDTH_RANGE.contains(&width) || !WINDOW_HEIGHT_RANGE.contains(&height) {
            return Err(LauncherError::Config(format!(
                "window size {width}x{height} outside {}-{} x {}-{}",
                WINDOW_WIDTH_RANGE.start(),
                WINDOW_WIDTH_RANGE.end(),
                WINDOW_HEIGHT_RANGE.start(),
                WINDOW_HEIGHT_RANGE.end()
            )));
        }
        self.window_width = width;
        self.window_height = height;
        Ok(())
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn catalog_ttl(&self) -> Duration {
        Duration::from_secs(self.catalog_ttl_secs)
    }

    pub fn account(&self) -> LaunchAccountProfile {
        LaunchAccountProfile::offline(&self.username, self.uuid.as_deref())
    }

    pub fn launch_config(&self, java_path: PathBuf) -> LaunchConfig {
        LaunchConfig {
            java_path,
            account: self.account(),
            memory: self.memory,
            window_width: self.window_width,
            window_height: self.window_height,
            extra_jvm_args: self.extra_jvm_args.clone(),
            wayland_compat: self.wayland_compat,
            debug: self.debug,
        }
    }
}

fn default_base_dir() -> PathBuf {
    dirs::data_dir().unwrap_or_else(|| PathBuf::from("."))
}

/// `$MCRESOLVE_DATA_DIR`, else `<platform data dir>/mcresolve`.
pub fn default_data_dir() -> PathBuf {
    match std::env::var_os(DATA_DIR_ENV) {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => default_base_dir().join(APP_DIR_NAME),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = LauncherSettings::load(dir.path());
        assert_eq!(settings, LauncherSettings::default());
        assert_eq!(settings.concurrency, 16);
        assert_eq!(settings.fetch_timeout_secs, 30);
        assert_eq!(settings.catalog_ttl_secs, 3600);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(SETTINGS_FILE),
            r#"{"username": "Alex", "memory": "6G"}"#,
        )
        .unwrap();

        let settings = LauncherSettings::load(dir.path());
        assert_eq!(settings.username, "Alex");
        assert_eq!(settings.memory, MemoryPolicy::Explicit(6144));
        assert_eq!(settings.window_width, 1280);
    }

    #[test]
    fn corrupt_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(SETTINGS_FILE), "{not json").unwrap();
        assert_eq!(LauncherSettings::load(dir.path()), LauncherSettings::default());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let settings = LauncherSettings {
            username: "Steve".into(),
            memory: MemoryPolicy::Explicit(3072),
            extra_jvm_args: vec!["-Dfoo=bar".into()],
            ..Default::default()
        };
        settings.save(dir.path()).unwrap();
        assert_eq!(LauncherSettings::load(dir.path()), settings);
    }

    #[test]
    fn validation_rejects_zero_values() {
        let settings = LauncherSettings {
            concurrency: 0,
            ..Default::default()
        };
        assert!(settings.validate().is_err());
        assert!(LauncherSettings::default().validate().is_ok());
    }

    #[test]
    fn window_size_is_bounded() {
        let mut settings = LauncherSettings::default();
        settings.set_window_size(1920, 1080).unwrap();
        assert_eq!((settings.window_width, settings.window_height), (1920, 1080));

        assert!(settings.set_window_size(640, 1080).is_err());
        assert!(settings.set_window_size(1920, 4000).is_err());
        assert_eq!((settings.window_width, settings.window_height), (1920, 1080));

        settings.set_window_size(800, 600).unwrap();
        settings.set_window_size(3840, 2160).unwrap();
    }
}
