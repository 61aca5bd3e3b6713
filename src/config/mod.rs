//! Configuration file management
//!
//! Loads TOML configuration files and provides dispatcher settings.
//! Default config path: ~/.config/recovery-input/config.toml

use anyhow::{Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{
    CONTROL_SOCKET_NAME, DEFAULT_MIN_SWIPE_X_PX, DEFAULT_MIN_SWIPE_Y_PX, KEY_QUEUE_CAPACITY,
    LCD_DENSITY_PROPERTY, LONG_PRESS_MS, MOUNTS_PATH, TRACKBALL_THRESHOLD, USB_STATE_PATH,
    WAIT_KEY_SLICE, WAIT_KEY_TIMEOUT_SECS,
};
use crate::input::SwipeThresholds;
use crate::keys::WaitConfig;

/// Dispatcher settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Input devices and key handling
    pub input: InputConfig,
    /// Foreground wait behaviour
    pub wait: WaitSettings,
    /// Touch swipe thresholds
    pub gesture: GestureConfig,
    /// Control socket
    pub control: ControlConfig,
    /// Properties and system partition
    pub system: SystemConfig,
    /// Volume change notifications
    pub volumes: VolumesConfig,
}

/// Input settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Directory scanned for event* nodes
    pub device_dir: PathBuf,
    /// Foreground queue capacity (keys beyond this are dropped)
    pub queue_capacity: usize,
    /// Hold time before a press counts as long (ms)
    pub long_press_ms: u64,
    /// Accumulated trackball motion that makes one arrow key
    pub trackball_threshold: i32,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            device_dir: PathBuf::from("/dev/input"),
            queue_capacity: KEY_QUEUE_CAPACITY,
            long_press_ms: LONG_PRESS_MS,
            trackball_threshold: TRACKBALL_THRESHOLD,
        }
    }
}

impl InputConfig {
    pub fn long_press(&self) -> Duration {
        Duration::from_millis(self.long_press_ms)
    }
}

/// wait_key settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WaitSettings {
    /// Give up waiting after this many seconds (unless USB is connected)
    pub timeout_secs: u64,
    /// android_usb state file
    pub usb_state_path: PathBuf,
    /// Cache the USB probe this long (0 = probe every time, max 999)
    pub usb_probe_ttl_ms: u64,
}

impl Default for WaitSettings {
    fn default() -> Self {
        Self {
            timeout_secs: WAIT_KEY_TIMEOUT_SECS,
            usb_state_path: PathBuf::from(USB_STATE_PATH),
            usb_probe_ttl_ms: 0,
        }
    }
}

impl WaitSettings {
    pub fn wait_config(&self) -> WaitConfig {
        WaitConfig {
            timeout: Duration::from_secs(self.timeout_secs),
            slice: WAIT_KEY_SLICE,
        }
    }
}

/// Swipe settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    /// Display density in dpi (0 = read `density_property`)
    pub density: u32,
    /// Property holding the display density
    pub density_property: String,
    /// Horizontal swipe length when the density is unknown (px)
    pub fallback_min_dx: i32,
    /// Vertical swipe length when the density is unknown (px)
    pub fallback_min_dy: i32,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            density: 0,
            density_property: LCD_DENSITY_PROPERTY.to_string(),
            fallback_min_dx: DEFAULT_MIN_SWIPE_X_PX,
            fallback_min_dy: DEFAULT_MIN_SWIPE_Y_PX,
        }
    }
}

impl GestureConfig {
    pub fn fallback(&self) -> SwipeThresholds {
        SwipeThresholds {
            min_dx: self.fallback_min_dx,
            min_dy: self.fallback_min_dy,
        }
    }
}

/// Control socket settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    pub enabled: bool,
    /// "@name" for the abstract namespace, otherwise a filesystem path
    pub socket: String,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            socket: CONTROL_SOCKET_NAME.to_string(),
        }
    }
}

/// System settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    /// Property files read off-Android, later ones override earlier ones
    pub property_files: Vec<PathBuf>,
    /// Allow the volume alternation chord to mount the system partition
    pub mount_system: bool,
    pub system_mount_point: String,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            property_files: vec![
                PathBuf::from("/default.prop"),
                PathBuf::from("/system/build.prop"),
                PathBuf::from("/vendor/build.prop"),
            ],
            mount_system: true,
            system_mount_point: "/system".to_string(),
        }
    }
}

impl SystemConfig {
    /// Mount point for the mount-system chord, if enabled
    pub fn mount_target(&self) -> Option<String> {
        self.mount_system.then(|| self.system_mount_point.clone())
    }
}

/// Volume watcher settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumesConfig {
    /// Watch the mount table and refresh the foreground on changes
    pub watch_mounts: bool,
    pub mounts_path: PathBuf,
}

impl Default for VolumesConfig {
    fn default() -> Self {
        Self {
            watch_mounts: true,
            mounts_path: PathBuf::from(MOUNTS_PATH),
        }
    }
}

impl Config {
    /// System-wide config path
    const SYSTEM_CONFIG_PATH: &'static str = "/etc/recovery-input/config.toml";

    /// Get the path that would be used for loading config
    /// Returns None if using built-in defaults
    pub fn config_path() -> Option<PathBuf> {
        // 1. RECOVERY_INPUT_CONFIG environment variable
        if let Ok(path) = std::env::var("RECOVERY_INPUT_CONFIG") {
            let p = std::path::Path::new(&path);
            if p.exists() {
                return Some(p.to_path_buf());
            }
        }

        // 2. User config: ~/.config/recovery-input/config.toml
        if let Some(config_path) = default_config_path() {
            if config_path.exists() {
                return Some(config_path);
            }
        }

        // 3. System config: /etc/recovery-input/config.toml
        let system_config = std::path::Path::new(Self::SYSTEM_CONFIG_PATH);
        if system_config.exists() {
            return Some(system_config.to_path_buf());
        }

        None
    }

    /// Load configuration with priority:
    /// 1. RECOVERY_INPUT_CONFIG environment variable
    /// 2. ~/.config/recovery-input/config.toml (user config)
    /// 3. /etc/recovery-input/config.toml (system config)
    /// 4. Built-in defaults
    pub fn load() -> Self {
        if let Some(path) = Self::config_path() {
            match Self::load_from_file(&path) {
                Ok(config) => {
                    info!("Loaded config: {}", path.display());
                    return config;
                }
                Err(e) => {
                    warn!("Failed to load config {}: {:#}", path.display(), e);
                }
            }
        }
        info!("Using built-in default config");
        Self::default()
    }

    /// Load settings from specified path
    pub fn load_from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    /// Effective configuration as TOML (for --print-config)
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }
}

/// Get default config file path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("recovery-input").join("config.toml"))
}
