//! Capture configuration persistence
//!
//! Stores the device and stream parameters requested at startup.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::source::StreamRequest;

/// Device name that selects the host's default input
pub const DEFAULT_DEVICE: &str = "default";

/// Capture configuration
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureConfig {
    /// Input device name, or [`DEFAULT_DEVICE`]
    pub device: String,
    /// Requested bits per sample
    pub bits: u16,
    /// Requested interleaved channel count
    pub channels: u16,
    /// Requested sample rate; the nearest supported rate is used
    pub rate_hint: u32,
    /// Requested frames per hardware period
    pub frames_per_period: u32,
    /// How long a window read may wait for samples
    pub read_timeout: Duration,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            device: DEFAULT_DEVICE.to_string(),
            bits: 16,
            channels: 2,
            rate_hint: 44100,
            frames_per_period: 256,
            read_timeout: Duration::from_secs(5),
        }
    }
}

impl CaptureConfig {
    /// Load config from the default location
    ///
    /// Returns default config if file doesn't exist or can't be read.
    pub fn load() -> Self {
        let path = Self::config_path();
        Self::load_from(&path).unwrap_or_default()
    }

    /// Load config from a specific path
    pub fn load_from(path: &Path) -> io::Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(Self::parse(&content))
    }

    /// Save config to the default location
    pub fn save(&self) -> io::Result<()> {
        let path = Self::config_path();
        self.save_to(&path)
    }

    /// Save config to a specific path
    pub fn save_to(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(path, self.serialize())
    }

    /// Get the default config file path
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tempo")
            .join("capture.txt")
    }

    /// Stream parameters to ask the device for
    pub fn request(&self) -> StreamRequest {
        StreamRequest {
            bits: self.bits,
            channels: self.channels,
            rate_hint: self.rate_hint,
            frames_per_period: self.frames_per_period,
        }
    }

    /// Parse config from simple key=value format
    ///
    /// Unknown keys and unparsable values keep their defaults.
    fn parse(content: &str) -> Self {
        let mut config = Self::default();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let value = value.trim();

            match key.trim() {
                "device" if !value.is_empty() => config.device = value.to_string(),
                "bits" => config.bits = value.parse().unwrap_or(config.bits),
                "channels" => config.channels = value.parse().unwrap_or(config.channels),
                "rate_hint" => config.rate_hint = value.parse().unwrap_or(config.rate_hint),
                "frames_per_period" => {
                    config.frames_per_period = value.parse().unwrap_or(config.frames_per_period)
                }
                "read_timeout_ms" => {
                    if let Ok(ms) = value.parse() {
                        config.read_timeout = Duration::from_millis(ms);
                    }
                }
                _ => {}
            }
        }

        config
    }

    /// Serialize config to simple key=value format
    fn serialize(&self) -> String {
        [
            "# Tempo capture configuration".to_string(),
            format!("device={}", self.device),
            format!("bits={}", self.bits),
            format!("channels={}", self.channels),
            format!("rate_hint={}", self.rate_hint),
            format!("frames_per_period={}", self.frames_per_period),
            format!("read_timeout_ms={}", self.read_timeout.as_millis()),
        ]
        .join("\n")
    }
}
