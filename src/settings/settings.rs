// Settings management and persistence
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::audio::format::{
    AudioFormat, ByteOrder, SampleEncoding, DEFAULT_CHANNEL_COUNT, DEFAULT_SAMPLE_RATE,
    DEFAULT_SAMPLE_SIZE, PCM_CODEC,
};
use crate::audio::loader::HeaderMode;
use crate::error::{Error, Result};

/// Output format settings, applied once when the device is opened
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    pub sample_size: u16,
    pub sample_rate: u32,
    pub channel_count: u16,
    pub byte_order: ByteOrder,
    pub sample_encoding: SampleEncoding,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            sample_size: DEFAULT_SAMPLE_SIZE,
            sample_rate: DEFAULT_SAMPLE_RATE,
            channel_count: DEFAULT_CHANNEL_COUNT,
            byte_order: ByteOrder::LittleEndian,
            sample_encoding: SampleEncoding::UnsignedInt,
        }
    }
}

/// Loader settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderSettings {
    pub header: HeaderMode,
}

/// Main player settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerSettings {
    pub version: i32, // Settings schema version for future migrations
    pub output: OutputSettings,
    pub loader: LoaderSettings,
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            version: 1,
            output: OutputSettings::default(),
            loader: LoaderSettings::default(),
        }
    }
}

impl PlayerSettings {
    /// Default settings directory (`<config dir>/wavplayer`)
    pub fn default_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("wavplayer"))
    }

    /// Get the settings file path
    pub fn get_settings_path(dir: &Path) -> PathBuf {
        dir.join("settings.json")
    }

    /// Load settings from file, or return defaults if file doesn't exist
    pub fn load(dir: &Path) -> Result<Self> {
        let path = Self::get_settings_path(dir);

        if !path.exists() {
            debug!("[Settings] No settings file at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)
            .map_err(|e| Error::Config(format!("Failed to read settings file: {}", e)))?;

        let settings: PlayerSettings = serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse settings: {}", e)))?;

        info!("[Settings] Loaded settings from {:?}", path);
        Ok(settings)
    }

    /// Save settings to file
    pub fn save(&self, dir: &Path) -> Result<()> {
        // Ensure directory exists
        fs::create_dir_all(dir)
            .map_err(|e| Error::Config(format!("Failed to create settings directory: {}", e)))?;

        let path = Self::get_settings_path(dir);
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize settings: {}", e)))?;

        fs::write(&path, content)
            .map_err(|e| Error::Config(format!("Failed to write settings file: {}", e)))?;

        info!("[Settings] Saved settings to {:?}", path);
        Ok(())
    }

    /// The fixed output format these settings describe
    pub fn audio_format(&self) -> AudioFormat {
        AudioFormat {
            sample_size: self.output.sample_size,
            sample_rate: self.output.sample_rate,
            channel_count: self.output.channel_count,
            byte_order: self.output.byte_order,
            sample_encoding: self.output.sample_encoding,
            codec: PCM_CODEC.to_string(),
        }
    }
}
