//! Emulator configuration

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// NTSC CPU clock
pub const CPU_CLOCK_HZ: u32 = 1_789_773;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Host-facing settings for the audio stream and frame sequencer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Host audio sample rate in Hz
    pub sample_rate: u32,
    /// CPU cycles between frame sequencer steps
    pub frame_period: u32,
    /// Samples reserved up front in the audio buffer
    pub audio_buffer_capacity: usize,
}

impl Config {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// CPU cycles between two audio samples
    pub fn sample_interval(&self) -> u64 {
        (CPU_CLOCK_HZ / self.sample_rate.max(1)).max(1) as u64
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            frame_period: 7_457,
            audio_buffer_capacity: 4_096,
        }
    }
}
