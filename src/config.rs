//! Audio configuration
//!
//! Host-side audio settings consumed by the APU at reset/init time.
//! Changing a value on a live engine takes effect only after the next
//! reset, matching the hardware-facing semantics of the emulator core.

use serde::{Deserialize, Serialize};

/// Default output sample rate in Hz
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// Maximum master volume value (inclusive)
pub const MAX_MASTER_VOLUME: u8 = 128;

/// Host audio configuration
///
/// `volume` is the global configuration volume knob (0-128), distinct from
/// the APU's own main volume register. Both participate in the composite
/// per-channel volume chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Output sample rate in samples/sec
    pub sample_rate: u32,
    /// Global master volume, 0-128
    pub volume: u8,
}

impl Default for AudioConfig {
    fn default() -> Self {
        AudioConfig {
            sample_rate: DEFAULT_SAMPLE_RATE,
            volume: MAX_MASTER_VOLUME,
        }
    }
}

impl AudioConfig {
    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns [`crate::ApuError::ConfigError`] if the sample rate is zero
    /// or the master volume exceeds 128.
    pub fn validate(&self) -> crate::Result<()> {
        if self.sample_rate == 0 {
            return Err(crate::ApuError::ConfigError(
                "sample_rate must be greater than 0".into(),
            ));
        }
        if self.volume > MAX_MASTER_VOLUME {
            return Err(crate::ApuError::ConfigError(format!(
                "volume {} exceeds maximum {}",
                self.volume, MAX_MASTER_VOLUME
            )));
        }
        Ok(())
    }

    /// Parse a configuration from a JSON string
    ///
    /// # Errors
    ///
    /// Returns [`crate::ApuError::ConfigError`] if the JSON does not parse
    /// or the parsed values fail validation.
    pub fn from_json(json: &str) -> crate::Result<Self> {
        let config: AudioConfig = serde_json::from_str(json)
            .map_err(|e| crate::ApuError::ConfigError(format!("bad config JSON: {e}")))?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AudioConfig::default();
        assert_eq!(config.sample_rate, 44_100);
        assert_eq!(config.volume, 128);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_sample_rate_rejected() {
        let config = AudioConfig {
            sample_rate: 0,
            volume: 128,
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("sample_rate"));
    }

    #[test]
    fn test_excessive_volume_rejected() {
        let config = AudioConfig {
            sample_rate: 44_100,
            volume: 129,
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("exceeds maximum"));
    }

    #[test]
    fn test_json_round_trip() {
        let config = AudioConfig {
            sample_rate: 32_768,
            volume: 64,
        };
        let json = serde_json::to_string(&config).unwrap();
        let parsed = AudioConfig::from_json(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_invalid_json_rejected() {
        assert!(AudioConfig::from_json("{not json").is_err());
        assert!(AudioConfig::from_json(r#"{"sample_rate":44100,"volume":200}"#).is_err());
    }
}
