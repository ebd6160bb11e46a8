use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::player::{BufferPolicy, PlayerConfig};

/// Longest fade or error display a settings file may ask for
const MAX_TIMING_SECS: f32 = 60.0;

/// Returns the path to the settings file: `~/.config/brown-rs/settings.json`
fn settings_path() -> PathBuf {
    let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("brown-rs");
    path.push("settings.json");
    path
}

/// Persisted application settings.
///
/// Serialized as JSON to the platform config directory.
/// Fields use `#[serde(default)]` so that adding new settings
/// won't break existing config files. Volume is deliberately not stored;
/// every launch starts at the default level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    // Noise
    pub buffer_secs: f64,
    pub buffer_policy: BufferPolicy,
    pub seed: Option<u64>,

    // Fades
    pub fade_in_secs: f32,
    pub fade_out_secs: f32,
    pub error_display_secs: f32,

    // Gesture
    pub sensitivity: f32,
    pub band_width: f32,

    // Display
    pub button_radius: f32,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            buffer_secs: 2.0,
            buffer_policy: BufferPolicy::Regenerate,
            seed: None,

            fade_in_secs: 1.0,
            fade_out_secs: 0.5,
            error_display_secs: 2.0,

            sensitivity: crate::gesture::DEFAULT_SENSITIVITY,
            band_width: crate::gesture::DEFAULT_BAND_WIDTH,

            button_radius: 90.0,
        }
    }
}

impl AppSettings {
    /// Load settings from disk, falling back to defaults on any error.
    ///
    /// A missing file is created with the defaults so there is something
    /// to edit.
    pub fn load() -> Self {
        let path = settings_path();
        match std::fs::read_to_string(&path) {
            Ok(contents) => Self::parse(&contents).unwrap_or_else(|e| {
                log::warn!("Failed to parse settings ({}), using defaults", e);
                Self::default()
            }),
            Err(e) => {
                log::info!("No settings file found ({}), using defaults", e);
                let settings = Self::default();
                settings.save();
                settings
            }
        }
    }

    /// Parse and sanitize settings JSON
    pub fn parse(contents: &str) -> Result<Self, serde_json::Error> {
        let mut settings: Self = serde_json::from_str(contents)?;
        settings.sanitize();
        log::info!("Loaded settings from {}", settings_path().display());
        Ok(settings)
    }

    /// Save settings to disk as pretty JSON.
    pub fn save(&self) {
        let path = settings_path();
        if let Some(parent) = path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                log::warn!("Failed to create config directory: {}", e);
                return;
            }
        }
        match serde_json::to_string_pretty(self) {
            Ok(json) => {
                if let Err(e) = std::fs::write(&path, json) {
                    log::warn!("Failed to write settings: {}", e);
                }
            }
            Err(e) => {
                log::warn!("Failed to serialize settings: {}", e);
            }
        }
    }

    /// Replace unusable values with their defaults
    fn sanitize(&mut self) {
        let defaults = Self::default();

        fn positive(value: f32) -> bool {
            value.is_finite() && value > 0.0
        }
        fn timing(value: f32) -> bool {
            value.is_finite() && (0.0..=MAX_TIMING_SECS).contains(&value)
        }

        if !(self.buffer_secs.is_finite() && self.buffer_secs > 0.0 && self.buffer_secs <= 60.0) {
            log::warn!("buffer_secs {} out of range, using {}", self.buffer_secs, defaults.buffer_secs);
            self.buffer_secs = defaults.buffer_secs;
        }
        if !timing(self.fade_in_secs) {
            log::warn!("fade_in_secs {} out of range, using {}", self.fade_in_secs, defaults.fade_in_secs);
            self.fade_in_secs = defaults.fade_in_secs;
        }
        if !timing(self.fade_out_secs) {
            log::warn!("fade_out_secs {} out of range, using {}", self.fade_out_secs, defaults.fade_out_secs);
            self.fade_out_secs = defaults.fade_out_secs;
        }
        if !timing(self.error_display_secs) {
            log::warn!(
                "error_display_secs {} out of range, using {}",
                self.error_display_secs,
                defaults.error_display_secs
            );
            self.error_display_secs = defaults.error_display_secs;
        }
        if !positive(self.sensitivity) {
            log::warn!("sensitivity {} invalid, using {}", self.sensitivity, defaults.sensitivity);
            self.sensitivity = defaults.sensitivity;
        }
        if !positive(self.band_width) {
            log::warn!("band_width {} invalid, using {}", self.band_width, defaults.band_width);
            self.band_width = defaults.band_width;
        }
        if !positive(self.button_radius) {
            log::warn!("button_radius {} invalid, using {}", self.button_radius, defaults.button_radius);
            self.button_radius = defaults.button_radius;
        }
    }

    /// Coordinator configuration for these settings
    pub fn player_config(&self) -> PlayerConfig {
        PlayerConfig {
            buffer_secs: self.buffer_secs,
            buffer_policy: self.buffer_policy,
            seed: self.seed,
            fade_in: Duration::from_secs_f32(self.fade_in_secs),
            fade_out: Duration::from_secs_f32(self.fade_out_secs),
            error_display: Duration::from_secs_f32(self.error_display_secs),
            sensitivity: self.sensitivity,
            band_width: self.band_width,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_player_defaults() {
        assert_eq!(AppSettings::default().player_config(), PlayerConfig::default());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let settings = AppSettings::parse(r#"{ "fade_in_secs": 3.0, "buffer_policy": "cache" }"#).unwrap();
        assert_eq!(settings.fade_in_secs, 3.0);
        assert_eq!(settings.buffer_policy, BufferPolicy::Cache);
        assert_eq!(settings.fade_out_secs, 0.5);
        assert_eq!(settings.sensitivity, 0.002);
    }

    #[test]
    fn test_unknown_fields_are_tolerated() {
        // Old files may still carry a volume field; it is not restored
        let settings = AppSettings::parse(r#"{ "volume": 0.9 }"#).unwrap();
        assert_eq!(settings, AppSettings::default());
    }

    #[test]
    fn test_out_of_range_values_fall_back() {
        let settings = AppSettings::parse(
            r#"{ "buffer_secs": -2.0, "sensitivity": 0.0, "fade_out_secs": -1.0, "button_radius": 0.0 }"#,
        )
        .unwrap();
        let defaults = AppSettings::default();
        assert_eq!(settings.buffer_secs, defaults.buffer_secs);
        assert_eq!(settings.sensitivity, defaults.sensitivity);
        assert_eq!(settings.fade_out_secs, defaults.fade_out_secs);
        assert_eq!(settings.button_radius, defaults.button_radius);
    }

    #[test]
    fn test_huge_timings_fall_back() {
        let settings = AppSettings::parse(
            r#"{ "fade_in_secs": 1e30, "fade_out_secs": 61.0, "error_display_secs": 3.4e38 }"#,
        )
        .unwrap();
        let config = settings.player_config();
        let defaults = PlayerConfig::default();
        assert_eq!(config.fade_in, defaults.fade_in);
        assert_eq!(config.fade_out, defaults.fade_out);
        assert_eq!(config.error_display, defaults.error_display);

        let settings = AppSettings::parse(r#"{ "fade_in_secs": 60.0 }"#).unwrap();
        assert_eq!(settings.player_config().fade_in, Duration::from_secs(60));
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        assert!(AppSettings::parse("{ not json").is_err());
    }
}
