//! Navigation configuration.
//!
//! [`NavigationConfig`] bundles the per-component configs (route
//! acquisition, guidance, logging) so that all parts are configured from one
//! place. It can be built in code or loaded from an INI file:
//!
//! ```ini
//! [navigation]
//! position_poll_secs = 5
//! reminder_secs = 30
//! step_advance_threshold_m = 20
//! arrival_threshold_m = 25
//! walking_speed_mps = 1.4
//! request_alternatives = true
//! travel_mode = walking
//!
//! [logging]
//! filter = info,wayfinder=debug
//! log_dir = /var/log/wayfinder
//! ```

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use ini::{Ini, Properties};

use crate::error::{NavError, Result};
use crate::guidance::GuidanceConfig;
use crate::logging::LoggingConfig;
use crate::provider::TravelMode;
use crate::route::RouteConfig;

/// Config file name inside the platform config directory.
pub const CONFIG_FILE_NAME: &str = "config.ini";

/// Application directory name inside the platform config directory.
const APP_DIR_NAME: &str = "wayfinder";

const NAVIGATION_SECTION: &str = "navigation";
const LOGGING_SECTION: &str = "logging";

/// Top-level configuration combining all component configs.
#[derive(Clone, Debug, Default)]
pub struct NavigationConfig {
    /// Route acquisition settings.
    pub route: RouteConfig,

    /// Guidance engine settings (timers, thresholds).
    pub guidance: GuidanceConfig,

    /// Logging settings.
    pub logging: LoggingConfig,
}

impl NavigationConfig {
    /// Default config file location (`~/.config/wayfinder/config.ini` on Linux).
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Load configuration from an INI file.
    pub fn load(path: &Path) -> Result<Self> {
        let ini = Ini::load_from_file(path)
            .map_err(|e| NavError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_ini(&ini)
    }

    /// Parse configuration from INI text.
    pub fn from_ini_str(text: &str) -> Result<Self> {
        let ini = Ini::load_from_str(text).map_err(|e| NavError::Config(e.to_string()))?;
        Self::from_ini(&ini)
    }

    fn from_ini(ini: &Ini) -> Result<Self> {
        let mut config = Self::default();

        if let Some(section) = ini.section(Some(NAVIGATION_SECTION)) {
            if let Some(secs) = parse_key::<u64>(section, "position_poll_secs")? {
                config.guidance.position_poll_interval = Duration::from_secs(secs);
            }
            if let Some(secs) = parse_key::<u64>(section, "reminder_secs")? {
                config.guidance.reminder_interval = Duration::from_secs(secs);
            }
            if let Some(m) = parse_key::<f64>(section, "step_advance_threshold_m")? {
                config.guidance.step_advance_threshold_m = m;
            }
            if let Some(m) = parse_key::<f64>(section, "arrival_threshold_m")? {
                config.guidance.arrival_threshold_m = m;
            }
            if let Some(speed) = parse_key::<f64>(section, "walking_speed_mps")? {
                config.route.walking_speed_mps = speed;
                config.guidance.walking_speed_mps = speed;
            }
            if let Some(flag) = parse_key::<bool>(section, "request_alternatives")? {
                config.route.request_alternatives = flag;
            }
            if let Some(mode) = parse_key::<TravelMode>(section, "travel_mode")? {
                config.route.travel_mode = mode;
            }
            if let Some(capacity) = parse_key::<usize>(section, "event_channel_capacity")? {
                config.guidance.event_channel_capacity = capacity;
            }
        }

        if let Some(section) = ini.section(Some(LOGGING_SECTION)) {
            if let Some(filter) = section.get("filter") {
                config.logging.filter = filter.trim().to_string();
            }
            if let Some(dir) = section.get("log_dir") {
                let dir = dir.trim();
                config.logging.log_dir = (!dir.is_empty()).then(|| PathBuf::from(dir));
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Check that thresholds, speeds and intervals are usable.
    pub fn validate(&self) -> Result<()> {
        let g = &self.guidance;
        if g.position_poll_interval.is_zero() {
            return Err(NavError::Config(
                "position_poll_secs must be greater than zero".to_string(),
            ));
        }
        if g.reminder_interval.is_zero() {
            return Err(NavError::Config(
                "reminder_secs must be greater than zero".to_string(),
            ));
        }
        check_positive("step_advance_threshold_m", g.step_advance_threshold_m)?;
        check_positive("arrival_threshold_m", g.arrival_threshold_m)?;
        check_positive("walking_speed_mps", self.route.walking_speed_mps)?;
        check_positive("walking_speed_mps", g.walking_speed_mps)?;
        if g.event_channel_capacity == 0 {
            return Err(NavError::Config(
                "event_channel_capacity must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Set the walking speed used for fallback routes and ETAs.
    pub fn with_walking_speed(mut self, meters_per_second: f64) -> Self {
        self.route.walking_speed_mps = meters_per_second;
        self.guidance.walking_speed_mps = meters_per_second;
        self
    }

    /// Set the arrival threshold.
    pub fn with_arrival_threshold(mut self, meters: f64) -> Self {
        self.guidance.arrival_threshold_m = meters;
        self
    }
}

fn check_positive(key: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(NavError::Config(format!(
            "{} must be a positive number, got {}",
            key, value
        )))
    }
}

fn parse_key<T>(section: &Properties, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match section.get(key) {
        None => Ok(None),
        Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|e| {
            NavError::Config(format!(
                "invalid value '{}' for {}.{}: {}",
                raw, NAVIGATION_SECTION, key, e
            ))
        }),
    }
}
