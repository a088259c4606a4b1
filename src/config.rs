//! Site configuration.
//!
//! Settings are read from a JSON file. Lookup order: an explicit path, the
//! `CLUB_WIDGETS_CONFIG` environment variable, then
//! `<config dir>/club_widgets/config.json`. Missing files fall back to the
//! built-in defaults; every field is optional in the file.

use std::path::{Path, PathBuf};

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SiteError};

/// Application name used for the config directory
const APP_NAME: &str = "club_widgets";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Environment variable overriding the config path
pub const CONFIG_ENV: &str = "CLUB_WIDGETS_CONFIG";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub club_name: String,
    pub club_short_name: String,
    /// Origin used for absolute urls in structured data, e.g. `https://example.org`
    pub site_url: String,
    pub results_path: String,
    pub ics_url: String,
    /// Offset applied to timestamps that carry none
    pub utc_offset_minutes: i32,
    pub default_location_name: Option<String>,
    pub default_location_address: Option<String>,
    pub show_location: String,
    pub currency: String,
    pub calendar: CalendarConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarConfig {
    pub name: String,
    pub description: String,
    pub prodid: String,
    pub tzid: String,
    pub default_location: String,
    pub uid_domain: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        SiteConfig {
            club_name: "Sydney Amateur Winemakers Club".to_string(),
            club_short_name: "SAWC".to_string(),
            site_url: "https://sydneyawc.com".to_string(),
            results_path: "/results/".to_string(),
            ics_url: "/assets/sawc-events.ics".to_string(),
            utc_offset_minutes: 600,
            default_location_name: None,
            default_location_address: None,
            show_location: "Club Rivers, Riverwood NSW".to_string(),
            currency: "AUD".to_string(),
            calendar: CalendarConfig::default(),
        }
    }
}

impl Default for CalendarConfig {
    fn default() -> Self {
        CalendarConfig {
            name: "Sydney Amateur Winemakers Club".to_string(),
            description: "Meetings and club events for the Sydney Amateur Winemakers Club".to_string(),
            prodid: "-//Sydney AWC//sawc-events//EN".to_string(),
            tzid: "Australia/Sydney".to_string(),
            default_location: "Club Rivers, 32 Littleton St, Riverwood NSW 2210".to_string(),
            uid_domain: "sydneyawc.com".to_string(),
        }
    }
}

impl SiteConfig {
    /// Loads the config from `path` when given (the file must exist), else
    /// from the environment override or the default location.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load_from(path);
        }
        if let Ok(env_path) = std::env::var(CONFIG_ENV) {
            return Self::load_from(Path::new(&env_path));
        }
        match Self::default_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: SiteConfig = serde_json::from_str(&contents)?;
        config.offset()?;
        tracing::debug!(path = %path.display(), "loaded site config");
        Ok(config)
    }

    fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Fixed offset for timestamps without one.
    pub fn offset(&self) -> Result<FixedOffset> {
        FixedOffset::east_opt(self.utc_offset_minutes * 60).ok_or_else(|| {
            SiteError::InvalidConfig(format!(
                "utc_offset_minutes out of range: {}",
                self.utc_offset_minutes
            ))
        })
    }

    /// Absolute url of the results page.
    pub fn results_url(&self) -> String {
        format!("{}{}", self.site_url.trim_end_matches('/'), self.results_path)
    }
}
