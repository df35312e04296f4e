//! Visa Slot Bot
//!
//! Automated rescheduling of US visa interview appointments on
//! ais.usvisa-info.com: signs in with the applicant's credentials, polls the
//! consulate facility for dates earlier than the currently booked one, and
//! books the consulate appointment together with the associated service
//! center (ASC) biometrics appointment when one is configured.

pub mod bot;
pub mod client;
pub mod pacing;

use std::path::PathBuf;
use tracing::{error, info, warn};

use chrono::NaiveDate;
use pacing::PollConfig;

/// Bot configuration
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BotConfig {
    /// usvisa-info country slug, e.g. "ca" for Canada ("en-ca" site)
    pub country_code: String,
    /// Account credentials
    pub email: String,
    pub password: String,

    /// Appointment schedule id (from the account's scheduling URL)
    pub schedule_id: String,
    /// Consulate facility id
    pub facility_id: String,
    /// ASC facility id for the biometrics appointment, if one is required
    #[serde(default)]
    pub facility_id_asc: Option<String>,

    /// The appointment date currently held; only strictly earlier dates are
    /// considered an improvement
    pub current_booked_date: NaiveDate,
    /// Earliest acceptable date (e.g. after a mandated waiting period)
    #[serde(default)]
    pub min_date: Option<NaiveDate>,

    /// Poll pacing
    #[serde(default)]
    pub poll: PollConfig,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            country_code: "ca".to_string(),
            email: String::new(),
            password: String::new(),
            schedule_id: String::new(),
            facility_id: String::new(),
            facility_id_asc: None,
            // No booking held yet: any open date counts as an improvement
            current_booked_date: NaiveDate::MAX,
            min_date: None,
            poll: PollConfig::default(),
        }
    }
}

/// Get log directory path (shared across modules)
pub fn log_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("visa-slot-bot").join("logs"))
}

impl BotConfig {
    /// Get config file path
    fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("visa-slot-bot").join("config.json"))
    }

    /// Load config from the default location, falling back to defaults
    pub fn load() -> Self {
        if let Some(path) = Self::config_path() {
            if path.exists() {
                match Self::load_from(&path) {
                    Ok(config) => {
                        info!("Loaded config from {:?}", path);
                        return config;
                    }
                    Err(e) => {
                        warn!("Failed to load config file: {}", e);
                    }
                }
            }
        }
        Self::default()
    }

    /// Load config from an explicit path
    pub fn load_from(path: &std::path::Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read {:?}: {}", path, e))?;
        serde_json::from_str(&content).map_err(|e| format!("failed to parse {:?}: {}", path, e))
    }

    /// Save config to file
    pub fn save(&self) {
        if let Some(path) = Self::config_path() {
            // Create parent directory if needed
            if let Some(parent) = path.parent() {
                if let Err(e) = std::fs::create_dir_all(parent) {
                    error!("Failed to create config directory: {}", e);
                    return;
                }
            }

            match serde_json::to_string_pretty(self) {
                Ok(content) => {
                    if let Err(e) = std::fs::write(&path, content) {
                        error!("Failed to save config: {}", e);
                    } else {
                        info!("Config saved to {:?}", path);
                    }
                }
                Err(e) => {
                    error!("Failed to serialize config: {}", e);
                }
            }
        }
    }

    /// Check that the fields the scheduling site requires are present
    pub fn validate(&self) -> Result<(), String> {
        if self.country_code.is_empty() {
            return Err("countryCode is not set".into());
        }
        if self.email.is_empty() || self.password.is_empty() {
            return Err("email/password credentials are not set".into());
        }
        if self.schedule_id.is_empty() {
            return Err("scheduleId is not set".into());
        }
        if self.facility_id.is_empty() {
            return Err("facilityId is not set".into());
        }
        if let Some(asc) = &self.facility_id_asc {
            if asc.is_empty() {
                return Err("facilityIdAsc is set but empty".into());
            }
        }
        Ok(())
    }
}

/// Initialize logging (console always, daily-rolling file when available)
pub fn init_logging(verbose: bool) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    let env_filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(false);

    if let Some(log_dir) = log_dir() {
        let _ = std::fs::create_dir_all(&log_dir);
        let file_appender = tracing_appender::rolling::daily(&log_dir, "visa-slot-bot.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_target(true)
            .with_writer(non_blocking);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer)
            .with(file_layer)
            .init();

        Some(guard)
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer)
            .init();

        None
    }
}

/// Truncate a string to at most `max` bytes without splitting a character.
/// Used when logging response bodies.
pub fn safe_truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config() -> BotConfig {
        BotConfig {
            country_code: "ca".into(),
            email: "user@example.com".into(),
            password: "hunter2".into(),
            schedule_id: "12345678".into(),
            facility_id: "94".into(),
            facility_id_asc: Some("95".into()),
            current_booked_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            min_date: Some(NaiveDate::from_ymd_opt(2025, 1, 10).unwrap()),
            poll: PollConfig::default(),
        }
    }

    #[test]
    fn config_round_trips_through_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.json");

        let config = sample_config();
        std::fs::write(&path, serde_json::to_string_pretty(&config).unwrap()).unwrap();

        let loaded = BotConfig::load_from(&path).unwrap();
        assert_eq!(loaded.country_code, "ca");
        assert_eq!(loaded.facility_id_asc.as_deref(), Some("95"));
        assert_eq!(
            loaded.current_booked_date,
            NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
        );
    }

    #[test]
    fn config_uses_camel_case_field_names() {
        let json = serde_json::to_string(&sample_config()).unwrap();
        assert!(json.contains("\"countryCode\""));
        assert!(json.contains("\"scheduleId\""));
        assert!(json.contains("\"facilityIdAsc\""));
        assert!(json.contains("\"currentBookedDate\":\"2025-06-01\""));
    }

    #[test]
    fn optional_fields_default_when_missing() {
        let json = r#"{
            "countryCode": "gb",
            "email": "a@b.c",
            "password": "pw",
            "scheduleId": "1",
            "facilityId": "2",
            "currentBookedDate": "2025-12-24"
        }"#;
        let config: BotConfig = serde_json::from_str(json).unwrap();
        assert!(config.facility_id_asc.is_none());
        assert!(config.min_date.is_none());
        assert_eq!(config.poll.interval_secs, PollConfig::default().interval_secs);
    }

    #[test]
    fn validate_rejects_missing_credentials() {
        let mut config = sample_config();
        config.email = String::new();
        assert!(config.validate().is_err());

        let mut config = sample_config();
        config.schedule_id = String::new();
        assert!(config.validate().is_err());

        assert!(sample_config().validate().is_ok());
    }

    #[test]
    fn safe_truncate_respects_char_boundaries() {
        assert_eq!(safe_truncate("hello", 10), "hello");
        assert_eq!(safe_truncate("hello", 3), "hel");
        // Multi-byte characters are not split
        assert_eq!(safe_truncate("héllo", 2), "h");
    }
}
