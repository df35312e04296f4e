//! Scheduling client types
//!
//! Session headers, booking request models, and the wire shapes the
//! usvisa-info JSON endpoints return.

use chrono::NaiveDate;
use serde::Deserialize;

/// Authenticated-session headers produced by login. Callers thread this
/// value through every scheduling call without looking inside it.
#[derive(Debug, Clone)]
pub struct SessionHeaders {
    cookie: String,
    csrf_token: String,
}

impl SessionHeaders {
    pub fn new(cookie: impl Into<String>, csrf_token: impl Into<String>) -> Self {
        Self {
            cookie: cookie.into(),
            csrf_token: csrf_token.into(),
        }
    }

    pub(crate) fn cookie(&self) -> &str {
        &self.cookie
    }

    pub(crate) fn csrf_token(&self) -> &str {
        &self.csrf_token
    }
}

/// A consulate booking, with the ASC leg attached when the schedule
/// requires a separate biometrics appointment.
#[derive(Debug, Clone)]
pub struct BookingRequest {
    pub schedule_id: String,
    pub facility_id: String,
    pub date: NaiveDate,
    pub time: String,
    /// ASC leg; `None` submits the consulate appointment alone
    pub asc: Option<AscAppointment>,
}

/// The ASC (biometrics) leg of a booking
#[derive(Debug, Clone)]
pub struct AscAppointment {
    pub facility_id: String,
    pub date: NaiveDate,
    pub time: String,
}

/// One entry of the `appointment/days/{facility_id}.json` response
#[derive(Debug, Deserialize)]
pub(crate) struct AvailableDay {
    pub date: NaiveDate,
    #[serde(default)]
    #[allow(dead_code)]
    pub business_day: bool,
}

/// The `appointment/times/{facility_id}.json` response
#[derive(Debug, Deserialize)]
pub(crate) struct AvailableTimes {
    #[serde(default)]
    pub available_times: Vec<String>,
    #[serde(default)]
    pub business_times: Vec<String>,
}

impl AvailableTimes {
    /// The slot to book: the site fills business hours first, so prefer the
    /// last business time, then fall back to any available time.
    pub fn best_slot(&self) -> Option<String> {
        self.business_times
            .last()
            .or_else(|| self.available_times.last())
            .cloned()
    }
}

/// Scheduling client error types
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("No CSRF token on {0}")]
    MissingCsrfToken(String),

    #[error("Session expired")]
    SessionExpired,

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Booking rejected: {0}")]
    BookingRejected(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn best_slot_prefers_last_business_time() {
        let times = AvailableTimes {
            available_times: vec!["07:30".into(), "08:00".into()],
            business_times: vec!["09:00".into(), "10:15".into()],
        };
        assert_eq!(times.best_slot().as_deref(), Some("10:15"));
    }

    #[test]
    fn best_slot_falls_back_to_available_times() {
        let times = AvailableTimes {
            available_times: vec!["07:30".into(), "08:00".into()],
            business_times: vec![],
        };
        assert_eq!(times.best_slot().as_deref(), Some("08:00"));
    }

    #[test]
    fn best_slot_is_none_when_everything_is_empty() {
        let times = AvailableTimes {
            available_times: vec![],
            business_times: vec![],
        };
        assert!(times.best_slot().is_none());
    }
}
