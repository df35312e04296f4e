//! Scheduling client for ais.usvisa-info.com
//!
//! Provides:
//! - Sign-in with CSRF token and cookie session handling
//! - Available appointment date and time queries
//! - Appointment booking submission

mod http;
mod types;

pub use http::VisaHttpClient;
pub use types::*;

use async_trait::async_trait;
use chrono::NaiveDate;

/// The operations the scheduling site exposes. The bot is generic over this
/// seam; tests substitute a recording client.
#[async_trait]
pub trait SchedulingClient: Send + Sync {
    /// Establish an authenticated session and return the headers every
    /// subsequent call must carry.
    async fn login(&self) -> Result<SessionHeaders, ClientError>;

    /// All currently open dates for a facility. An empty list means no
    /// availability, not an error.
    async fn check_available_date(
        &self,
        session: &SessionHeaders,
        schedule_id: &str,
        facility_id: &str,
    ) -> Result<Vec<NaiveDate>, ClientError>;

    /// The bookable time slot for a date at a facility, if any.
    async fn check_available_time(
        &self,
        session: &SessionHeaders,
        schedule_id: &str,
        facility_id: &str,
        date: NaiveDate,
    ) -> Result<Option<String>, ClientError>;

    /// Commit a booking. The outcome is not inspected beyond error
    /// propagation.
    async fn book(
        &self,
        session: &SessionHeaders,
        request: &BookingRequest,
    ) -> Result<(), ClientError>;
}
