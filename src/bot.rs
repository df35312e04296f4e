//! Core bot logic: decide which date is worth booking and coordinate the
//! two-legged consulate + ASC booking.
//!
//! The polling loop lives in `main.rs`; this module performs one check or
//! one booking attempt per call, strictly sequentially.

use chrono::NaiveDate;
use tracing::info;

use crate::client::{AscAppointment, BookingRequest, ClientError, SchedulingClient, SessionHeaders};
use crate::BotConfig;

/// Bot construction options
#[derive(Debug, Clone, Default)]
pub struct BotOptions {
    /// When true, booking is logged instead of committed
    pub dry_run: bool,
}

/// Appointment bot over a scheduling client
pub struct Bot<C> {
    config: BotConfig,
    client: C,
    dry_run: bool,
}

impl<C: SchedulingClient> Bot<C> {
    pub fn new(config: BotConfig, client: C, options: BotOptions) -> Self {
        Self {
            config,
            client,
            dry_run: options.dry_run,
        }
    }

    /// Establish an authenticated session with the scheduling site
    pub async fn initialize(&self) -> Result<SessionHeaders, ClientError> {
        info!("Initializing visa bot...");
        self.client.login().await
    }

    /// Find the earliest open consulate date that beats the current booking.
    ///
    /// A date qualifies when it is strictly earlier than
    /// `current_booked_date` and, when `min_date` is set, not before it.
    /// `Ok(None)` means nothing qualifies right now, not an error.
    pub async fn check_available_date(
        &self,
        session: &SessionHeaders,
        current_booked_date: NaiveDate,
        min_date: Option<NaiveDate>,
    ) -> Result<Option<NaiveDate>, ClientError> {
        let dates = self
            .client
            .check_available_date(session, &self.config.schedule_id, &self.config.facility_id)
            .await?;

        if dates.is_empty() {
            info!("no dates available");
            return Ok(None);
        }

        let mut good_dates: Vec<NaiveDate> = dates
            .into_iter()
            .filter(|&date| {
                if date >= current_booked_date {
                    info!(
                        "date {} is further than already booked ({})",
                        date, current_booked_date
                    );
                    return false;
                }
                if let Some(min) = min_date {
                    if date < min {
                        info!("date {} is before minimum date ({})", date, min);
                        return false;
                    }
                }
                true
            })
            .collect();

        if good_dates.is_empty() {
            info!("no good dates found after filtering");
            return Ok(None);
        }

        good_dates.sort();
        let earliest = good_dates[0];

        info!(
            "found {} good dates: {}, using earliest: {}",
            good_dates.len(),
            good_dates
                .iter()
                .map(|d| d.to_string())
                .collect::<Vec<_>>()
                .join(", "),
            earliest
        );
        Ok(Some(earliest))
    }

    /// Book the consulate appointment for `date`, together with an ASC
    /// appointment when an ASC facility is configured.
    ///
    /// All-or-nothing from the caller's viewpoint: if any slot is missing
    /// along the way the attempt reports `Ok(false)` and the booking
    /// endpoint is never called. A consulate booking without the required
    /// biometrics leg is not a valid outcome.
    pub async fn book_appointment(
        &self,
        session: &SessionHeaders,
        date: NaiveDate,
    ) -> Result<bool, ClientError> {
        let time = self
            .client
            .check_available_time(session, &self.config.schedule_id, &self.config.facility_id, date)
            .await?;

        let Some(time) = time else {
            info!("no available time slots for date {}", date);
            return Ok(false);
        };

        let mut asc: Option<AscAppointment> = None;
        if let Some(facility_id_asc) = &self.config.facility_id_asc {
            info!("Checking ASC appointment availability...");
            let asc_dates = self
                .client
                .check_available_date(session, &self.config.schedule_id, facility_id_asc)
                .await?;

            // The first returned ASC date, taken as-is; ASC slots are not
            // measured against the consulate bounds
            let Some(&asc_date) = asc_dates.first() else {
                info!("No ASC dates available");
                return Ok(false);
            };

            let asc_time = self
                .client
                .check_available_time(session, &self.config.schedule_id, facility_id_asc, asc_date)
                .await?;

            let Some(asc_time) = asc_time else {
                info!("No available ASC time slots for date {}", asc_date);
                return Ok(false);
            };

            info!("Found ASC appointment slot: {} {}", asc_date, asc_time);
            asc = Some(AscAppointment {
                facility_id: facility_id_asc.clone(),
                date: asc_date,
                time: asc_time,
            });
        }

        if self.dry_run {
            info!("[DRY RUN] Would book consulate appointment at {} {}", date, time);
            if let Some(asc) = &asc {
                info!("[DRY RUN] Would book ASC appointment at {} {}", asc.date, asc.time);
            }
            return Ok(true);
        }

        let request = BookingRequest {
            schedule_id: self.config.schedule_id.clone(),
            facility_id: self.config.facility_id.clone(),
            date,
            time: time.clone(),
            asc,
        };
        self.client.book(session, &request).await?;

        info!("Booked consulate appointment at {} {}", date, time);
        if let Some(asc) = &request.asc {
            info!("Booked ASC appointment at {} {}", asc.date, asc.time);
        }
        Ok(true)
    }
}
