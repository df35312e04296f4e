//! usvisa-info HTTP client
//!
//! Talks to the Rails-style scheduling site: sign-in form with CSRF token
//! and cookie session, JSON queries for open days/times, and the booking
//! form POST.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::cookie::Jar;
use reqwest::{Client, StatusCode, Url};
use tracing::{debug, info};

use super::types::*;
use super::SchedulingClient;
use crate::safe_truncate;

/// Scheduling site base URL
const USVISA_URL: &str = "https://ais.usvisa-info.com";

/// Browser-like user agent; the site rejects reqwest's default one
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Request timeout in seconds
const TIMEOUT_SECS: u64 = 60;

/// Scheduling client for ais.usvisa-info.com
pub struct VisaHttpClient {
    client: Client,
    cookie_jar: Arc<Jar>,
    site_url: Url,
    base_url: String,
    origin: String,
    email: String,
    password: String,
}

impl VisaHttpClient {
    /// Create a client for the given country site, e.g. "ca" for
    /// ais.usvisa-info.com/en-ca/niv
    pub fn new(country_code: &str, email: &str, password: &str) -> Result<Self, ClientError> {
        let base_url = format!("{}/en-{}/niv", USVISA_URL, country_code);
        Self::with_base_url(base_url, email, password)
    }

    /// Create a client against an explicit base URL (tests point this at a
    /// local mock server)
    pub fn with_base_url(
        base_url: String,
        email: &str,
        password: &str,
    ) -> Result<Self, ClientError> {
        let site_url =
            Url::parse(&base_url).map_err(|e| ClientError::InvalidBaseUrl(e.to_string()))?;
        let origin = site_url.origin().ascii_serialization();

        let cookie_jar = Arc::new(Jar::default());

        let client = Client::builder()
            .timeout(Duration::from_secs(TIMEOUT_SECS))
            .cookie_provider(cookie_jar.clone())
            .user_agent(USER_AGENT)
            // Expired sessions answer with a redirect to sign-in; keep the
            // 3xx visible instead of following it
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self {
            client,
            cookie_jar,
            site_url,
            base_url,
            origin,
            email: email.to_string(),
            password: password.to_string(),
        })
    }

    /// Extract CSRF token from an HTML page
    fn extract_csrf_token(html: &str) -> Option<String> {
        // Try meta tag first: <meta name="csrf-token" content="...">
        if let Some(start) = html.find("name=\"csrf-token\"") {
            if let Some(content_start) = html[start..].find("content=\"") {
                let token_start = start + content_start + 9;
                if let Some(token_end) = html[token_start..].find('"') {
                    return Some(html[token_start..token_start + token_end].to_string());
                }
            }
        }

        // Try hidden input: <input type="hidden" name="authenticity_token" value="...">
        if let Some(start) = html.find("name=\"authenticity_token\"") {
            if let Some(value_start) = html[start..].find("value=\"") {
                let token_start = start + value_start + 7;
                if let Some(token_end) = html[token_start..].find('"') {
                    return Some(html[token_start..token_start + token_end].to_string());
                }
            }
        }

        None
    }

    /// The Cookie header for the session accumulated in the jar
    fn session_cookie_header(&self) -> Result<String, ClientError> {
        use reqwest::cookie::CookieStore;

        self.cookie_jar
            .cookies(&self.site_url)
            .and_then(|value| value.to_str().ok().map(|s| s.to_string()))
            .ok_or_else(|| ClientError::InvalidResponse("sign-in set no session cookies".into()))
    }

    /// GET builder for the authenticated JSON endpoints
    fn authed_get(
        &self,
        url: &str,
        session: &SessionHeaders,
        schedule_id: &str,
    ) -> reqwest::RequestBuilder {
        self.client
            .get(url)
            .header("Accept", "application/json")
            .header("X-CSRF-Token", session.csrf_token())
            .header("X-Requested-With", "XMLHttpRequest")
            .header("Cookie", session.cookie())
            .header(
                "Referer",
                format!("{}/schedule/{}/appointment", self.base_url, schedule_id),
            )
    }

    /// Read the body of an authenticated response, mapping the signed-out
    /// answers (401, redirect back to sign-in) to SessionExpired
    async fn check_session(response: reqwest::Response) -> Result<String, ClientError> {
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status.is_redirection() {
            return Err(ClientError::SessionExpired);
        }
        let text = response.text().await?;
        if !status.is_success() {
            return Err(ClientError::InvalidResponse(format!(
                "status {}: {}",
                status,
                safe_truncate(&text, 200)
            )));
        }
        Ok(text)
    }
}

#[async_trait]
impl SchedulingClient for VisaHttpClient {
    async fn login(&self) -> Result<SessionHeaders, ClientError> {
        info!("Signing in: {}", self.email);

        let sign_in_url = format!("{}/users/sign_in", self.base_url);

        // Visit the sign-in page first to pick up session cookies and the CSRF token
        let page_html = self
            .client
            .get(&sign_in_url)
            .header(
                "Accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            )
            .header("Accept-Language", "en-US,en;q=0.9")
            .send()
            .await?
            .text()
            .await?;

        let csrf_token = Self::extract_csrf_token(&page_html)
            .ok_or_else(|| ClientError::MissingCsrfToken("sign-in page".into()))?;
        debug!("CSRF token found on sign-in page (len={})", csrf_token.len());

        let form_data = vec![
            ("user[email]", self.email.clone()),
            ("user[password]", self.password.clone()),
            ("policy_confirmed", "1".to_string()),
            ("commit", "Sign In".to_string()),
        ];

        let response = self
            .client
            .post(&sign_in_url)
            .header("Accept", "*/*;q=0.5, text/javascript, application/javascript")
            .header("X-CSRF-Token", csrf_token.as_str())
            .header("X-Requested-With", "XMLHttpRequest")
            .header("Origin", self.origin.as_str())
            .header("Referer", sign_in_url.as_str())
            .form(&form_data)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        debug!("Sign-in response ({}): {}", status, safe_truncate(&text, 500));

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ClientError::InvalidCredentials);
        }
        let text_lower = text.to_lowercase();
        if text_lower.contains("invalid email or password")
            || text_lower.contains("error_explanation")
        {
            return Err(ClientError::InvalidCredentials);
        }
        if !status.is_success() && !status.is_redirection() {
            return Err(ClientError::InvalidResponse(format!(
                "sign-in failed with status {}",
                status
            )));
        }

        // The signed-in page may carry a fresh token; keep the old one otherwise
        let csrf_token = Self::extract_csrf_token(&text).unwrap_or(csrf_token);

        let cookie = self.session_cookie_header()?;
        info!("Signed in: {}", self.email);
        Ok(SessionHeaders::new(cookie, csrf_token))
    }

    async fn check_available_date(
        &self,
        session: &SessionHeaders,
        schedule_id: &str,
        facility_id: &str,
    ) -> Result<Vec<NaiveDate>, ClientError> {
        let url = format!(
            "{}/schedule/{}/appointment/days/{}.json",
            self.base_url, schedule_id, facility_id
        );

        let response = self
            .authed_get(&url, session, schedule_id)
            .query(&[("appointments[expedite]", "false")])
            .send()
            .await?;

        let text = Self::check_session(response).await?;
        let days: Vec<AvailableDay> = serde_json::from_str(&text).map_err(|e| {
            ClientError::InvalidResponse(format!(
                "days payload: {} ({})",
                e,
                safe_truncate(&text, 200)
            ))
        })?;

        debug!("Facility {} has {} open days", facility_id, days.len());
        Ok(days.into_iter().map(|d| d.date).collect())
    }

    async fn check_available_time(
        &self,
        session: &SessionHeaders,
        schedule_id: &str,
        facility_id: &str,
        date: NaiveDate,
    ) -> Result<Option<String>, ClientError> {
        let url = format!(
            "{}/schedule/{}/appointment/times/{}.json",
            self.base_url, schedule_id, facility_id
        );

        let response = self
            .authed_get(&url, session, schedule_id)
            .query(&[
                ("date", date.format("%Y-%m-%d").to_string()),
                ("appointments[expedite]", "false".to_string()),
            ])
            .send()
            .await?;

        let text = Self::check_session(response).await?;
        let times: AvailableTimes = serde_json::from_str(&text).map_err(|e| {
            ClientError::InvalidResponse(format!(
                "times payload: {} ({})",
                e,
                safe_truncate(&text, 200)
            ))
        })?;

        Ok(times.best_slot())
    }

    async fn book(
        &self,
        session: &SessionHeaders,
        request: &BookingRequest,
    ) -> Result<(), ClientError> {
        let url = format!("{}/schedule/{}/appointment", self.base_url, request.schedule_id);

        let mut form_data = vec![
            ("utf8", "\u{2713}".to_string()),
            ("authenticity_token", session.csrf_token().to_string()),
            ("confirmed_limit_message", "1".to_string()),
            ("use_consulate_appointment_capacity", "true".to_string()),
            (
                "appointments[consulate_appointment][facility_id]",
                request.facility_id.clone(),
            ),
            (
                "appointments[consulate_appointment][date]",
                request.date.format("%Y-%m-%d").to_string(),
            ),
            (
                "appointments[consulate_appointment][time]",
                request.time.clone(),
            ),
        ];

        if let Some(asc) = &request.asc {
            form_data.push((
                "appointments[asc_appointment][facility_id]",
                asc.facility_id.clone(),
            ));
            form_data.push((
                "appointments[asc_appointment][date]",
                asc.date.format("%Y-%m-%d").to_string(),
            ));
            form_data.push(("appointments[asc_appointment][time]", asc.time.clone()));
        }

        let response = self
            .client
            .post(&url)
            .header(
                "Accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            )
            .header("Cookie", session.cookie())
            .header("Origin", self.origin.as_str())
            .header("Referer", url.as_str())
            .form(&form_data)
            .send()
            .await?;

        let status = response.status();
        // A successful booking answers with a redirect to the confirmation page
        if status.is_success() || status.is_redirection() {
            debug!("Booking submitted ({})", status);
            return Ok(());
        }

        let text = response.text().await?;
        Err(ClientError::BookingRejected(format!(
            "status {}: {}",
            status,
            safe_truncate(&text, 200)
        )))
    }
}
