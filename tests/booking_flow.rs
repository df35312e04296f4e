//! End-to-end booking flow: the real HTTP client driven by the bot against
//! a mock scheduling site.

use chrono::NaiveDate;
use httpmock::prelude::*;
use httpmock::Mock;

use visa_slot_bot::bot::{Bot, BotOptions};
use visa_slot_bot::client::VisaHttpClient;
use visa_slot_bot::BotConfig;

const SIGN_IN_PAGE: &str = r#"<html><head>
    <meta name="csrf-token" content="integration-csrf" />
    </head><body>sign in</body></html>"#;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn config() -> BotConfig {
    BotConfig {
        country_code: "ca".into(),
        email: "user@example.com".into(),
        password: "hunter2".into(),
        schedule_id: "123".into(),
        facility_id: "94".into(),
        facility_id_asc: Some("95".into()),
        current_booked_date: date(2025, 2, 15),
        min_date: Some(date(2025, 1, 10)),
        ..BotConfig::default()
    }
}

/// Mock the whole site; returns the booking mock so tests can count hits
fn mock_site(server: &MockServer) -> Mock<'_> {
    server.mock(|when, then| {
        when.method(GET).path("/users/sign_in");
        then.status(200)
            .header("Set-Cookie", "_yatri_session=integration; Path=/; HttpOnly")
            .body(SIGN_IN_PAGE);
    });
    server.mock(|when, then| {
        when.method(POST)
            .path("/users/sign_in")
            .header("x-csrf-token", "integration-csrf");
        then.status(200).body("signed in");
    });

    // Consulate facility: one date beats the 2025-02-15 booking
    server.mock(|when, then| {
        when.method(GET).path("/schedule/123/appointment/days/94.json");
        then.status(200).json_body(serde_json::json!([
            {"date": "2025-03-01", "business_day": true},
            {"date": "2025-02-10", "business_day": true}
        ]));
    });
    server.mock(|when, then| {
        when.method(GET)
            .path("/schedule/123/appointment/times/94.json")
            .query_param("date", "2025-02-10");
        then.status(200)
            .json_body(serde_json::json!({"available_times": [], "business_times": ["10:15"]}));
    });

    // ASC facility
    server.mock(|when, then| {
        when.method(GET).path("/schedule/123/appointment/days/95.json");
        then.status(200)
            .json_body(serde_json::json!([{"date": "2025-03-03", "business_day": true}]));
    });
    server.mock(|when, then| {
        when.method(GET)
            .path("/schedule/123/appointment/times/95.json")
            .query_param("date", "2025-03-03");
        then.status(200)
            .json_body(serde_json::json!({"available_times": ["08:30"], "business_times": []}));
    });

    server.mock(|when, then| {
        when.method(POST)
            .path("/schedule/123/appointment")
            .body_contains("appointments%5Bconsulate_appointment%5D%5Bdate%5D=2025-02-10")
            .body_contains("appointments%5Basc_appointment%5D%5Bfacility_id%5D=95");
        then.status(302)
            .header("Location", "/en-ca/niv/schedule/123/appointment/instructions");
    })
}

#[tokio::test]
async fn full_flow_books_the_earliest_qualifying_date() {
    let server = MockServer::start();
    let book = mock_site(&server);

    let client =
        VisaHttpClient::with_base_url(server.base_url(), "user@example.com", "hunter2").unwrap();
    let bot = Bot::new(config(), client, BotOptions { dry_run: false });

    let session = bot.initialize().await.unwrap();
    let picked = bot
        .check_available_date(&session, date(2025, 2, 15), Some(date(2025, 1, 10)))
        .await
        .unwrap();
    assert_eq!(picked, Some(date(2025, 2, 10)));

    let booked = bot
        .book_appointment(&session, picked.unwrap())
        .await
        .unwrap();
    assert!(booked);
    book.assert();
}

#[tokio::test]
async fn dry_run_walks_the_flow_without_posting() {
    let server = MockServer::start();
    let book = mock_site(&server);

    let client =
        VisaHttpClient::with_base_url(server.base_url(), "user@example.com", "hunter2").unwrap();
    let bot = Bot::new(config(), client, BotOptions { dry_run: true });

    let session = bot.initialize().await.unwrap();
    let picked = bot
        .check_available_date(&session, date(2025, 2, 15), Some(date(2025, 1, 10)))
        .await
        .unwrap();
    let booked = bot
        .book_appointment(&session, picked.unwrap())
        .await
        .unwrap();

    assert!(booked);
    assert_eq!(book.hits(), 0);
}
