//! Catalog tests
//!
//! Channel directory and schedule listings through the fetch cache, against
//! a mock site.

use mockito::{Mock, Server, ServerGuard};
use livetv::api::SiteClient;
use livetv::catalog::Catalog;
use livetv::config::Config;
use livetv::models::TimeFormat;

const SCHEDULE_PATH: &str = "/schedule/schedule-generated.json";

const DIRECTORY: &str = r#"<html><body>
<center><h1>24/7 Channels</h1>
<div class="grid-item"><a href="/stream/stream-51.php" target="_blank" rel="noopener"><span><strong>ABC USA</strong></span></a></div>
<div class="grid-item"><a href="/stream/stream-35.php" target="_blank" rel="noopener"><span><strong>Sky Sports Football UK</strong></span></a></div>
<div class="grid-item"><a href="/stream/stream-501.php" target="_blank" rel="noopener"><span><strong>Vivid Red 18+</strong></span></a></div>
<div class="grid-item"><a href="/stream/stream-44.php" target="_blank" rel="noopener"><span><strong>ESPN USA</strong></span></a></div>
</center>
<div id="tab-2"></div>
</body></html>"#;

const SCHEDULE: &str = r#"{
    "Saturday 15th Mar 2025 - Schedule Time UK GMT": {
        "Basketball": [
            {"event": "NBA: Lakers vs Celtics", "time": "23:30",
             "channels": [{"channel_name": "NBA TV", "channel_id": "404"}]},
            {"event": "EuroLeague: Real Madrid vs Olympiacos", "time": "19:00",
             "channels": {"0": {"channel_name": "Sport TV1 Portugal", "channel_id": "49"}}}
        ],
        "Soccer": [
            {"event": "Arsenal vs Chelsea", "time": "17:30",
             "channels": [{"channel_name": "Sky Sports Main Event", "channel_id": "38"}]}
        ]
    },
    "Sunday 16th Mar 2025 - Schedule Time UK GMT": {
        "Soccer": [
            {"event": "Barcelona vs Sevilla", "time": "20:00",
             "channels": [{"channel_name": "DAZN LaLiga", "channel_id": "84"}]}
        ]
    }
}"#;

fn catalog(server: &ServerGuard, config: &Config) -> Catalog {
    Catalog::with_site(SiteClient::with_base_url(server.url(), SCHEDULE_PATH), config)
}

async fn mock_directory(server: &mut ServerGuard, hits: usize) -> Mock {
    let referer = format!("{}/", server.url());
    server
        .mock("POST", "/24-7-channels.php")
        .match_header("referer", referer.as_str())
        .with_status(200)
        .with_body(DIRECTORY)
        .expect(hits)
        .create_async()
        .await
}

async fn mock_schedule(server: &mut ServerGuard, hits: usize) -> Mock {
    server
        .mock("GET", SCHEDULE_PATH)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(SCHEDULE)
        .expect(hits)
        .create_async()
        .await
}

// =============================================================================
// Channels
// =============================================================================

#[tokio::test]
async fn test_adult_channels_hidden_without_opt_in() {
    let mut server = Server::new_async().await;
    let _mock = mock_directory(&mut server, 1).await;
    let catalog = catalog(&server, &Config::default());

    let channels = catalog.channels(false).await.unwrap();
    let names: Vec<_> = channels.iter().map(|c| c.display_name.as_str()).collect();
    assert_eq!(names, vec!["ABC USA", "Sky Sports Football UK", "ESPN USA"]);
}

#[tokio::test]
async fn test_adult_channels_shown_with_opt_in() {
    let mut server = Server::new_async().await;
    let _mock = mock_directory(&mut server, 1).await;
    let catalog = catalog(&server, &Config::default());

    let channels = catalog.channels(true).await.unwrap();
    assert_eq!(channels.len(), 4);
    assert!(channels.iter().any(|c| c.display_name == "Vivid Red 18+"));
}

#[tokio::test]
async fn test_directory_is_fetched_once_within_window() {
    let mut server = Server::new_async().await;
    let mock = mock_directory(&mut server, 1).await;
    let catalog = catalog(&server, &Config::default());

    let first = catalog.all_channels().await.unwrap();
    let filtered = catalog.channels(false).await.unwrap();
    let second = catalog.all_channels().await.unwrap();

    mock.assert_async().await;
    assert!(std::sync::Arc::ptr_eq(&first, &second));
    assert_eq!(filtered.len(), 3);
}

#[tokio::test]
async fn test_refresh_refetches_directory() {
    let mut server = Server::new_async().await;
    let mock = mock_directory(&mut server, 2).await;
    let catalog = catalog(&server, &Config::default());

    catalog.channels(false).await.unwrap();
    catalog.refresh().await;
    catalog.channels(false).await.unwrap();

    mock.assert_async().await;
}

#[tokio::test]
async fn test_country_channels_case_insensitive() {
    let mut server = Server::new_async().await;
    let _mock = mock_directory(&mut server, 1).await;
    let catalog = catalog(&server, &Config::default());

    let usa = catalog.country_channels("usa", false).await.unwrap();
    let names: Vec<_> = usa.iter().map(|c| c.display_name.as_str()).collect();
    assert_eq!(names, vec!["ABC USA", "ESPN USA"]);

    let uk = catalog.country_channels("UK", false).await.unwrap();
    assert_eq!(uk.len(), 1);
    assert_eq!(uk[0].stream_id(), Some("35"));
}

#[tokio::test]
async fn test_unreadable_directory_lists_nothing() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/24-7-channels.php")
        .with_status(200)
        .with_body("<html>Under maintenance</html>")
        .create_async()
        .await;
    let catalog = catalog(&server, &Config::default());

    assert!(catalog.channels(true).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_directory_server_error_is_surfaced() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/24-7-channels.php")
        .with_status(502)
        .create_async()
        .await;
    let catalog = catalog(&server, &Config::default());

    let err = catalog.channels(false).await.unwrap_err();
    assert!(!err.is_parse());
}

// =============================================================================
// Schedule
// =============================================================================

#[tokio::test]
async fn test_categories_in_document_order() {
    let mut server = Server::new_async().await;
    let mock = mock_schedule(&mut server, 1).await;
    let catalog = catalog(&server, &Config::default());

    let categories = catalog.categories().await.unwrap();
    assert_eq!(categories, vec!["Basketball", "Soccer"]);

    // Served from cache
    catalog.events("Soccer").await.unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn test_events_across_dates_with_local_time() {
    let mut server = Server::new_async().await;
    let _mock = mock_schedule(&mut server, 1).await;
    let config = Config {
        epg_timezone: 1,
        dst_enabled: true,
        time_format: TimeFormat::TwentyFourHour,
        ..Config::default()
    };
    let catalog = catalog(&server, &config);

    let events = catalog.events("soccer").await.unwrap();
    let titles: Vec<_> = events.iter().map(|e| e.title.as_str()).collect();
    assert_eq!(titles, vec!["19:30 Arsenal vs Chelsea", "22:00 Barcelona vs Sevilla"]);
    assert_eq!(events[0].channels[0].channel_id, "38");
}

#[tokio::test]
async fn test_nba_events() {
    let mut server = Server::new_async().await;
    let _mock = mock_schedule(&mut server, 1).await;
    let catalog = catalog(&server, &Config::default());

    let all = catalog.events("Basketball").await.unwrap();
    assert_eq!(all.len(), 2);

    let nba = catalog.nba_events("Basketball").await.unwrap();
    assert_eq!(nba.len(), 1);
    assert_eq!(nba[0].title, "11:30 PM NBA: Lakers vs Celtics");

    assert!(catalog.nba_events("Soccer").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_malformed_schedule_degrades_to_empty() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", SCHEDULE_PATH)
        .with_status(200)
        .with_body("<html>Cloudflare</html>")
        .create_async()
        .await;
    let catalog = catalog(&server, &Config::default());

    assert!(catalog.categories().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_preload_swallows_failures() {
    let mut server = Server::new_async().await;
    let schedule = mock_schedule(&mut server, 1).await;
    let _directory = server
        .mock("POST", "/24-7-channels.php")
        .with_status(500)
        .create_async()
        .await;
    let catalog = catalog(&server, &Config::default());

    catalog.preload().await;
    schedule.assert_async().await;

    // Schedule now cached: no further request
    assert_eq!(catalog.categories().await.unwrap().len(), 2);
}
