//! Pipeline integration tests
//!
//! Drive the full fetch -> parse -> extract -> resolve chain against local
//! mock servers.

use std::time::Duration;

use futures::future::join_all;
use pretty_assertions::assert_eq;
use site_meta::{
    FetchConfig, FetchErrorKind, Fetcher, ResolvedMetadata, SiteInspector, UserSettings,
};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const HTML: &str = "text/html; charset=utf-8";

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.as_bytes().to_vec(), HTML)
}

async fn serve(route: &str, response: ResponseTemplate) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(response)
        .mount(&server)
        .await;
    server
}

fn fetch_kind(err: site_meta::Error) -> FetchErrorKind {
    match err {
        site_meta::Error::Fetch(e) => e.kind,
        other => panic!("expected fetch error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_end_to_end_record() {
    let server = serve(
        "/p",
        html(
            r#"<html><head><title>Example</title>
            <meta property="og:description" content="desc">
            <link rel="canonical" href="/c"></head><body>hi</body></html>"#,
        ),
    )
    .await;

    let inspector = SiteInspector::new().unwrap();
    let report = inspector
        .inspect(&format!("{}/p", server.uri()), &UserSettings::default())
        .await
        .unwrap();

    let expected = ResolvedMetadata {
        title: Some("Example".to_string()),
        description: Some("desc".to_string()),
        canonical_url: Some(format!("{}/c", server.uri())),
        favicon_url: Some(format!("{}/favicon.ico", server.uri())),
        ..Default::default()
    };
    assert_eq!(report.metadata, expected);
    assert_eq!(report.fetch.status_code, 200);
    assert!(report.raw_document().contains("<body>hi</body>"));
}

#[tokio::test]
async fn test_relative_urls_resolve_against_final_url() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(301).insert_header("Location", "/landing/home".to_string()),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/landing/home"))
        .respond_with(html(
            r#"<head><meta property="og:image" content="img/og.png">
            <link rel="icon" href="fav.png"></head>"#,
        ))
        .mount(&server)
        .await;

    let report = SiteInspector::new()
        .unwrap()
        .inspect(&server.uri(), &UserSettings::default())
        .await
        .unwrap();

    assert_eq!(report.requested_url.path(), "/");
    assert_eq!(report.fetch.final_url.path(), "/landing/home");
    assert_eq!(
        report.metadata.image_url,
        Some(format!("{}/landing/img/og.png", server.uri()))
    );
    assert_eq!(
        report.metadata.favicon_url,
        Some(format!("{}/landing/fav.png", server.uri()))
    );
    assert_eq!(
        report.metadata.canonical_url,
        Some(format!("{}/landing/home", server.uri()))
    );
}

#[tokio::test]
async fn test_not_found_is_http_status_error() {
    let server = serve("/missing", ResponseTemplate::new(404)).await;

    let err = SiteInspector::new()
        .unwrap()
        .inspect(&format!("{}/missing", server.uri()), &UserSettings::default())
        .await
        .unwrap_err();

    assert_eq!(fetch_kind(err), FetchErrorKind::HttpStatus(404));
}

#[tokio::test]
async fn test_non_html_is_rejected() {
    let server = serve(
        "/logo.png",
        ResponseTemplate::new(200).set_body_raw(vec![0x89, 0x50, 0x4e, 0x47], "image/png"),
    )
    .await;

    let err = SiteInspector::new()
        .unwrap()
        .inspect(&format!("{}/logo.png", server.uri()), &UserSettings::default())
        .await
        .unwrap_err();

    assert_eq!(
        fetch_kind(err),
        FetchErrorKind::InvalidContentType("image/png".to_string())
    );
}

#[tokio::test]
async fn test_slow_server_times_out() {
    let server = serve(
        "/slow",
        html("<title>late</title>").set_delay(Duration::from_millis(2000)),
    )
    .await;

    let fetcher = Fetcher::with_config(FetchConfig::builder().timeout_ms(100).build()).unwrap();
    let err = SiteInspector::with_fetcher(fetcher)
        .inspect(&format!("{}/slow", server.uri()), &UserSettings::default())
        .await
        .unwrap_err();

    assert_eq!(fetch_kind(err), FetchErrorKind::Timeout);
}

#[tokio::test]
async fn test_refused_connection_is_network_error() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let err = SiteInspector::new()
        .unwrap()
        .inspect(&format!("http://127.0.0.1:{port}/"), &UserSettings::default())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "network");
}

#[tokio::test]
async fn test_request_profile_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .and(header("user-agent", "ProfileBot/1.0"))
        .and(header("cache-control", "no-store"))
        .and(header("pragma", "no-cache"))
        .and(header("expires", "0"))
        .respond_with(html("<title>ok</title>"))
        .expect(1)
        .mount(&server)
        .await;

    let report = SiteInspector::new()
        .unwrap()
        .inspect(
            &server.uri(),
            &UserSettings::with_user_agent("ProfileBot/1.0"),
        )
        .await
        .unwrap();

    assert_eq!(report.metadata.title.as_deref(), Some("ok"));
}

#[tokio::test]
async fn test_missing_content_type_is_accepted() {
    let server = serve(
        "/",
        ResponseTemplate::new(200).set_body_bytes(b"<title>bare</title>".to_vec()),
    )
    .await;

    let report = SiteInspector::new()
        .unwrap()
        .inspect(&server.uri(), &UserSettings::default())
        .await
        .unwrap();

    assert_eq!(report.metadata.title.as_deref(), Some("bare"));
}

#[tokio::test]
async fn test_oversized_document_is_truncated() {
    let mut body = String::from("<head><title>Big</title></head><body>");
    body.push_str(&"x".repeat(64 * 1024));
    let server = serve("/", html(&body)).await;

    let fetcher =
        Fetcher::with_config(FetchConfig::builder().max_document_bytes(1024).build()).unwrap();
    let report = SiteInspector::with_fetcher(fetcher)
        .inspect(&server.uri(), &UserSettings::default())
        .await
        .unwrap();

    assert_eq!(report.raw_document().len(), 1024);
    assert_eq!(report.metadata.title.as_deref(), Some("Big"));
}

#[tokio::test]
async fn test_concurrent_inspections_are_independent() {
    let server = MockServer::start().await;
    for i in 0..8 {
        Mock::given(method("GET"))
            .and(path(format!("/page/{i}")))
            .respond_with(html(&format!("<title>Page {i}</title>")))
            .mount(&server)
            .await;
    }

    let inspector = SiteInspector::new().unwrap();
    let settings = UserSettings::default();
    let runs = (0..8).map(|i| {
        let inspector = inspector.clone();
        let url = format!("{}/page/{i}", server.uri());
        let settings = settings.clone();
        async move { inspector.inspect(&url, &settings).await }
    });

    let reports = join_all(runs).await;
    for (i, report) in reports.into_iter().enumerate() {
        let report = report.unwrap();
        assert_eq!(report.metadata.title, Some(format!("Page {i}")));
    }
}

#[tokio::test]
async fn test_get_site_metadata_entry_point() {
    let server = serve("/", html(r#"<meta name="twitter:image" content="/t.png">"#)).await;

    let metadata = site_meta::get_site_metadata(&server.uri(), &UserSettings::default())
        .await
        .unwrap();

    assert_eq!(metadata.image_url, Some(format!("{}/t.png", server.uri())));
    assert_eq!(
        metadata.twitter_card.as_ref().map(|c| c.as_str()),
        Some("summary")
    );
}
