use clipvault::fetcher::{FetchError, fetch_text, fetch_text_retrying};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

const BUNDLE: &str = "(function (root) { root.Defuddle = function () {}; })(this);";

#[tokio::test]
async fn test_fetch_text_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/dist/index.js"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(BUNDLE.as_bytes())
                .insert_header("Content-Type", "application/javascript; charset=utf-8"),
        )
        .mount(&mock_server)
        .await;

    let url = format!("{}/dist/index.js", mock_server.uri());
    let body = fetch_text(&url).await.unwrap();

    assert_eq!(body, BUNDLE);
}

#[tokio::test]
async fn test_fetch_text_404() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/notfound"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let url = format!("{}/notfound", mock_server.uri());
    let result = fetch_text(&url).await;

    match result {
        Err(FetchError::Http { status, retriable }) => {
            assert_eq!(status.as_u16(), 404);
            assert!(!retriable);
        }
        _ => panic!("Expected HTTP 404 error"),
    }
}

#[tokio::test]
async fn test_fetch_text_500_retryable() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/error"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let url = format!("{}/error", mock_server.uri());
    let result = fetch_text(&url).await;

    match result {
        Err(FetchError::Http { status, retriable }) => {
            assert_eq!(status.as_u16(), 500);
            assert!(retriable);
        }
        _ => panic!("Expected HTTP 500 error"),
    }
}

#[tokio::test]
async fn test_fetch_text_retrying_recovers_from_server_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/flaky.js"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/flaky.js"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(BUNDLE.as_bytes()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let url = format!("{}/flaky.js", mock_server.uri());
    let body = fetch_text_retrying(&url, 3).await.unwrap();

    assert_eq!(body, BUNDLE);
}

#[tokio::test]
async fn test_fetch_text_retrying_gives_up_on_client_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/gone.js"))
        .respond_with(ResponseTemplate::new(410))
        .expect(1)
        .mount(&mock_server)
        .await;

    let url = format!("{}/gone.js", mock_server.uri());
    let result = fetch_text_retrying(&url, 3).await;

    assert!(matches!(result, Err(FetchError::Http { retriable: false, .. })));
}

#[tokio::test]
async fn test_fetch_text_follows_redirect() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/latest/index.js"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/0.6.4/index.js"))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/0.6.4/index.js"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(BUNDLE.as_bytes()))
        .mount(&mock_server)
        .await;

    let url = format!("{}/latest/index.js", mock_server.uri());
    let body = fetch_text(&url).await.unwrap();

    assert_eq!(body, BUNDLE);
}

#[tokio::test]
async fn test_fetch_text_gzip_compression() {
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;

    // Gzip the content
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(BUNDLE.as_bytes()).unwrap();
    let compressed_data = encoder.finish().unwrap();

    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/gzipped.js"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(compressed_data)
                .insert_header("Content-Type", "application/javascript")
                .insert_header("Content-Encoding", "gzip"),
        )
        .mount(&mock_server)
        .await;

    let url = format!("{}/gzipped.js", mock_server.uri());
    let body = fetch_text(&url).await.unwrap();

    assert_eq!(body, BUNDLE);
}

#[tokio::test]
async fn test_fetch_text_body_too_large() {
    let mock_server = MockServer::start().await;

    // Create a large body (6MB > 5MB limit)
    let large_body = "x".repeat(6 * 1024 * 1024);

    Mock::given(method("GET"))
        .and(path("/large.js"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(large_body.as_bytes())
                .insert_header("Content-Type", "application/javascript"),
        )
        .mount(&mock_server)
        .await;

    let url = format!("{}/large.js", mock_server.uri());
    let result = fetch_text(&url).await;

    match result {
        Err(FetchError::BodyTooLarge(size)) => {
            assert_eq!(size, 6 * 1024 * 1024);
        }
        _ => panic!("Expected BodyTooLarge error"),
    }
}

#[tokio::test]
async fn test_fetch_text_rejects_invalid_utf8() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/binary"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0xFF, 0xD8, 0xFF]))
        .mount(&mock_server)
        .await;

    let url = format!("{}/binary", mock_server.uri());
    let result = fetch_text(&url).await;

    assert!(matches!(result, Err(FetchError::InvalidUtf8)));
}

#[tokio::test]
async fn test_fetch_text_invalid_url() {
    let result = fetch_text("not-a-valid-url").await;

    match result {
        Err(FetchError::InvalidUrl(_)) => {}
        _ => panic!("Expected InvalidUrl error"),
    }
}

#[tokio::test]
async fn test_error_retry_classification() {
    assert!(!FetchError::InvalidUrl(url::ParseError::EmptyHost).should_retry());
    assert!(!FetchError::BodyTooLarge(1000).should_retry());
    assert!(!FetchError::InvalidUtf8.should_retry());
    assert!(!FetchError::Client("tls backend".to_string()).should_retry());

    assert!(FetchError::Connect("refused".to_string()).should_retry());
    assert!(FetchError::ConnectTimeout.should_retry());
    assert!(FetchError::RequestTimeout.should_retry());

    // HTTP errors
    assert!(
        !FetchError::Http {
            status: reqwest::StatusCode::NOT_FOUND,
            retriable: false
        }
        .should_retry()
    );
    assert!(
        FetchError::Http {
            status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            retriable: true
        }
        .should_retry()
    );
}
