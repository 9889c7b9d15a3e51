use std::time::Duration;

use googol_client::pager::spawn_auxiliary_lookups;
use googol_client::{ClientError, GoogolClient, PageOutcome, SearchPager};
use shared::config::Transport;
use shared::request::SearchParam;
use shared::response::{BulkIndexOutcome, Story};
use wiremock::matchers::{body_string, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> GoogolClient {
    GoogolClient::new(&server.uri(), Duration::from_secs(5)).expect("Unable to create client")
}

async fn mount_text(server: &MockServer, route: &str, status: u16, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(status).set_body_string(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_feed_endpoint_from_config() {
    let server = MockServer::start().await;
    mount_text(&server, "/api/config/host", 200, "barrels.local").await;
    mount_text(&server, "/api/config/port", 200, "8443\n").await;
    mount_text(&server, "/api/config/websocket-endpoint", 200, "ws").await;

    let endpoint = client(&server)
        .feed_endpoint()
        .await
        .expect("Unable to fetch config");

    assert_eq!(endpoint.host, "barrels.local");
    assert_eq!(endpoint.port, 8443);
    assert_eq!(endpoint.transport, Transport::Secure);
    assert_eq!(endpoint.url(), "wss://barrels.local:8443/ws");
}

#[tokio::test]
async fn test_feed_endpoint_unavailable() {
    let server = MockServer::start().await;
    mount_text(&server, "/api/config/host", 200, "barrels.local").await;
    mount_text(&server, "/api/config/port", 500, "").await;
    mount_text(&server, "/api/config/websocket-endpoint", 200, "ws").await;

    let err = client(&server).feed_endpoint().await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::ConfigurationUnavailable {
            setting: "port",
            ..
        }
    ));
}

#[tokio::test]
async fn test_feed_endpoint_bad_port() {
    let server = MockServer::start().await;
    mount_text(&server, "/api/config/host", 200, "barrels.local").await;
    mount_text(&server, "/api/config/port", 200, "eighty").await;
    mount_text(&server, "/api/config/websocket-endpoint", 200, "ws").await;

    let err = client(&server).feed_endpoint().await.unwrap_err();
    assert!(matches!(err, ClientError::ConfigurationUnavailable { .. }));
}

#[tokio::test]
async fn test_search_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/search"))
        .and(query_param("query", "adaptive radix tree"))
        .and(query_param("page", "0"))
        .and(query_param("pageSize", "10"))
        .and(query_param("isFreshSearch", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"[["https://db.in.tum.de/art", "ART", "The adaptive radix tree"], ["https://en.wikipedia.org/wiki/Radix_tree", "Radix tree", "In computer science"], [3]]"#,
        ))
        .mount(&server)
        .await;

    let page = client(&server)
        .search(&SearchParam::fresh("adaptive radix tree", 10))
        .await
        .expect("Unable to search");

    assert_eq!(page.rows.len(), 2);
    assert_eq!(page.last_page_index, 3);
    assert_eq!(page.rows[0].url(), "https://db.in.tum.de/art");
}

#[tokio::test]
async fn test_search_no_results_vs_transport_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/search"))
        .and(query_param("query", "nothing"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/search"))
        .and(query_param("query", "broken"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let api = client(&server);
    let err = api
        .search(&SearchParam::fresh("nothing", 10))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::NoResults));

    let err = api
        .search(&SearchParam::fresh("broken", 10))
        .await
        .unwrap_err();
    assert!(err.is_transport());
    assert_eq!(err.user_message(), "An error has occurred");
}

#[tokio::test]
async fn test_pager_fetch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/search"))
        .and(query_param("page", "0"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(r#"[["https://a.example", "A", ""], [1]]"#),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/search"))
        .and(query_param("page", "1"))
        .and(query_param("isFreshSearch", "false"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(r#"[["https://b.example", "B", ""], [1]]"#),
        )
        .mount(&server)
        .await;

    let api = client(&server);
    let mut pager = SearchPager::new(10);

    let request = pager.submit("letters").expect("request");
    match pager.fetch(&api, &request).await {
        PageOutcome::Page { page, fresh } => {
            assert!(fresh);
            assert_eq!(page.rows[0].url(), "https://a.example");
        }
        other => panic!("unexpected outcome {other:?}"),
    }

    let request = pager.next_page().expect("request");
    match pager.fetch(&api, &request).await {
        PageOutcome::Page { page, fresh } => {
            assert!(!fresh);
            assert_eq!(page.rows[0].url(), "https://b.example");
        }
        other => panic!("unexpected outcome {other:?}"),
    }

    assert_eq!(pager.page(), 1);
    assert!(pager.next_page().is_none());
}

#[tokio::test]
async fn test_index_single_url() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/index"))
        .and(body_string("url=https%3A%2F%2Fgood.example"))
        .respond_with(ResponseTemplate::new(200).set_body_string("true"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/index"))
        .and(body_string("url=https%3A%2F%2Fbad.example"))
        .respond_with(ResponseTemplate::new(200).set_body_string("false"))
        .mount(&server)
        .await;

    let api = client(&server);
    let report = api
        .index(&["https://good.example".to_string(), "  ".to_string()])
        .await
        .expect("Unable to index");
    assert!(report.is_success());
    assert_eq!(report.message, "Indexation successful");

    let report = api
        .index(&["https://bad.example".to_string()])
        .await
        .expect("Unable to index");
    assert!(!report.is_success());
    assert_eq!(report.message, "Indexation failed");
}

#[tokio::test]
async fn test_index_multiple_urls() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/index/multiple"))
        .and(body_string(
            "urls=https%3A%2F%2Fa.example&urls=https%3A%2F%2Fb.example",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_string("[1]"))
        .mount(&server)
        .await;

    let report = client(&server)
        .index(&[
            "https://a.example".to_string(),
            "https://b.example".to_string(),
        ])
        .await
        .expect("Unable to index");

    assert_eq!(report.failed, vec!["https://b.example".to_string()]);
    assert_eq!(
        report.message,
        "Failed to index the following URLs: https://b.example"
    );
}

#[tokio::test]
async fn test_fathers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/fathers"))
        .and(query_param("url", "https://child.example"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"["https://parent-a.example", null, "https://parent-b.example"]"#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/fathers"))
        .and(query_param("url", "https://orphan.example"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let api = client(&server);
    let fathers = api
        .fathers("https://child.example")
        .await
        .expect("Unable to get fathers");
    assert_eq!(
        fathers,
        vec![
            "https://parent-a.example".to_string(),
            "https://parent-b.example".to_string()
        ]
    );

    let fathers = api
        .fathers("https://orphan.example")
        .await
        .expect("Unable to get fathers");
    assert!(fathers.is_empty());
}

#[tokio::test]
async fn test_auxiliary_lookups_are_independent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/analysis/google"))
        .and(query_param("query", "dropbox"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/hacker-news"))
        .and(query_param("query", "dropbox"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"[{"id": 8863, "title": "My YC app: Dropbox", "url": "http://www.getdropbox.com/u/2/screencast.html"}]"#,
        ))
        .mount(&server)
        .await;

    let api = client(&server);
    let lookups = spawn_auxiliary_lookups(&api, "dropbox");

    let analysis = lookups.analysis.await.expect("task panicked");
    assert!(analysis.is_err());

    let stories = lookups
        .stories
        .await
        .expect("task panicked")
        .expect("Unable to fetch stories");
    assert_eq!(stories.len(), 1);
    assert_eq!(stories[0].id, 8863);
}

#[tokio::test]
async fn test_index_stories() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/index/multiple"))
        .and(body_string("urls=https%3A%2F%2Fstory.example"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let stories = vec![
        Story {
            id: 1,
            title: "Ask HN: no link".into(),
            url: None,
        },
        Story {
            id: 2,
            title: "Show HN".into(),
            url: Some("https://story.example".into()),
        },
    ];

    let outcome = client(&server)
        .index_stories(&stories)
        .await
        .expect("Unable to index stories");
    assert_eq!(outcome, BulkIndexOutcome::AllIndexed);
}

#[tokio::test]
async fn test_base_url_path_prefix() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/googol/api/fathers"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"["https://parent.example"]"#))
        .mount(&server)
        .await;

    let api = GoogolClient::new(&format!("{}/googol", server.uri()), Duration::from_secs(5))
        .expect("Unable to create client");
    let fathers = api
        .fathers("https://child.example")
        .await
        .expect("Unable to get fathers");

    assert_eq!(fathers, vec!["https://parent.example".to_string()]);
}
