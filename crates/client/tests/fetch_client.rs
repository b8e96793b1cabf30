//! FetchClient against a local HTTP server.

use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use shellcache_client::{
    FetchClient, FetchConfig, FetchOutcome, KeyNormalizer, LogNotifier, RedirectPolicy, Request, RequestMode,
    ServiceWorker, Transport,
};
use shellcache_core::{AppConfig, CacheDb, CacheStorage, Error};
use url::Url;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> FetchClient {
    let origin = Url::parse(&server.uri()).unwrap();
    FetchClient::new(FetchConfig::new(origin)).unwrap()
}

#[tokio::test]
async fn test_fetch_forwards_method_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/method/frappe.desk.form.save.savedocs"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{\"ok\":true}"))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let request = Request::parse("POST", &format!("{}/api/method/frappe.desk.form.save.savedocs", server.uri()))
        .unwrap()
        .with_body("doc={}");

    let response = client.fetch(&request).await.unwrap();
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.text_lossy(), "{\"ok\":true}");
    assert!(!response.is_opaque());
}

#[tokio::test]
async fn test_http_error_is_a_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let response = client
        .fetch(&Request::parse("GET", &format!("{}/missing", server.uri())).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_redirect_policies() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/new"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/new"))
        .respond_with(ResponseTemplate::new(200).set_body_string("moved"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let old = format!("{}/old", server.uri());

    let followed = client.fetch(&Request::parse("GET", &old).unwrap()).await.unwrap();
    assert_eq!(followed.text_lossy(), "moved");
    assert_eq!(followed.url.unwrap().path(), "/new");

    let manual = client
        .fetch(&Request::parse("GET", &old).unwrap().with_redirect(RedirectPolicy::Manual))
        .await
        .unwrap();
    assert_eq!(manual.status, StatusCode::FOUND);

    let refused = client
        .fetch(&Request::parse("GET", &old).unwrap().with_redirect(RedirectPolicy::Error))
        .await;
    assert!(matches!(refused, Err(Error::RedirectRefused(_))));
}

#[tokio::test]
async fn test_body_limit() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/big"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![b'x'; 2048]))
        .mount(&server)
        .await;

    let origin = Url::parse(&server.uri()).unwrap();
    let client = FetchClient::new(FetchConfig { max_bytes: 1024, ..FetchConfig::new(origin) }).unwrap();
    let result = client.fetch(&Request::parse("GET", &format!("{}/big", server.uri())).unwrap()).await;
    assert!(matches!(result, Err(Error::FetchTooLarge(_))));
}

#[tokio::test]
async fn test_no_cors_cross_origin_is_opaque() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/pixel.gif"))
        .respond_with(ResponseTemplate::new(200).set_body_string("GIF89a"))
        .mount(&server)
        .await;

    let client = FetchClient::new(FetchConfig::new(Url::parse("https://erp.example.com").unwrap())).unwrap();
    let request = Request::parse("GET", &format!("{}/pixel.gif", server.uri()))
        .unwrap()
        .with_mode(RequestMode::NoCors);

    let response = client.fetch(&request).await.unwrap();
    assert!(response.is_opaque());
}

#[tokio::test]
async fn test_unreachable_origin_is_network_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let uri = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let client = FetchClient::new(FetchConfig::new(Url::parse(&uri).unwrap())).unwrap();
    let result = client.fetch(&Request::parse("GET", &format!("{uri}/")).unwrap()).await;
    assert!(matches!(result, Err(Error::Network(_))));
}

#[tokio::test]
async fn test_worker_serves_getdoc_from_cache_after_origin_goes_down() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/method/frappe.desk.form.load.getdoc"))
        .and(query_param("cached_timestamp", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{\"docs\":[{\"name\":\"TASK-0001\"}]}"))
        .mount(&server)
        .await;
    // the second call stalls past the client timeout, like a dead connection
    Mock::given(method("GET"))
        .and(path("/api/method/frappe.desk.form.load.getdoc"))
        .and(query_param("cached_timestamp", "2"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let uri = server.uri();
    let config = AppConfig { origin: uri.clone(), precache_urls: Vec::new(), timeout_ms: 300, ..Default::default() };
    let db = Arc::new(CacheDb::open_in_memory().await.unwrap());
    let transport = Arc::new(FetchClient::new(FetchConfig::from_app_config(&config).unwrap()).unwrap());
    let worker = ServiceWorker::new(&config, db.clone() as Arc<dyn CacheStorage>, transport, Arc::new(LogNotifier))
        .unwrap();

    let getdoc = |ts: u32| {
        format!("{uri}/api/method/frappe.desk.form.load.getdoc?doctype=Task&name=TASK-0001&cached_timestamp={ts}")
    };

    let live = worker.fetch(&Request::parse("GET", &getdoc(1)).unwrap()).await.settle().await;
    assert!(matches!(live, FetchOutcome::Network(_)));

    let key = KeyNormalizer::default().normalize_url(&getdoc(1)).into_owned();
    assert!(db.match_entry(worker.generation(), "GET", &key).await.unwrap().is_some());

    let offline = worker.fetch(&Request::parse("GET", &getdoc(2)).unwrap()).await;
    match offline.outcome {
        FetchOutcome::Cache(response) => assert!(response.text_lossy().contains("TASK-0001")),
        other => panic!("expected cached document, got {other:?}"),
    }
}
