//! HTTP collaborators against mock servers

use concierge_engine::services::{
    HttpPriceCatalog, HttpSearchBackend, PriceCatalog, PriceDimension, SearchBackend,
};
use sdk::errors::EngineError;
use serde_json::json;
use std::time::Duration;
use wiremock::{
    matchers::{body_json, method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

const TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::test]
async fn test_search_posts_query_and_returns_passages() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rag"))
        .and(body_json(json!({ "query": "three tier web app" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "passages": ["Use an ALB in front of the app tier.", "Keep RDS in private subnets."]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let backend = HttpSearchBackend::new(format!("{}/rag", server.uri()), TIMEOUT);
    let passages = backend.search("three tier web app").await.unwrap();

    assert_eq!(passages.len(), 2);
    assert!(passages[1].contains("private subnets"));
}

#[tokio::test]
async fn test_search_tolerates_missing_passages() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let backend = HttpSearchBackend::new(server.uri(), TIMEOUT);
    assert!(backend.search("anything").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_search_unavailable_is_external_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let backend = HttpSearchBackend::new(server.uri(), TIMEOUT);
    match backend.search("anything").await {
        Err(EngineError::ExternalService { service, message }) => {
            assert_eq!(service, "search");
            assert!(message.contains("503"));
        }
        other => panic!("expected ExternalService, got {:?}", other),
    }
}

#[tokio::test]
async fn test_catalog_search_and_price() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/prices/services"))
        .and(query_param("query", "object storage"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "services": ["AmazonS3"] })),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/prices/price"))
        .and(query_param("service", "AmazonS3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "prices": [{ "description": "Standard storage", "price_usd": "0.023", "unit": "GB-Mo" }]
        })))
        .mount(&server)
        .await;

    // Trailing slash on the base is ignored
    let catalog = HttpPriceCatalog::new(format!("{}/prices/", server.uri()), TIMEOUT);

    assert_eq!(catalog.search("object storage").await.unwrap(), vec!["AmazonS3"]);
    assert_eq!(
        catalog.price("AmazonS3").await.unwrap(),
        vec![PriceDimension {
            description: "Standard storage".to_string(),
            price_usd: "0.023".to_string(),
            unit: "GB-Mo".to_string(),
        }]
    );
}

#[tokio::test]
async fn test_catalog_bad_body_is_external_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/price"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let catalog = HttpPriceCatalog::new(server.uri(), TIMEOUT);
    let err = catalog.price("AmazonS3").await.unwrap_err();
    assert!(matches!(err, EngineError::ExternalService { ref service, .. } if service == "pricing"));
}
