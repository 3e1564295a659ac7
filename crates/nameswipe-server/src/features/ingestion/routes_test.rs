//! Router tests for the ingestion endpoints
//!
//! The orchestrator writes into an in-memory catalog and fetches datasets from
//! a mock server, so no database is needed.

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
        Router,
    };
    use nameswipe_ingest::{IngestConfig, IngestionOrchestrator, MemoryNameCatalog};
    use serde_json::Value;
    use tower::ServiceExt;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::features::ingestion::ingestion_routes;

    /// Orchestrator whose dataset requests hang for a while
    async fn slow_orchestrator() -> (MockServer, IngestionOrchestrator) {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("Alice,Doe,F,FR\n")
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let config = IngestConfig::default()
            .with_source_url_template(format!("{}/{{source}}.csv", server.uri()));
        let orchestrator =
            IngestionOrchestrator::new(config, Arc::new(MemoryNameCatalog::new())).unwrap();
        (server, orchestrator)
    }

    fn create_test_router(orchestrator: IngestionOrchestrator) -> Router {
        ingestion_routes().with_state(orchestrator)
    }

    async fn send(app: &Router, method: Method, uri: &str) -> (StatusCode, Value) {
        let response = app
            .clone()
            .oneshot(Request::builder().method(method).uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_start_then_duplicate_start() {
        let (_server, orchestrator) = slow_orchestrator().await;
        let app = create_test_router(orchestrator);

        let (status, body) = send(&app, Method::POST, "/fr").await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body["source"], "FR");
        assert_eq!(body["started"], true);

        let (status, body) = send(&app, Method::POST, "/FR").await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body["started"], false);
    }

    #[tokio::test]
    async fn test_start_unknown_source_is_bad_request() {
        let (_server, orchestrator) = slow_orchestrator().await;
        let app = create_test_router(orchestrator);

        let (status, body) = send(&app, Method::POST, "/XX").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["status"], 400);
        assert!(body["error"]["message"].as_str().unwrap().contains("XX"));
    }

    #[tokio::test]
    async fn test_status_reports_running_source() {
        let (_server, orchestrator) = slow_orchestrator().await;
        let app = create_test_router(orchestrator);

        send(&app, Method::POST, "/DE").await;
        let (status, body) = send(&app, Method::GET, "/status").await;
        assert_eq!(status, StatusCode::OK);

        let entries = body.as_array().unwrap();
        assert_eq!(entries.len(), 7);

        let de = entries.iter().find(|e| e["source"] == "DE").unwrap();
        assert_eq!(de["displayName"], "Germany");
        assert_eq!(de["loadedCount"], 0);
        assert_eq!(de["isActive"], true);
        assert_eq!(de["status"], "streaming");
        assert_eq!(de["progress"]["processedCount"], 0);
        assert!(de["error"].is_null());

        let us = entries.iter().find(|e| e["source"] == "US").unwrap();
        assert_eq!(us["isActive"], false);
        assert!(us["progress"].is_null());
    }

    #[tokio::test]
    async fn test_status_for_one_source() {
        let (_server, orchestrator) = slow_orchestrator().await;
        let app = create_test_router(orchestrator);

        let (status, body) = send(&app, Method::GET, "/status?source=gb").await;
        assert_eq!(status, StatusCode::OK);
        let entries = body.as_array().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0]["source"], "GB");

        let (status, _) = send(&app, Method::GET, "/status?source=ZZ").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_events_endpoint() {
        let (_server, orchestrator) = slow_orchestrator().await;
        let app = create_test_router(orchestrator);

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/events?source=it").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/event-stream");

        let (status, _) = send(&app, Method::GET, "/events?source=ZZ").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
