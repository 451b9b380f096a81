use axum::{
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::AppState;

/// Build the application router with all routes
pub fn build(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(handlers::healthcheck))
        .route("/metrics", get(crate::metrics::metrics_handler))
        .route("/api/auth/login", post(crate::auth::login))
        // Onboarding routes
        .route("/api/onboarding/tasks", post(handlers::onboarding::create_task))
        .route("/api/onboarding/tasks", get(handlers::onboarding::list_tasks))
        .route("/api/onboarding/tasks/bulk", post(handlers::onboarding::bulk_import))
        .route("/api/onboarding/tasks/:id", get(handlers::onboarding::get_task))
        .route(
            "/api/onboarding/settings",
            get(handlers::settings::get_policy).put(handlers::settings::update_policy),
        )
        // Site routes
        .route("/api/sites", get(handlers::sites::list_sites))
        .route("/api/sites", post(handlers::sites::create_site))
        .route("/api/sites/:slug", get(handlers::sites::get_site))
        .route("/api/sites/:slug", delete(handlers::sites::delete_site))
        // Inventory catalog routes
        .route("/api/manufacturers", get(handlers::inventory::list_manufacturers))
        .route("/api/platforms", get(handlers::inventory::list_platforms))
        .route("/api/platforms", post(handlers::inventory::create_platform))
        .route("/api/device-types", get(handlers::inventory::list_device_types))
        .route("/api/device-roles", get(handlers::inventory::list_device_roles))
        .route("/api/device-roles", post(handlers::inventory::create_device_role))
        // Device routes
        .route("/api/devices", get(handlers::devices::list_devices))
        .route("/api/devices/:id", get(handlers::devices::get_device))
        .route("/api/devices/:id", delete(handlers::devices::delete_device))
        .route("/api/devices/:id/interfaces", get(handlers::devices::list_device_interfaces))
        .route("/api/devices/:id/onboarding", get(handlers::onboarding::get_device_onboarding))
        .route("/api/devices/:id/onboarding", put(handlers::onboarding::update_device_onboarding))
        // WebSocket route
        .route("/api/ws", get(crate::ws_upgrade_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::auth::Operator;
    use crate::config::{Config, InventoryBackend};
    use crate::db::Store;
    use crate::drivers::DriverRegistry;
    use crate::jobs::OnboardingService;
    use crate::metrics::Metrics;
    use crate::onboarding::{Reconciler, SshConnector};
    use crate::ws::Hub;

    async fn app() -> Router {
        let store = Store::with_pool_size(":memory:", 1).await.unwrap();
        let config = Config {
            db_path: ":memory:".into(),
            db_max_connections: 1,
            listen_addr: "127.0.0.1:0".into(),
            jwt_secret: "test-secret".into(),
            api_username: "admin".into(),
            api_password: "admin".into(),
            device_username: String::new(),
            device_password: String::new(),
            device_secret: String::new(),
            inventory_backend: InventoryBackend::Sqlite,
            netbox_url: String::new(),
            netbox_token: String::new(),
        };
        let drivers = Arc::new(DriverRegistry::with_defaults());
        let reconciler = Reconciler::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(SshConnector::new(drivers.clone())),
            config.default_credentials(),
        );
        let ws_hub = Arc::new(Hub::new());
        let metrics = Arc::new(Metrics::new());
        let onboarding =
            OnboardingService::new(store.clone(), reconciler, Some(ws_hub.clone()), metrics.clone()).await;
        let operator = Operator::for_tests(&config.api_username, &config.api_password);
        build(Arc::new(AppState {
            store,
            config,
            operator,
            drivers,
            ws_hub,
            onboarding,
            metrics,
        }))
    }

    fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn csv_request(uri: &str, token: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "text/csv")
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(resp: axum::response::Response) -> Value {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn login(app: &Router) -> String {
        let resp = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/auth/login",
                None,
                json!({"username": "admin", "password": "admin"}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        body_json(resp).await["token"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_health_is_public_and_api_requires_token() {
        let app = app().await;

        let resp = app
            .clone()
            .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = app
            .oneshot(Request::get("/api/devices").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_login_rejects_wrong_password() {
        let app = app().await;
        let resp = app
            .oneshot(json_request(
                "POST",
                "/api/auth/login",
                None,
                json!({"username": "admin", "password": "nope"}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_settings_readable_after_login() {
        let app = app().await;
        let token = login(&app).await;

        let resp = app
            .oneshot(json_request("GET", "/api/onboarding/settings", Some(&token), Value::Null))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["default_device_role"], "network");
    }

    #[tokio::test]
    async fn test_prefix_target_is_rejected_before_queueing() {
        let app = app().await;
        let token = login(&app).await;

        let resp = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/onboarding/tasks",
                Some(&token),
                json!({"target": "198.51.100.0/24", "site": "nyc01"}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = app
            .oneshot(json_request("GET", "/api/onboarding/tasks", Some(&token), Value::Null))
            .await
            .unwrap();
        assert_eq!(body_json(resp).await, json!([]));
    }

    #[tokio::test]
    async fn test_duplicate_site_is_conflict() {
        let app = app().await;
        let token = login(&app).await;
        let site = json!({"name": "NYC 01", "slug": "nyc01"});

        let resp = app
            .clone()
            .oneshot(json_request("POST", "/api/sites", Some(&token), site.clone()))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);

        let resp = app
            .clone()
            .oneshot(json_request("POST", "/api/sites", Some(&token), site))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CONFLICT);

        let resp = app
            .oneshot(json_request("GET", "/api/sites/nyc01", Some(&token), Value::Null))
            .await
            .unwrap();
        assert_eq!(body_json(resp).await["name"], "NYC 01");
    }

    #[tokio::test]
    async fn test_bulk_import_queues_every_row_for_the_operator() {
        let app = app().await;
        let token = login(&app).await;
        let csv = "site,ip_address,platform\nnyc01,192.0.2.60,ios\nlon01,192.0.2.61,\n";

        let resp = app
            .clone()
            .oneshot(csv_request("/api/onboarding/tasks/bulk", &token, csv))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::ACCEPTED);
        let tasks = body_json(resp).await;
        assert_eq!(tasks.as_array().unwrap().len(), 2);
        assert_eq!(tasks[0]["target"], "192.0.2.60");
        assert_eq!(tasks[0]["requested_by"], "admin");

        let resp = app
            .oneshot(json_request(
                "GET",
                "/api/onboarding/tasks?site=lon01&requested_by=admin",
                Some(&token),
                Value::Null,
            ))
            .await
            .unwrap();
        let listed = body_json(resp).await;
        assert_eq!(listed.as_array().unwrap().len(), 1);
        assert_eq!(listed[0]["target"], "192.0.2.61");
    }

    #[tokio::test]
    async fn test_bulk_import_with_a_bad_row_queues_nothing() {
        let app = app().await;
        let token = login(&app).await;
        let csv = "site,ip_address,port\nnyc01,192.0.2.70,22\nnyc01,192.0.2.0/24,22\nnyc01,192.0.2.72,ssh\n";

        let resp = app
            .clone()
            .oneshot(csv_request("/api/onboarding/tasks/bulk", &token, csv))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let error = body_json(resp).await["error"].as_str().unwrap().to_string();
        assert_eq!(error, "Row 3 port: Enter a whole number.");

        let csv = "site,ip_address\nnyc01,192.0.2.70\nnyc01,192.0.2.0/24\n";
        let resp = app
            .clone()
            .oneshot(csv_request("/api/onboarding/tasks/bulk", &token, csv))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let error = body_json(resp).await["error"].as_str().unwrap().to_string();
        assert!(error.starts_with("Row 2: "), "error: {}", error);

        let resp = app
            .oneshot(json_request("GET", "/api/onboarding/tasks", Some(&token), Value::Null))
            .await
            .unwrap();
        assert_eq!(body_json(resp).await, json!([]));
    }

    #[tokio::test]
    async fn test_device_onboarding_switch() {
        let app = app().await;
        let token = login(&app).await;

        let resp = app
            .clone()
            .oneshot(json_request("GET", "/api/devices/42/onboarding", Some(&token), Value::Null))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await, json!({"device_id": 42, "enabled": true}));

        let resp = app
            .clone()
            .oneshot(json_request(
                "PUT",
                "/api/devices/42/onboarding",
                Some(&token),
                json!({"enabled": false}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = app
            .oneshot(json_request("GET", "/api/devices/42/onboarding", Some(&token), Value::Null))
            .await
            .unwrap();
        assert_eq!(body_json(resp).await["enabled"], false);
    }

    #[tokio::test]
    async fn test_metrics_endpoint_is_prometheus_text() {
        let app = app().await;
        let resp = app
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers()[header::CONTENT_TYPE],
            "text/plain; version=0.0.4; charset=utf-8"
        );
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.contains("# TYPE onboarding_task_results counter"));
        assert!(text.contains("# TYPE onboarding_task_processing_seconds histogram"));
    }
}
