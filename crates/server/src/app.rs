//! Shared state and the axum router.

use std::sync::Arc;

use axum::Router;
use axum::routing::{any, get, post};
use precache_core::config::NotificationConfig;
use precache_core::notify::NotificationBridge;
use precache_core::{Error, Runtime, Version};
use url::Url;

use crate::notify::{RecentNotifications, TrackedWindows};
use crate::{control, handler};

#[derive(Clone)]
pub struct AppState {
    pub runtime: Arc<Runtime>,
    /// The configured version, deployed at startup and by `POST /_precache/install`.
    pub version: Arc<Version>,
    pub origin: Url,
    pub bridge: Arc<NotificationBridge>,
    pub notifications: Arc<RecentNotifications>,
    pub windows: Arc<TrackedWindows>,
}

impl AppState {
    pub fn new(runtime: Arc<Runtime>, version: Version, notification: NotificationConfig) -> Result<Self, Error> {
        let origin = version.origin.clone();
        let notifications = Arc::new(RecentNotifications::default());
        let windows = Arc::new(TrackedWindows::new());
        let bridge = NotificationBridge::new(notification, origin.clone(), notifications.clone(), windows.clone())?;

        Ok(Self {
            runtime,
            version: Arc::new(version),
            origin,
            bridge: Arc::new(bridge),
            notifications,
            windows,
        })
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/_precache/status", get(control::status))
        .route("/_precache/install", post(control::install))
        .route("/_precache/activate", post(control::activate))
        .route("/_precache/push", post(control::push))
        .route("/_precache/notifications", get(control::notifications))
        .route("/_precache/notifications/{id}/click", post(control::click))
        .route("/_precache/windows", post(control::register_window))
        .route("/_precache/{*rest}", any(control::not_found))
        .fallback(handler::proxy)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use axum::response::Response;
    use precache_core::request::{RequestDescriptor, ResponseSnapshot};
    use precache_core::{MemoryStore, Transport};
    use serde_json::Value;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tower::ServiceExt;

    const MANIFEST: &[&str] = &["/", "/index.html", "/js/app.js"];

    /// Origin double: fixed pages plus an offline switch.
    #[derive(Default)]
    struct StubOrigin {
        pages: Mutex<HashMap<String, ResponseSnapshot>>,
        offline: AtomicBool,
    }

    #[async_trait]
    impl Transport for StubOrigin {
        async fn send(&self, request: &RequestDescriptor) -> Result<ResponseSnapshot, Error> {
            if self.offline.load(Ordering::SeqCst) {
                return Err(Error::NetworkUnavailable(format!("connection refused: {}", request.url)));
            }
            let pages = self.pages.lock().unwrap();
            Ok(pages
                .get(request.url.as_str())
                .cloned()
                .unwrap_or_else(|| ResponseSnapshot::new(404, Vec::new(), "not found")))
        }
    }

    fn origin() -> Arc<StubOrigin> {
        let origin = StubOrigin::default();
        {
            let mut pages = origin.pages.lock().unwrap();
            for path in MANIFEST {
                let content_type = if path.ends_with(".js") { "text/javascript" } else { "text/html" };
                pages.insert(
                    format!("http://origin{path}"),
                    ResponseSnapshot::new(200, vec![("content-type".into(), content_type.into())], format!("page {path}")),
                );
            }
            pages.insert(
                "http://origin/api/cart".into(),
                ResponseSnapshot::new(200, vec![("content-type".into(), "application/json".into())], "[]"),
            );
        }
        Arc::new(origin)
    }

    fn app(transport: Arc<StubOrigin>) -> Router {
        let version = Version::new(Url::parse("http://origin").unwrap(), "static-v1", "dynamic-v1", MANIFEST).unwrap();
        let runtime = Arc::new(Runtime::new(Arc::new(MemoryStore::new()), transport));
        router(AppState::new(runtime, version, NotificationConfig::default()).unwrap())
    }

    async fn send(app: &Router, request: Request<Body>) -> Response {
        app.clone().oneshot(request).await.unwrap()
    }

    async fn json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post(uri: &str, body: impl Into<Body>) -> Request<Body> {
        Request::builder().method("POST").uri(uri).body(body.into()).unwrap()
    }

    #[tokio::test]
    async fn test_status_before_install() {
        let app = app(origin());
        let response = send(&app, get("/_precache/status")).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = json(response).await;
        assert!(body["active"].is_null());
        assert_eq!(body["generations"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_install_then_serve_offline() {
        let transport = origin();
        let app = app(transport.clone());

        let response = send(&app, post("/_precache/install", Body::empty())).await;
        assert_eq!(response.status(), StatusCode::OK);
        let report = json(response).await;
        assert_eq!(report["install"]["assets"], 3);
        assert_eq!(report["activation"]["static_tag"], "static-v1");

        transport.offline.store(true, Ordering::SeqCst);

        let script = send(&app, get("/js/app.js")).await;
        assert_eq!(script.status(), StatusCode::OK);
        assert_eq!(script.headers()["content-type"], "text/javascript");
        let bytes = to_bytes(script.into_body(), usize::MAX).await.unwrap();
        assert_eq!(bytes.as_ref(), b"page /js/app.js");

        let api = send(&app, get("/api/cart")).await;
        assert_eq!(api.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json(api).await["error"], "You are offline. Please connect to use the app.");

        let navigation = Request::builder()
            .uri("/lists/weekly")
            .header("accept", "text/html,application/xhtml+xml")
            .body(Body::empty())
            .unwrap();
        let page = send(&app, navigation).await;
        assert_eq!(page.status(), StatusCode::OK);
        let bytes = to_bytes(page.into_body(), usize::MAX).await.unwrap();
        assert_eq!(bytes.as_ref(), b"page /index.html");
    }

    #[tokio::test]
    async fn test_offline_post_is_bad_gateway() {
        let transport = origin();
        transport.offline.store(true, Ordering::SeqCst);
        let app = app(transport);

        let response = send(&app, post("/api/cart/add", r#"{"name":"milk"}"#)).await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(json(response).await["error"]["code"], "NETWORK_UNAVAILABLE");
    }

    #[tokio::test]
    async fn test_failed_install_reports_manifest_error() {
        let transport = origin();
        transport.offline.store(true, Ordering::SeqCst);
        let app = app(transport);

        let response = send(&app, post("/_precache/install", Body::empty())).await;
        assert_eq!(response.status(), StatusCode::FAILED_DEPENDENCY);
        assert_eq!(json(response).await["error"]["code"], "MANIFEST_FETCH_FAILED");
    }

    #[tokio::test]
    async fn test_activate_without_version() {
        let app = app(origin());
        let response = send(&app, post("/_precache/activate", Body::empty())).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_push_and_click_flow() {
        let app = app(origin());

        let pushed = json(send(&app, post("/_precache/push", "Eggs are back in stock")).await).await;
        assert_eq!(pushed["body"], "Eggs are back in stock");
        assert_eq!(pushed["title"], "Smart Grocery Cart");
        let id = pushed["id"].as_u64().unwrap();

        let empty = json(send(&app, post("/_precache/push", Body::empty())).await).await;
        assert_eq!(empty["body"], "New notification from Smart Grocery Cart");

        let listed = json(send(&app, get("/_precache/notifications")).await).await;
        assert_eq!(listed.as_array().unwrap().len(), 2);

        let action = json(send(&app, post(&format!("/_precache/notifications/{id}/click"), Body::empty())).await).await;
        assert_eq!(action, serde_json::json!({ "action": "open", "target": "http://origin/" }));

        let listed = json(send(&app, get("/_precache/notifications")).await).await;
        assert_eq!(listed[1]["closed"], true);
    }

    #[tokio::test]
    async fn test_click_focuses_registered_window() {
        let app = app(origin());

        let register = Request::builder()
            .method("POST")
            .uri("/_precache/windows")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"url":"/lists"}"#))
            .unwrap();
        let response = send(&app, register).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let window = json(response).await;

        let pushed = json(send(&app, post("/_precache/push", "hi")).await).await;
        let id = pushed["id"].as_u64().unwrap();
        let action = json(send(&app, post(&format!("/_precache/notifications/{id}/click"), Body::empty())).await).await;
        assert_eq!(action["action"], "focus");
        assert_eq!(action["target"], window["id"]);
    }

    #[tokio::test]
    async fn test_unknown_notification_and_route() {
        let app = app(origin());

        let click = send(&app, post("/_precache/notifications/99/click", Body::empty())).await;
        assert_eq!(click.status(), StatusCode::NOT_FOUND);

        let unknown = send(&app, get("/_precache/nope")).await;
        assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
    }
}
