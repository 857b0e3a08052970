#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::Path;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{delete, post};
use axum::Json;
use futures_util::future::BoxFuture;
use mediarouter::loadbalancing::{LbStrategyFactory, LoadBalancer};
use mediarouter::media::{ConnectorError, MediaNode, MediaNodeConfig, Router, RouterConnector};
use mediarouter::media_service::{AcquisitionSettings, MediaService};
use mediarouter::routes;
use mediarouter::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Behavior {
    Succeed,
    Fail,
    Hang,
    /// Succeeds after the given delay.
    Delay(Duration),
}

/// In-process connector scripted per node hostname. Unscripted hosts succeed.
#[derive(Default)]
pub struct ScriptedConnector {
    behaviors: Mutex<HashMap<String, Behavior>>,
    attempts: Mutex<Vec<String>>,
    closed: Mutex<Vec<String>>,
}

impl ScriptedConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(&self, hostname: &str, behavior: Behavior) {
        self.behaviors
            .lock()
            .unwrap()
            .insert(hostname.to_string(), behavior);
    }

    pub fn attempts(&self) -> Vec<String> {
        self.attempts.lock().unwrap().clone()
    }

    pub fn closed_routers(&self) -> Vec<String> {
        self.closed.lock().unwrap().clone()
    }
}

impl RouterConnector for ScriptedConnector {
    fn create_router<'a>(
        &'a self,
        node: &'a MediaNode,
        session_id: &'a str,
        _app_data: &'a serde_json::Value,
    ) -> BoxFuture<'a, Result<Router, ConnectorError>> {
        Box::pin(async move {
            self.attempts.lock().unwrap().push(node.hostname.clone());
            let behavior = self
                .behaviors
                .lock()
                .unwrap()
                .get(&node.hostname)
                .copied()
                .unwrap_or(Behavior::Succeed);
            match behavior {
                Behavior::Succeed => {}
                Behavior::Fail => return Err(ConnectorError::Refused("scripted failure".into())),
                Behavior::Hang => std::future::pending::<()>().await,
                Behavior::Delay(delay) => tokio::time::sleep(delay).await,
            }
            Ok(Router::new(
                format!("router-{}-{}", node.hostname, session_id),
                session_id,
                &node.id,
                serde_json::Value::Null,
            ))
        })
    }

    fn close_router<'a>(
        &'a self,
        _node: &'a MediaNode,
        router_id: &'a str,
    ) -> BoxFuture<'a, Result<(), ConnectorError>> {
        Box::pin(async move {
            self.closed.lock().unwrap().push(router_id.to_string());
            Ok(())
        })
    }
}

pub fn node_config(hostname: &str, latitude: f64, longitude: f64) -> MediaNodeConfig {
    MediaNodeConfig {
        hostname: hostname.to_string(),
        port: 3000,
        secret: "secret".to_string(),
        latitude,
        longitude,
        turn_hostname: None,
        capacity: None,
    }
}

pub fn test_settings() -> AcquisitionSettings {
    AcquisitionSettings {
        router_timeout: Duration::from_millis(500),
        round_backoff: Duration::from_millis(5),
    }
}

pub fn media_service(
    nodes: &[MediaNodeConfig],
    strategies: &[&str],
    connector: Arc<dyn RouterConnector>,
) -> MediaService {
    let factory = LbStrategyFactory::new(strategies).expect("valid strategies");
    MediaService::create(LoadBalancer::new(&factory), Some(nodes), connector)
        .expect("valid media nodes")
        .with_settings(test_settings())
}

/// Control API over an in-process registry.
pub struct TestServer {
    pub state: AppState,
    pub connector: Arc<ScriptedConnector>,
}

impl TestServer {
    pub fn new(nodes: &[MediaNodeConfig], strategies: &[&str]) -> Self {
        let connector = Arc::new(ScriptedConnector::new());
        let media = media_service(nodes, strategies, connector.clone());
        Self {
            state: AppState::new(media),
            connector,
        }
    }

    /// Returns an Axum Router wired to this server's state for `oneshot()` calls.
    pub fn router(&self) -> axum::Router {
        routes::router(self.state.clone())
    }
}

/// A stand-in media node speaking the router HTTP API.
pub struct FakeMediaNode {
    pub port: u16,
    pub created: Arc<AtomicUsize>,
    pub deleted: Arc<AtomicUsize>,
}

/// Spawns a fake media node on an ephemeral port. `status` is returned for
/// router creation; any non-2xx status makes creation fail.
pub async fn spawn_fake_media_node(secret: &'static str, status: StatusCode) -> FakeMediaNode {
    let created = Arc::new(AtomicUsize::new(0));
    let deleted = Arc::new(AtomicUsize::new(0));

    let created_counter = created.clone();
    let deleted_counter = deleted.clone();
    let app = axum::Router::new()
        .route(
            "/routers",
            post(
                move |headers: HeaderMap, Json(body): Json<serde_json::Value>| {
                    let created = created_counter.clone();
                    async move {
                        let expected = format!("Bearer {secret}");
                        let authorized = headers
                            .get("Authorization")
                            .and_then(|v| v.to_str().ok())
                            == Some(expected.as_str());
                        if !authorized {
                            return (StatusCode::UNAUTHORIZED, Json(serde_json::json!({})));
                        }
                        if !status.is_success() {
                            return (status, Json(serde_json::json!({ "error": "busy" })));
                        }
                        let n = created.fetch_add(1, Ordering::SeqCst);
                        (
                            StatusCode::OK,
                            Json(serde_json::json!({
                                "id": format!("router-{n}"),
                                "rtpCapabilities": { "session": body["sessionId"] }
                            })),
                        )
                    }
                },
            ),
        )
        .route(
            "/routers/{router_id}",
            delete(move |Path(_router_id): Path<String>| {
                let deleted = deleted_counter.clone();
                async move {
                    deleted.fetch_add(1, Ordering::SeqCst);
                    StatusCode::NO_CONTENT
                }
            }),
        );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    FakeMediaNode {
        port,
        created,
        deleted,
    }
}
