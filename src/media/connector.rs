use futures_util::future::BoxFuture;
use reqwest::Client;
use serde_json::json;
use std::fmt;

use crate::media::node::MediaNode;
use crate::media::router::Router;

#[derive(Debug)]
pub enum ConnectorError {
    Http(reqwest::Error),
    ServerError { status: u16, body: String },
    Refused(String),
}

impl fmt::Display for ConnectorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectorError::Http(e) => write!(f, "HTTP error: {e}"),
            ConnectorError::ServerError { status, body } => {
                write!(f, "media node returned {status}: {body}")
            }
            ConnectorError::Refused(reason) => write!(f, "refused: {reason}"),
        }
    }
}

impl From<reqwest::Error> for ConnectorError {
    fn from(e: reqwest::Error) -> Self {
        ConnectorError::Http(e)
    }
}

/// Transport used by a [`MediaNode`] to reach its remote process.
pub trait RouterConnector: Send + Sync {
    fn create_router<'a>(
        &'a self,
        node: &'a MediaNode,
        session_id: &'a str,
        app_data: &'a serde_json::Value,
    ) -> BoxFuture<'a, Result<Router, ConnectorError>>;

    fn close_router<'a>(
        &'a self,
        node: &'a MediaNode,
        router_id: &'a str,
    ) -> BoxFuture<'a, Result<(), ConnectorError>>;
}

/// Talks to a media node's HTTP control endpoint.
#[derive(Clone, Default)]
pub struct HttpConnector {
    client: Client,
}

impl HttpConnector {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    fn base_url(node: &MediaNode) -> String {
        format!("http://{}:{}", node.hostname, node.port)
    }
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateRouterResponse {
    id: String,
    #[serde(default)]
    rtp_capabilities: serde_json::Value,
}

impl RouterConnector for HttpConnector {
    fn create_router<'a>(
        &'a self,
        node: &'a MediaNode,
        session_id: &'a str,
        app_data: &'a serde_json::Value,
    ) -> BoxFuture<'a, Result<Router, ConnectorError>> {
        Box::pin(async move {
            let url = format!("{}/routers", Self::base_url(node));
            let resp = self
                .client
                .post(&url)
                .header("Authorization", format!("Bearer {}", node.secret()))
                .json(&json!({
                    "sessionId": session_id,
                    "appData": app_data,
                }))
                .send()
                .await?;

            if !resp.status().is_success() {
                let status = resp.status().as_u16();
                let body = resp.text().await.unwrap_or_default();
                return Err(ConnectorError::ServerError { status, body });
            }

            let created: CreateRouterResponse = resp.json().await?;
            Ok(Router::new(
                created.id,
                session_id,
                &node.id,
                created.rtp_capabilities,
            ))
        })
    }

    fn close_router<'a>(
        &'a self,
        node: &'a MediaNode,
        router_id: &'a str,
    ) -> BoxFuture<'a, Result<(), ConnectorError>> {
        Box::pin(async move {
            let url = format!("{}/routers/{}", Self::base_url(node), router_id);
            let resp = self
                .client
                .delete(&url)
                .header("Authorization", format!("Bearer {}", node.secret()))
                .send()
                .await?;

            if !resp.status().is_success() {
                let status = resp.status().as_u16();
                let body = resp.text().await.unwrap_or_default();
                return Err(ConnectorError::ServerError { status, body });
            }

            Ok(())
        })
    }
}

#[cfg(test)]
pub mod mock {
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    use super::*;

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
                    Behavior::Fail => {
                        return Err(ConnectorError::Refused("scripted failure".into()))
                    }
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
}
