use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::error::MediaError;
use crate::geo::Coordinate;
use crate::media::connector::RouterConnector;
use crate::media::router::Router;

/// Descriptor of one media node, as found in configuration or an add request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaNodeConfig {
    pub hostname: String,
    pub port: u16,
    pub secret: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub turn_hostname: Option<String>,
    /// Router capacity; 0 or absent means unbounded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<i64>,
}

impl MediaNodeConfig {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }

    pub fn validate(&self) -> Result<(), MediaError> {
        if self.hostname.trim().is_empty() {
            return Err(MediaError::Config("media node hostname is empty".into()));
        }
        if !self.coordinate().is_valid() {
            return Err(MediaError::Config(format!(
                "media node {} has invalid coordinate ({}, {})",
                self.hostname, self.latitude, self.longitude
            )));
        }
        Ok(())
    }
}

/// Handle to one remote media node.
pub struct MediaNode {
    pub id: String,
    pub hostname: String,
    pub port: u16,
    secret: String,
    pub turn_hostname: Option<String>,
    pub coordinate: Coordinate,
    capacity: i64,
    current_load: AtomicI64,
    closed: AtomicBool,
    routers: DashMap<String, Router>,
    connector: Arc<dyn RouterConnector>,
}

impl fmt::Debug for MediaNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaNode")
            .field("id", &self.id)
            .field("hostname", &self.hostname)
            .field("port", &self.port)
            .field("coordinate", &self.coordinate)
            .field("current_load", &self.current_load())
            .field("closed", &self.closed())
            .finish()
    }
}

impl MediaNode {
    pub fn new(config: MediaNodeConfig, connector: Arc<dyn RouterConnector>) -> Self {
        Self::with_id(uuid::Uuid::new_v4().to_string(), config, connector)
    }

    pub fn with_id(
        id: String,
        config: MediaNodeConfig,
        connector: Arc<dyn RouterConnector>,
    ) -> Self {
        let coordinate = config.coordinate();
        Self {
            id,
            hostname: config.hostname,
            port: config.port,
            secret: config.secret,
            turn_hostname: config.turn_hostname,
            coordinate,
            capacity: config.capacity.unwrap_or(0),
            current_load: AtomicI64::new(0),
            closed: AtomicBool::new(false),
            routers: DashMap::new(),
            connector,
        }
    }

    pub(crate) fn secret(&self) -> &str {
        &self.secret
    }

    pub fn current_load(&self) -> i64 {
        self.current_load.load(Ordering::Relaxed)
    }

    pub fn set_load(&self, load: i64) {
        self.current_load.store(load, Ordering::Relaxed);
    }

    pub fn capacity(&self) -> i64 {
        self.capacity
    }

    /// True when the node has a capacity and its load has reached it.
    pub fn is_saturated(&self) -> bool {
        self.capacity > 0 && self.current_load() >= self.capacity
    }

    pub fn closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn router_count(&self) -> usize {
        self.routers.len()
    }

    /// Returns the router serving `session_id` on this node, creating it
    /// remotely on first use.
    pub async fn get_router(
        &self,
        session_id: &str,
        app_data: &serde_json::Value,
    ) -> Result<Router, MediaError> {
        if self.closed() {
            return Err(MediaError::Closed);
        }
        if let Some(existing) = self.routers.get(session_id) {
            return Ok(existing.clone());
        }

        tracing::debug!(node_id = %self.id, session_id, "requesting router");
        let router = self
            .connector
            .create_router(self, session_id, app_data)
            .await
            .map_err(|e| MediaError::NodeUnavailable {
                node_id: self.id.clone(),
                reason: e.to_string(),
            })?;

        if self.closed() {
            self.discard(&router).await;
            return Err(MediaError::Closed);
        }

        let raced = match self.routers.entry(session_id.to_string()) {
            Entry::Occupied(entry) => Some(entry.get().clone()),
            Entry::Vacant(entry) => {
                entry.insert(router.clone());
                None
            }
        };

        match raced {
            Some(existing) => {
                self.discard(&router).await;
                Ok(existing)
            }
            None => Ok(router),
        }
    }

    /// Forgets and remotely closes the router for `session_id`, if any.
    pub async fn close_router(&self, session_id: &str) -> Option<Router> {
        let (_, router) = self.routers.remove(session_id)?;
        self.discard(&router).await;
        Some(router)
    }

    async fn discard(&self, router: &Router) {
        if let Err(e) = self.connector.close_router(self, &router.id).await {
            tracing::warn!("failed to close router {} on node {}: {e}", router.id, self.id);
        }
    }

    /// Closes the node and every router it hosts. Later calls are no-ops.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        tracing::debug!(node_id = %self.id, "closing media node");

        let sessions: Vec<String> = self.routers.iter().map(|e| e.key().clone()).collect();
        for session_id in sessions {
            if let Some((_, router)) = self.routers.remove(&session_id) {
                self.discard(&router).await;
            }
        }
    }
}

#[cfg(test)]
pub(crate) fn test_config(hostname: &str, latitude: f64, longitude: f64) -> MediaNodeConfig {
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
