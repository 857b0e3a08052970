use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use futures_util::future::join_all;
use rand::Rng;
use tokio::sync::Mutex;

use crate::error::MediaError;
use crate::geo::Coordinate;
use crate::kdtree::KdTree;
use crate::loadbalancing::{CandidateRequest, LoadBalancer};
use crate::media::{MediaNode, MediaNodeConfig, Router, RouterConnector};
use crate::room::{Peer, Room};

/// Bounds on a single `get_router` call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AcquisitionSettings {
    pub router_timeout: Duration,
    pub round_backoff: Duration,
}

impl Default for AcquisitionSettings {
    fn default() -> Self {
        Self {
            router_timeout: Duration::from_secs(5),
            round_backoff: Duration::from_millis(100),
        }
    }
}

/// Immutable view of the node set and its spatial index.
#[derive(Clone, Default)]
struct Registry {
    nodes: Vec<Arc<MediaNode>>,
    index: KdTree<Arc<MediaNode>>,
}

impl Registry {
    fn node(&self, id: &str) -> Option<&Arc<MediaNode>> {
        self.nodes.iter().find(|n| n.id == id)
    }

    fn insert(&mut self, node: Arc<MediaNode>) {
        self.index.insert(node.coordinate, Arc::clone(&node));
        self.nodes.push(node);
    }

    /// Copy of this registry without the nodes in `excluded`.
    fn without(&self, excluded: &HashSet<String>) -> Registry {
        let mut next = self.clone();
        if !excluded.is_empty() {
            next.nodes.retain(|n| !excluded.contains(&n.id));
            next.index.retain(|p| !excluded.contains(&p.payload.id));
        }
        next
    }
}

/// Owns the media nodes and hands out routers on them.
///
/// Readers load the current registry snapshot without locking; writers
/// serialize on `write_lock`, build a new snapshot and swap it in.
pub struct MediaService {
    closed: AtomicBool,
    registry: ArcSwap<Registry>,
    write_lock: Mutex<()>,
    load_balancer: LoadBalancer,
    connector: Arc<dyn RouterConnector>,
    settings: AcquisitionSettings,
}

impl MediaService {
    /// Builds the registry from configured nodes, rebalancing the index once
    /// after all inserts.
    pub fn create(
        load_balancer: LoadBalancer,
        media_nodes: Option<&[MediaNodeConfig]>,
        connector: Arc<dyn RouterConnector>,
    ) -> Result<Self, MediaError> {
        let media_nodes = media_nodes
            .ok_or_else(|| MediaError::Config("no media nodes configured".to_string()))?;
        tracing::debug!("create() [media nodes: {}]", media_nodes.len());

        let mut registry = Registry::default();
        for config in media_nodes {
            config.validate()?;
            let node = Arc::new(MediaNode::new(config.clone(), Arc::clone(&connector)));
            tracing::info!("media node {} at {}:{}", node.id, node.hostname, node.port);
            registry.insert(node);
        }
        registry.index.rebalance();

        Ok(Self {
            closed: AtomicBool::new(false),
            registry: ArcSwap::from_pointee(registry),
            write_lock: Mutex::new(()),
            load_balancer,
            connector,
            settings: AcquisitionSettings::default(),
        })
    }

    pub fn with_settings(mut self, settings: AcquisitionSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Current nodes in registry order.
    pub fn nodes(&self) -> Vec<Arc<MediaNode>> {
        self.registry.load().nodes.clone()
    }

    pub fn node(&self, id: &str) -> Option<Arc<MediaNode>> {
        self.registry.load().node(id).cloned()
    }

    pub fn nearest_nodes(&self, coordinate: &Coordinate, k: usize) -> Vec<Arc<MediaNode>> {
        self.registry
            .load()
            .index
            .nearest_neighbors(coordinate, k)
            .into_iter()
            .map(|p| Arc::clone(&p.payload))
            .collect()
    }

    pub async fn add_node(&self, config: MediaNodeConfig) -> Result<Arc<MediaNode>, MediaError> {
        if self.closed() {
            return Err(MediaError::Closed);
        }
        config.validate()?;
        tracing::debug!(
            "add_node() [hostname: {}, port: {}, latitude: {}, longitude: {}]",
            config.hostname,
            config.port,
            config.latitude,
            config.longitude
        );

        let _guard = self.write_lock.lock().await;
        if self.closed() {
            return Err(MediaError::Closed);
        }

        let node = Arc::new(MediaNode::new(config, Arc::clone(&self.connector)));
        let mut next = Registry::clone(&self.registry.load());
        next.insert(Arc::clone(&node));
        next.index.rebalance();
        self.registry.store(Arc::new(next));

        tracing::info!("added media node {} at {}:{}", node.id, node.hostname, node.port);
        Ok(node)
    }

    /// Removes a node from the registry and closes it.
    pub async fn remove_node(&self, id: &str) -> Result<Option<Arc<MediaNode>>, MediaError> {
        if self.closed() {
            return Err(MediaError::Closed);
        }

        let removed = {
            let _guard = self.write_lock.lock().await;
            if self.closed() {
                return Err(MediaError::Closed);
            }
            let current = self.registry.load_full();
            let Some(node) = current.node(id).cloned() else {
                return Ok(None);
            };
            let mut next = Registry::clone(&current);
            next.nodes.retain(|n| n.id != id);
            next.index.retain(|p| p.payload.id != id);
            self.registry.store(Arc::new(next));
            node
        };

        removed.close().await;
        tracing::info!("removed media node {}", removed.id);
        Ok(Some(removed))
    }

    /// Closes the registry and every node in it. Later calls are no-ops.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        tracing::debug!("close()");

        let registry = {
            let _guard = self.write_lock.lock().await;
            self.registry.load_full()
        };
        let nodes: Vec<Arc<MediaNode>> = registry
            .index
            .all_points()
            .map(|p| Arc::clone(&p.payload))
            .collect();
        join_all(nodes.iter().map(|n| n.close())).await;

        tracing::info!("media service closed ({} nodes)", nodes.len());
    }

    /// Candidate node ids for `room`/`peer`, best first.
    pub fn candidates(&self, room: &Room, peer: &Peer) -> Result<Vec<String>, MediaError> {
        if self.closed() {
            return Err(MediaError::Closed);
        }
        let registry = self.registry.load();
        Ok(self.load_balancer.get_candidates(&CandidateRequest {
            nodes: &registry.nodes,
            index: &registry.index,
            room,
            peer,
        }))
    }

    /// Acquires a router for the room on the best node that can provide one.
    ///
    /// Each round runs the balancer over the nodes not yet tried in this call
    /// and attempts its candidates in order, each bounded by `router_timeout`.
    /// A node that fails is dropped from later rounds, so strategies that
    /// narrowed to it fall back to the remaining nodes, and the room forgets
    /// its affinity to it. Fails with
    /// `NoMediaNodes` once every registered node has been tried.
    pub async fn get_router(
        &self,
        room: &Room,
        peer: &Peer,
    ) -> Result<(Router, Arc<MediaNode>), MediaError> {
        if self.closed() {
            return Err(MediaError::Closed);
        }
        tracing::debug!("get_router() [room.id: {}, peer.id: {}]", room.id, peer.id);

        let app_data = serde_json::json!({ "roomId": room.id });
        let mut failed: HashSet<String> = HashSet::new();
        let mut round = 0u32;

        loop {
            let untried = self.registry.load().without(&failed);
            if untried.nodes.is_empty() {
                break;
            }

            round += 1;
            if round > 1 {
                tokio::time::sleep(self.backoff()).await;
                if self.closed() {
                    return Err(MediaError::Closed);
                }
            }

            let candidates = self.load_balancer.get_candidates(&CandidateRequest {
                nodes: &untried.nodes,
                index: &untried.index,
                room,
                peer,
            });
            if candidates.is_empty() {
                break;
            }

            let mut progressed = false;
            for id in candidates {
                let Some(node) = untried.node(&id).cloned() else {
                    continue;
                };
                progressed = true;
                match self.attempt(&node, &room.session_id, &app_data).await {
                    Ok(router) => return Ok((router, node)),
                    Err(e) => {
                        tracing::warn!("get_router() [round {round}, error: {e}]");
                        room.remove_media_node(&id);
                        failed.insert(id);
                    }
                }
            }
            if !progressed {
                break;
            }
        }

        tracing::error!(
            "no media nodes available for room {} ({} failed)",
            room.id,
            failed.len()
        );
        Err(MediaError::NoMediaNodes)
    }

    /// One router request against `node`, bounded by `router_timeout`.
    ///
    /// The request runs in its own task. When it outlives the timeout, the
    /// task is left to finish and any router it creates is closed again.
    async fn attempt(
        &self,
        node: &Arc<MediaNode>,
        session_id: &str,
        app_data: &serde_json::Value,
    ) -> Result<Router, MediaError> {
        let mut task = tokio::spawn({
            let node = Arc::clone(node);
            let session_id = session_id.to_string();
            let app_data = app_data.clone();
            async move { node.get_router(&session_id, &app_data).await }
        });

        let outcome = tokio::time::timeout(self.settings.router_timeout, &mut task).await;
        match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(MediaError::NodeUnavailable {
                node_id: node.id.clone(),
                reason: e.to_string(),
            }),
            Err(_) => {
                let late_node = Arc::clone(node);
                let session_id = session_id.to_string();
                tokio::spawn(async move {
                    if let Ok(Ok(router)) = task.await {
                        tracing::info!(
                            "closing late router {} on media node {}",
                            router.id,
                            late_node.id
                        );
                        late_node.close_router(&session_id).await;
                    }
                });
                Err(MediaError::Timeout {
                    node_id: node.id.clone(),
                })
            }
        }
    }

    fn backoff(&self) -> Duration {
        let base = self.settings.round_backoff.as_millis() as u64;
        let jitter = if base > 0 {
            rand::thread_rng().gen_range(0..=base / 2)
        } else {
            0
        };
        Duration::from_millis(base + jitter)
    }
}
