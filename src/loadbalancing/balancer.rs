use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::MediaError;
use crate::loadbalancing::{
    CandidateRequest, LbStrategy, LbStrategyFactory, LoadStrategy, OptionalStrategy,
    StickyStrategy, StrategyKind,
};
use crate::media::MediaNode;

/// Sorts media nodes using the configured strategies.
#[derive(Debug, Clone)]
pub struct LoadBalancer {
    sticky: StickyStrategy,
    load: LoadStrategy,
    strategies: BTreeMap<StrategyKind, OptionalStrategy>,
}

impl LoadBalancer {
    pub fn new(factory: &LbStrategyFactory) -> Self {
        Self {
            sticky: factory.create_sticky_strategy(),
            load: factory.create_load_strategy(),
            strategies: factory.create_strategies(),
        }
    }

    pub fn has_strategy(&self, kind: StrategyKind) -> bool {
        self.strategies.contains_key(&kind)
    }

    /// Returns candidate node ids, best first.
    ///
    /// When every node is filtered out the whole set is returned, so the list
    /// is only empty for an empty registry or when a strategy fails.
    pub fn get_candidates(&self, request: &CandidateRequest<'_>) -> Vec<String> {
        tracing::debug!(
            "get_candidates() [room.id: {}, peer.id: {}]",
            request.room.id,
            request.peer.id
        );

        match self.run_pipeline(request) {
            Ok(nodes) if !nodes.is_empty() => ids(&nodes),
            Ok(_) => ids(request.nodes),
            Err(e) => {
                tracing::error!(
                    room_id = %request.room.id,
                    peer_id = %request.peer.id,
                    "error while getting candidates: {e}"
                );
                Vec::new()
            }
        }
    }

    fn run_pipeline(&self, request: &CandidateRequest<'_>) -> Result<Vec<Arc<MediaNode>>, MediaError> {
        let mut nodes = self.sticky.get_candidates(request, request.nodes.to_vec())?;

        if let Some(geo) = self.strategies.get(&StrategyKind::Geo) {
            nodes = geo.get_candidates(request, nodes)?;
        }

        self.load.get_candidates(request, nodes)
    }
}

fn ids(nodes: &[Arc<MediaNode>]) -> Vec<String> {
    nodes.iter().map(|n| n.id.clone()).collect()
}
