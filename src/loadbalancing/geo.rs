use std::collections::HashSet;
use std::sync::Arc;

use crate::error::MediaError;
use crate::loadbalancing::{CandidateRequest, LbStrategy};
use crate::media::MediaNode;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoSettings {
    /// Nodes farther than this from the peer are not considered near.
    pub max_distance_km: f64,
    /// How many nearest nodes to take from the index.
    pub max_candidates: usize,
}

impl Default for GeoSettings {
    fn default() -> Self {
        Self {
            max_distance_km: 2000.0,
            max_candidates: 5,
        }
    }
}

/// Ranks candidates by distance to the peer.
///
/// The near set is drawn from the whole registry. Input nodes that fall in
/// it are returned nearest first; if none do, the near set itself is
/// returned so that a far-away sticky node yields to a close one. With no
/// node near the peer at all, the input passes through unchanged.
#[derive(Debug, Clone, Default)]
pub struct GeoStrategy {
    settings: GeoSettings,
}

impl GeoStrategy {
    pub fn new(settings: GeoSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &GeoSettings {
        &self.settings
    }
}

impl LbStrategy for GeoStrategy {
    fn get_candidates(
        &self,
        request: &CandidateRequest<'_>,
        nodes: Vec<Arc<MediaNode>>,
    ) -> Result<Vec<Arc<MediaNode>>, MediaError> {
        let Some(origin) = request.peer.coordinate else {
            return Ok(nodes);
        };

        let known: HashSet<&str> = request.nodes.iter().map(|n| n.id.as_str()).collect();
        let mut near = Vec::new();
        for point in request
            .index
            .nearest_neighbors(&origin, self.settings.max_candidates)
        {
            let node = &point.payload;
            if !known.contains(node.id.as_str()) {
                return Err(MediaError::Strategy(format!(
                    "spatial index returned unknown media node {}",
                    node.id
                )));
            }
            if origin.distance_km(&point.coordinate) <= self.settings.max_distance_km {
                near.push(Arc::clone(node));
            }
        }

        let input: HashSet<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
        let ranked: Vec<Arc<MediaNode>> = near
            .iter()
            .filter(|n| input.contains(n.id.as_str()))
            .cloned()
            .collect();

        if near.is_empty() {
            Ok(nodes)
        } else if ranked.is_empty() {
            Ok(near)
        } else {
            Ok(ranked)
        }
    }
}
