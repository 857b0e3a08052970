use std::sync::Arc;

use crate::error::MediaError;
use crate::loadbalancing::{CandidateRequest, LbStrategy};
use crate::media::MediaNode;

/// Orders nodes least-loaded first, dropping nodes at capacity.
/// Equal loads keep their input order.
#[derive(Debug, Clone, Default)]
pub struct LoadStrategy;

impl LbStrategy for LoadStrategy {
    fn get_candidates(
        &self,
        _request: &CandidateRequest<'_>,
        nodes: Vec<Arc<MediaNode>>,
    ) -> Result<Vec<Arc<MediaNode>>, MediaError> {
        // Loads move under us; read each one exactly once.
        let mut loaded: Vec<(i64, Arc<MediaNode>)> = nodes
            .into_iter()
            .filter(|n| !n.is_saturated())
            .map(|n| (n.current_load(), n))
            .collect();
        loaded.sort_by_key(|(load, _)| *load);

        Ok(loaded.into_iter().map(|(_, n)| n).collect())
    }
}
