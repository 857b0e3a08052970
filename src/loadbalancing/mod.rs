//! Candidate selection: Sticky, then optionally Geo, then Load.

pub mod balancer;
pub mod factory;
pub mod geo;
pub mod load;
pub mod sticky;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::MediaError;
use crate::kdtree::KdTree;
use crate::media::MediaNode;
use crate::room::{Peer, Room};

pub use balancer::LoadBalancer;
pub use factory::LbStrategyFactory;
pub use geo::{GeoSettings, GeoStrategy};
pub use load::LoadStrategy;
pub use sticky::StickyStrategy;

/// Everything a strategy may consult for one selection request.
pub struct CandidateRequest<'a> {
    /// The full node set in registry order.
    pub nodes: &'a [Arc<MediaNode>],
    pub index: &'a KdTree<Arc<MediaNode>>,
    pub room: &'a Room,
    pub peer: &'a Peer,
}

/// A step that narrows or reorders a node set.
pub trait LbStrategy: Send + Sync {
    fn get_candidates(
        &self,
        request: &CandidateRequest<'_>,
        nodes: Vec<Arc<MediaNode>>,
    ) -> Result<Vec<Arc<MediaNode>>, MediaError>;
}

/// Strategies that can be switched on by configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StrategyKind {
    Geo,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::Geo => "geo",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyKind {
    type Err = MediaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "geo" => Ok(StrategyKind::Geo),
            other => Err(MediaError::Config(format!(
                "unknown load balancing strategy '{other}'"
            ))),
        }
    }
}

/// A configured optional strategy.
#[derive(Debug, Clone)]
pub enum OptionalStrategy {
    Geo(GeoStrategy),
}

impl LbStrategy for OptionalStrategy {
    fn get_candidates(
        &self,
        request: &CandidateRequest<'_>,
        nodes: Vec<Arc<MediaNode>>,
    ) -> Result<Vec<Arc<MediaNode>>, MediaError> {
        match self {
            OptionalStrategy::Geo(geo) => geo.get_candidates(request, nodes),
        }
    }
}
