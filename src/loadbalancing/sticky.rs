use std::sync::Arc;

use crate::error::MediaError;
use crate::loadbalancing::{CandidateRequest, LbStrategy};
use crate::media::MediaNode;

/// Prefers nodes already serving the room. Passes the input through when
/// the room has no usable affinity yet.
#[derive(Debug, Clone, Default)]
pub struct StickyStrategy;

impl LbStrategy for StickyStrategy {
    fn get_candidates(
        &self,
        request: &CandidateRequest<'_>,
        nodes: Vec<Arc<MediaNode>>,
    ) -> Result<Vec<Arc<MediaNode>>, MediaError> {
        let sticky: Vec<Arc<MediaNode>> = nodes
            .iter()
            .filter(|n| request.room.serves_on(&n.id))
            .cloned()
            .collect();

        if sticky.is_empty() {
            Ok(nodes)
        } else {
            Ok(sticky)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loadbalancing::test_util::{ids, index, node};
    use crate::room::{Peer, Room};

    #[test]
    fn test_passes_through_without_affinity() {
        let nodes = vec![node("a", 0.0, 0.0, 0), node("b", 1.0, 1.0, 0)];
        let tree = index(&nodes);
        let room = Room::new("r", "s");
        let peer = Peer::new("p", None);
        let request = CandidateRequest {
            nodes: &nodes,
            index: &tree,
            room: &room,
            peer: &peer,
        };

        let out = StickyStrategy.get_candidates(&request, nodes.clone()).unwrap();
        assert_eq!(ids(&out), vec!["a", "b"]);
    }

    #[test]
    fn test_narrows_to_room_nodes() {
        let nodes = vec![
            node("a", 0.0, 0.0, 0),
            node("b", 1.0, 1.0, 0),
            node("c", 2.0, 2.0, 0),
        ];
        let tree = index(&nodes);
        let room = Room::new("r", "s");
        room.add_media_node("c");
        room.add_media_node("b");
        let peer = Peer::new("p", None);
        let request = CandidateRequest {
            nodes: &nodes,
            index: &tree,
            room: &room,
            peer: &peer,
        };

        let out = StickyStrategy.get_candidates(&request, nodes.clone()).unwrap();
        assert_eq!(ids(&out), vec!["b", "c"]);
    }

    #[test]
    fn test_stale_affinity_passes_through() {
        let nodes = vec![node("a", 0.0, 0.0, 0)];
        let tree = index(&nodes);
        let room = Room::new("r", "s");
        room.add_media_node("gone");
        let peer = Peer::new("p", None);
        let request = CandidateRequest {
            nodes: &nodes,
            index: &tree,
            room: &room,
            peer: &peer,
        };

        let out = StickyStrategy.get_candidates(&request, nodes.clone()).unwrap();
        assert_eq!(ids(&out), vec!["a"]);
    }
}
