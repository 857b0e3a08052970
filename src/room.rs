use std::sync::RwLock;

use crate::geo::Coordinate;

/// A conferencing session and the media nodes already serving it.
#[derive(Debug)]
pub struct Room {
    pub id: String,
    pub session_id: String,
    media_nodes: RwLock<Vec<String>>,
}

impl Room {
    pub fn new(id: &str, session_id: &str) -> Self {
        Self {
            id: id.to_string(),
            session_id: session_id.to_string(),
            media_nodes: RwLock::new(Vec::new()),
        }
    }

    /// Ids of the media nodes currently serving this room, oldest first.
    pub fn media_node_ids(&self) -> Vec<String> {
        self.media_nodes
            .read()
            .map(|nodes| nodes.clone())
            .unwrap_or_default()
    }

    pub fn serves_on(&self, node_id: &str) -> bool {
        self.media_nodes
            .read()
            .map(|nodes| nodes.iter().any(|id| id == node_id))
            .unwrap_or(false)
    }

    /// Records that `node_id` now hosts a router for this room.
    pub fn add_media_node(&self, node_id: &str) {
        if let Ok(mut nodes) = self.media_nodes.write() {
            if !nodes.iter().any(|id| id == node_id) {
                nodes.push(node_id.to_string());
            }
        }
    }

    pub fn remove_media_node(&self, node_id: &str) {
        if let Ok(mut nodes) = self.media_nodes.write() {
            nodes.retain(|id| id != node_id);
        }
    }
}

#[derive(Debug, Clone)]
pub struct Peer {
    pub id: String,
    pub coordinate: Option<Coordinate>,
}

impl Peer {
    pub fn new(id: &str, coordinate: Option<Coordinate>) -> Self {
        Self {
            id: id.to_string(),
            coordinate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_node_association() {
        let room = Room::new("room1", "session1");
        assert!(room.media_node_ids().is_empty());

        room.add_media_node("n1");
        room.add_media_node("n2");
        room.add_media_node("n1");
        assert_eq!(room.media_node_ids(), vec!["n1", "n2"]);
        assert!(room.serves_on("n2"));

        room.remove_media_node("n1");
        assert_eq!(room.media_node_ids(), vec!["n2"]);
        assert!(!room.serves_on("n1"));
    }
}
