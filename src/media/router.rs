use chrono::{DateTime, Utc};
use serde::Serialize;

/// A per-session media routing resource hosted on one media node.
#[derive(Debug, Clone, Serialize)]
pub struct Router {
    pub id: String,
    pub session_id: String,
    pub node_id: String,
    pub rtp_capabilities: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl Router {
    pub fn new(
        id: String,
        session_id: &str,
        node_id: &str,
        rtp_capabilities: serde_json::Value,
    ) -> Self {
        Self {
            id,
            session_id: session_id.to_string(),
            node_id: node_id.to_string(),
            rtp_capabilities,
            created_at: Utc::now(),
        }
    }
}
