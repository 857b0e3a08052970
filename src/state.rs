use dashmap::DashMap;
use std::sync::Arc;

use crate::media_service::MediaService;
use crate::room::Room;

#[derive(Clone)]
pub struct AppState {
    pub media: Arc<MediaService>,
    pub rooms: Arc<DashMap<String, Arc<Room>>>,
}

impl AppState {
    pub fn new(media: MediaService) -> Self {
        Self {
            media: Arc::new(media),
            rooms: Arc::new(DashMap::new()),
        }
    }

    /// Returns the room, creating it with a fresh session id on first use.
    pub fn room(&self, room_id: &str) -> Arc<Room> {
        self.rooms
            .entry(room_id.to_string())
            .or_insert_with(|| {
                Arc::new(Room::new(room_id, &uuid::Uuid::new_v4().to_string()))
            })
            .clone()
    }

    /// Looks a room up without creating it.
    pub fn find_room(&self, room_id: &str) -> Option<Arc<Room>> {
        self.rooms.get(room_id).map(|entry| Arc::clone(entry.value()))
    }

    pub fn remove_room(&self, room_id: &str) -> Option<Arc<Room>> {
        self.rooms.remove(room_id).map(|(_, room)| room)
    }
}
