pub mod config;
pub mod error;
pub mod geo;
pub mod kdtree;
pub mod loadbalancing;
pub mod media;
pub mod media_service;
pub mod room;
pub mod routes;
pub mod state;
