use std::time::Duration;

use crate::loadbalancing::GeoSettings;
use crate::media::MediaNodeConfig;
use crate::media_service::AcquisitionSettings;

pub struct Config {
    pub port: u16,
    /// `None` when `MEDIA_NODES` is unset.
    pub media_nodes: Option<Vec<MediaNodeConfig>>,
    pub strategies: Vec<String>,
    pub geo: GeoSettings,
    pub acquisition: AcquisitionSettings,
}

impl Config {
    pub fn from_env() -> Self {
        let media_nodes = std::env::var("MEDIA_NODES").ok().map(|raw| {
            serde_json::from_str::<Vec<MediaNodeConfig>>(&raw)
                .unwrap_or_else(|e| panic!("MEDIA_NODES must be a JSON array of media nodes: {e}"))
        });

        let strategies = std::env::var("MEDIA_LB_STRATEGIES")
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        let geo_defaults = GeoSettings::default();
        let geo = GeoSettings {
            max_distance_km: env_parse("MEDIA_GEO_MAX_DISTANCE_KM")
                .unwrap_or(geo_defaults.max_distance_km),
            max_candidates: env_parse("MEDIA_GEO_MAX_CANDIDATES")
                .unwrap_or(geo_defaults.max_candidates),
        };

        let acquisition_defaults = AcquisitionSettings::default();
        let acquisition = AcquisitionSettings {
            router_timeout: env_parse("MEDIA_ROUTER_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(acquisition_defaults.router_timeout),
            round_backoff: env_parse("MEDIA_ROUND_BACKOFF_MS")
                .map(Duration::from_millis)
                .unwrap_or(acquisition_defaults.round_backoff),
        };

        Self {
            port: env_parse("PORT").unwrap_or(39199),
            media_nodes,
            strategies,
            geo,
            acquisition,
        }
    }
}

/// Reads and parses `key`. A set but unparsable value is reported and
/// treated as unset.
fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("ignoring {key}={raw:?}: not a valid value, using the default");
            None
        }
    }
}
