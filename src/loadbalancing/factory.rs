use std::collections::BTreeMap;

use crate::error::MediaError;
use crate::loadbalancing::{
    GeoSettings, GeoStrategy, LoadStrategy, OptionalStrategy, StickyStrategy, StrategyKind,
};

/// Builds load balancing strategies from configured names.
///
/// Names are validated in [`LbStrategyFactory::new`], so a typo fails
/// startup instead of the first request.
#[derive(Debug, Clone)]
pub struct LbStrategyFactory {
    kinds: Vec<StrategyKind>,
    geo: GeoSettings,
}

impl LbStrategyFactory {
    pub fn new<S: AsRef<str>>(names: &[S]) -> Result<Self, MediaError> {
        let mut kinds = Vec::new();
        for name in names {
            let kind: StrategyKind = name.as_ref().parse()?;
            if !kinds.contains(&kind) {
                kinds.push(kind);
            }
        }
        tracing::debug!("strategy factory created with {:?}", kinds);

        Ok(Self {
            kinds,
            geo: GeoSettings::default(),
        })
    }

    pub fn with_geo_settings(mut self, geo: GeoSettings) -> Self {
        self.geo = geo;
        self
    }

    pub fn create_sticky_strategy(&self) -> StickyStrategy {
        StickyStrategy
    }

    pub fn create_load_strategy(&self) -> LoadStrategy {
        LoadStrategy
    }

    pub fn create_strategies(&self) -> BTreeMap<StrategyKind, OptionalStrategy> {
        self.kinds
            .iter()
            .map(|kind| {
                let strategy = match kind {
                    StrategyKind::Geo => OptionalStrategy::Geo(GeoStrategy::new(self.geo)),
                };
                (*kind, strategy)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_creates_sticky_and_load_strategies() {
        let factory = LbStrategyFactory::new::<&str>(&[]).unwrap();
        let _sticky: StickyStrategy = factory.create_sticky_strategy();
        let _load: LoadStrategy = factory.create_load_strategy();
    }

    #[test]
    fn test_empty_config_creates_nothing() {
        let factory = LbStrategyFactory::new::<&str>(&[]).unwrap();
        assert_eq!(factory.create_strategies().len(), 0);
    }

    #[test]
    fn test_creates_geo_strategy() {
        let factory = LbStrategyFactory::new(&["geo"]).unwrap();
        let strategies = factory.create_strategies();

        assert_eq!(strategies.len(), 1);
        assert!(matches!(
            strategies.get(&StrategyKind::Geo),
            Some(OptionalStrategy::Geo(_))
        ));
    }

    #[test]
    fn test_duplicate_names_collapse() {
        let factory = LbStrategyFactory::new(&["geo", "GEO"]).unwrap();
        assert_eq!(factory.create_strategies().len(), 1);
    }

    #[test]
    fn test_unknown_strategy_fails_construction() {
        let result = LbStrategyFactory::new(&["geo", "non_existing"]);
        assert!(matches!(result, Err(MediaError::Config(_))));
    }

    #[test]
    fn test_geo_settings_are_passed_through() {
        let settings = GeoSettings {
            max_distance_km: 150.0,
            max_candidates: 2,
        };
        let factory = LbStrategyFactory::new(&["geo"])
            .unwrap()
            .with_geo_settings(settings);
        match factory.create_strategies().remove(&StrategyKind::Geo) {
            Some(OptionalStrategy::Geo(geo)) => assert_eq!(*geo.settings(), settings),
            None => panic!("geo strategy missing"),
        }
    }
}
