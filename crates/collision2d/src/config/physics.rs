//! Collision world configuration

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{Config, ConfigError};
use crate::physics::collision_layers::PhysicsLayers;
use crate::physics::error::PhysicsResult;
use crate::spatial::DEFAULT_AABB_MARGIN;

/// Tunables for a [`CollisionWorld`](crate::physics::CollisionWorld)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollisionWorldConfig {
    /// Margin added around each broad-phase leaf
    pub aabb_margin: f32,

    /// Only report pairs where at least one collider is a trigger
    pub require_trigger: bool,

    /// Log and dispatch stay events for persisting contacts
    pub report_stay_events: bool,

    /// Extra named layers registered on top of the built-in ones
    pub layers: BTreeMap<String, u8>,
}

impl Default for CollisionWorldConfig {
    fn default() -> Self {
        Self {
            aabb_margin: DEFAULT_AABB_MARGIN,
            require_trigger: false,
            report_stay_events: true,
            layers: BTreeMap::new(),
        }
    }
}

impl CollisionWorldConfig {
    /// Layer registry with the built-in layers plus `layers`
    pub fn build_layers(&self) -> PhysicsResult<PhysicsLayers> {
        let mut registry = PhysicsLayers::new();
        registry.register_all(&self.layers)?;
        Ok(registry)
    }
}

impl Config for CollisionWorldConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if !self.aabb_margin.is_finite() || self.aabb_margin < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "aabb_margin must be finite and non-negative, got {}",
                self.aabb_margin
            )));
        }
        self.build_layers()
            .map(|_| ())
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigFormat;

    fn custom_config() -> CollisionWorldConfig {
        CollisionWorldConfig {
            aabb_margin: 0.25,
            require_trigger: true,
            report_stay_events: false,
            layers: BTreeMap::from([("water".to_string(), 10), ("lava".to_string(), 11)]),
        }
    }

    #[test]
    fn test_toml_round_trip() {
        let config = custom_config();
        let text = config.to_string_with_format(ConfigFormat::Toml).unwrap();
        let parsed = CollisionWorldConfig::from_str_with_format(&text, ConfigFormat::Toml).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_ron_round_trip() {
        let config = custom_config();
        let text = config.to_string_with_format(ConfigFormat::Ron).unwrap();
        let parsed = CollisionWorldConfig::from_str_with_format(&text, ConfigFormat::Ron).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let parsed =
            CollisionWorldConfig::from_str_with_format("require_trigger = true\n", ConfigFormat::Toml)
                .unwrap();
        assert!(parsed.require_trigger);
        assert_eq!(parsed.aabb_margin, DEFAULT_AABB_MARGIN);
        assert!(parsed.report_stay_events);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let negative = "aabb_margin = -1.0\n";
        assert!(matches!(
            CollisionWorldConfig::from_str_with_format(negative, ConfigFormat::Toml),
            Err(ConfigError::Invalid(_))
        ));

        let clash = "[layers]\nwater = 1\n";
        assert!(matches!(
            CollisionWorldConfig::from_str_with_format(clash, ConfigFormat::Toml),
            Err(ConfigError::Invalid(_))
        ));

        let out_of_range = "[layers]\nwater = 40\n";
        assert!(matches!(
            CollisionWorldConfig::from_str_with_format(out_of_range, ConfigFormat::Toml),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_save_and_load_file() {
        let path = std::env::temp_dir().join(format!("collision2d-config-{}.ron", std::process::id()));
        let config = custom_config();

        config.save_to_file(&path).unwrap();
        let loaded = CollisionWorldConfig::load_from_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded, config);
    }
}
