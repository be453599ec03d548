//! Collision layer system for filtering collision detection
//!
//! Every collider sits on exactly one layer (a bit index `0..=31`) and carries
//! a mask of the layers it is willing to collide with. Two colliders are only
//! handed to the narrow-phase when each one's layer is in the other's mask.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::physics::error::{PhysicsError, PhysicsResult};

/// A single collision layer, identified by its bit index `0..=31`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct LayerId(u8);

impl LayerId {
    /// Highest valid layer index
    pub const MAX_INDEX: u8 = 31;

    /// Create a layer from its bit index
    pub fn new(index: u32) -> PhysicsResult<Self> {
        if index > u32::from(Self::MAX_INDEX) {
            return Err(PhysicsError::InvalidLayer(index));
        }
        Ok(Self(index as u8))
    }

    /// Bit index of this layer
    pub const fn index(self) -> u8 {
        self.0
    }

    /// Single-bit mask value for this layer
    pub const fn bit(self) -> u32 {
        1 << self.0
    }
}

impl Default for LayerId {
    fn default() -> Self {
        PhysicsLayers::DEFAULT
    }
}

impl TryFrom<u8> for LayerId {
    type Error = PhysicsError;

    fn try_from(index: u8) -> Result<Self, Self::Error> {
        Self::new(u32::from(index))
    }
}

impl From<LayerId> for u8 {
    fn from(layer: LayerId) -> Self {
        layer.0
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "layer {}", self.0)
    }
}

bitflags::bitflags! {
    /// Set of layers a collider collides with
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct LayerMask: u32 {
        /// Layer 0
        const DEFAULT = 1 << 0;
        /// Player characters
        const PLAYER = 1 << 1;
        /// Enemy characters
        const ENEMY = 1 << 2;
        /// Projectiles (bullets, missiles, etc.)
        const PROJECTILE = 1 << 3;
        /// Static environment geometry
        const ENVIRONMENT = 1 << 4;
        /// Trigger volumes
        const TRIGGER = 1 << 5;
        /// UI hit areas
        const UI = 1 << 6;
        /// Pickups and collectibles
        const PICKUP = 1 << 7;

        // User-defined layers 8..=31
        const _ = !0;
    }
}

impl Default for LayerMask {
    fn default() -> Self {
        Self::all()
    }
}

impl LayerMask {
    /// Mask that collides with nothing
    pub const fn none() -> Self {
        Self::empty()
    }

    /// Mask containing a single layer
    pub const fn from_layer(layer: LayerId) -> Self {
        Self::from_bits_retain(layer.bit())
    }

    /// True if `layer` is in this mask
    pub const fn contains_layer(self, layer: LayerId) -> bool {
        self.bits() & layer.bit() != 0
    }

    /// This mask with `layer` added
    #[must_use]
    pub const fn with_layer(self, layer: LayerId) -> Self {
        Self::from_bits_retain(self.bits() | layer.bit())
    }
}

impl FromIterator<LayerId> for LayerMask {
    fn from_iter<I: IntoIterator<Item = LayerId>>(iter: I) -> Self {
        iter.into_iter().fold(Self::empty(), Self::with_layer)
    }
}

/// Check if two colliders should collide based on their layers and masks.
///
/// A's layer must be in B's mask AND B's layer must be in A's mask.
pub fn compatible(layer_a: LayerId, mask_a: LayerMask, layer_b: LayerId, mask_b: LayerMask) -> bool {
    mask_b.contains_layer(layer_a) && mask_a.contains_layer(layer_b)
}

/// Named layer registry
///
/// Seeded with the built-in layers; games register their own names on top.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhysicsLayers {
    by_name: BTreeMap<String, LayerId>,
}

impl Default for PhysicsLayers {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysicsLayers {
    /// Layer 0, used by colliders that never pick one
    pub const DEFAULT: LayerId = LayerId(0);
    /// Player character layer
    pub const PLAYER: LayerId = LayerId(1);
    /// Enemy character layer
    pub const ENEMY: LayerId = LayerId(2);
    /// Projectiles (bullets, missiles, etc.)
    pub const PROJECTILE: LayerId = LayerId(3);
    /// Static environment geometry
    pub const ENVIRONMENT: LayerId = LayerId(4);
    /// Trigger volumes
    pub const TRIGGER: LayerId = LayerId(5);
    /// UI hit areas
    pub const UI: LayerId = LayerId(6);
    /// Pickups and collectibles
    pub const PICKUP: LayerId = LayerId(7);

    /// Built-in layer names
    pub const BUILT_IN: [(&'static str, LayerId); 8] = [
        ("default", Self::DEFAULT),
        ("player", Self::PLAYER),
        ("enemy", Self::ENEMY),
        ("projectile", Self::PROJECTILE),
        ("environment", Self::ENVIRONMENT),
        ("trigger", Self::TRIGGER),
        ("ui", Self::UI),
        ("pickup", Self::PICKUP),
    ];

    /// Registry holding the built-in layers
    pub fn new() -> Self {
        Self {
            by_name: Self::BUILT_IN
                .iter()
                .map(|(name, layer)| ((*name).to_string(), *layer))
                .collect(),
        }
    }

    /// Registry with no names at all
    pub fn empty() -> Self {
        Self {
            by_name: BTreeMap::new(),
        }
    }

    /// Register a named layer.
    ///
    /// Fails if the index is out of range, or if the name or index is
    /// already taken.
    pub fn register(&mut self, name: impl Into<String>, index: u32) -> PhysicsResult<LayerId> {
        let name = name.into();
        let layer = LayerId::new(index)?;

        if self.by_name.contains_key(&name) {
            return Err(PhysicsError::DuplicateLayer(name));
        }
        if let Some(existing) = self.name_of(layer) {
            return Err(PhysicsError::DuplicateLayer(format!(
                "{name} (index {index} is already '{existing}')"
            )));
        }

        log::debug!("Registered collision layer '{name}' at index {index}");
        self.by_name.insert(name, layer);
        Ok(layer)
    }

    /// Register every entry of a name → index table
    pub fn register_all<'a>(
        &mut self,
        layers: impl IntoIterator<Item = (&'a String, &'a u8)>,
    ) -> PhysicsResult<()> {
        for (name, index) in layers {
            self.register(name.clone(), u32::from(*index))?;
        }
        Ok(())
    }

    /// Look up a layer by name
    pub fn get(&self, name: &str) -> Option<LayerId> {
        self.by_name.get(name).copied()
    }

    /// Look up a layer by name, failing with [`PhysicsError::UnknownLayer`]
    pub fn layer(&self, name: &str) -> PhysicsResult<LayerId> {
        self.get(name)
            .ok_or_else(|| PhysicsError::UnknownLayer(name.to_string()))
    }

    /// Name registered for a layer index
    pub fn name_of(&self, layer: LayerId) -> Option<&str> {
        self.by_name
            .iter()
            .find(|(_, id)| **id == layer)
            .map(|(name, _)| name.as_str())
    }

    /// Number of named layers
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    /// True when no names are registered
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Iterate `(name, layer)` in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, LayerId)> {
        self.by_name.iter().map(|(name, layer)| (name.as_str(), *layer))
    }

    /// Helper to create a mask from multiple layers
    pub fn create_mask(layers: &[LayerId]) -> LayerMask {
        layers.iter().copied().collect()
    }

    /// Build a mask from registered layer names
    pub fn mask_from_names(&self, names: &[&str]) -> PhysicsResult<LayerMask> {
        names
            .iter()
            .map(|name| self.layer(name))
            .collect::<PhysicsResult<LayerMask>>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_collide_mutual() {
        let player_mask = PhysicsLayers::create_mask(&[PhysicsLayers::ENEMY, PhysicsLayers::ENVIRONMENT]);
        let enemy_mask = PhysicsLayers::create_mask(&[PhysicsLayers::PLAYER, PhysicsLayers::PROJECTILE]);

        assert!(compatible(PhysicsLayers::PLAYER, player_mask, PhysicsLayers::ENEMY, enemy_mask));
        assert!(compatible(PhysicsLayers::ENEMY, enemy_mask, PhysicsLayers::PLAYER, player_mask));
    }

    #[test]
    fn test_should_not_collide_one_way() {
        // Player wants enemies, but enemies ignore players
        let player_mask = LayerMask::ENEMY;
        let enemy_mask = LayerMask::PROJECTILE;

        assert!(!compatible(PhysicsLayers::PLAYER, player_mask, PhysicsLayers::ENEMY, enemy_mask));
        assert!(!compatible(PhysicsLayers::ENEMY, enemy_mask, PhysicsLayers::PLAYER, player_mask));
    }

    #[test]
    fn test_mask_creation() {
        let mask = PhysicsLayers::create_mask(&[
            PhysicsLayers::DEFAULT,
            PhysicsLayers::ENEMY,
            PhysicsLayers::ENVIRONMENT,
        ]);

        assert_eq!(mask.bits(), 0b10101);
        assert_eq!(mask, LayerMask::DEFAULT | LayerMask::ENEMY | LayerMask::ENVIRONMENT);
    }

    #[test]
    fn test_all_and_none() {
        let custom = LayerId::new(31).unwrap();
        assert_eq!(LayerMask::all().bits(), u32::MAX);
        assert!(LayerMask::all().contains_layer(custom));
        assert!(!LayerMask::none().contains_layer(PhysicsLayers::DEFAULT));
        assert_eq!(LayerMask::default(), LayerMask::all());
    }

    #[test]
    fn test_layer_index_out_of_range() {
        assert_eq!(LayerId::new(32), Err(PhysicsError::InvalidLayer(32)));
        assert!(LayerId::try_from(31u8).is_ok());
    }

    #[test]
    fn test_registry_defaults_and_custom_layers() {
        let mut layers = PhysicsLayers::new();
        assert_eq!(layers.get("player"), Some(PhysicsLayers::PLAYER));
        assert_eq!(layers.len(), 8);

        let water = layers.register("water", 12).unwrap();
        assert_eq!(water.index(), 12);
        assert_eq!(layers.name_of(water), Some("water"));

        let mask = layers.mask_from_names(&["water", "enemy"]).unwrap();
        assert!(mask.contains_layer(water));
        assert!(mask.contains_layer(PhysicsLayers::ENEMY));
        assert!(!mask.contains_layer(PhysicsLayers::PLAYER));
    }

    #[test]
    fn test_registry_rejects_duplicates_and_unknowns() {
        let mut layers = PhysicsLayers::new();
        assert!(matches!(layers.register("player", 20), Err(PhysicsError::DuplicateLayer(_))));
        assert!(matches!(layers.register("lava", 1), Err(PhysicsError::DuplicateLayer(_))));
        assert!(matches!(layers.register("lava", 40), Err(PhysicsError::InvalidLayer(40))));
        assert_eq!(
            layers.mask_from_names(&["nope"]),
            Err(PhysicsError::UnknownLayer("nope".into()))
        );
    }
}
