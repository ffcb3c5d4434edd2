//! Positions and zone metadata.

use serde::{Deserialize, Serialize};

use crate::ZoneId;

/// A position inside a zone, with facing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub zone: ZoneId,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    #[serde(default)]
    pub yaw: f32,
    #[serde(default)]
    pub pitch: f32,
}

impl Location {
    #[must_use]
    pub fn new(zone: impl Into<ZoneId>, x: f64, y: f64, z: f64) -> Self {
        Self {
            zone: zone.into(),
            x,
            y,
            z,
            yaw: 0.0,
            pitch: 0.0,
        }
    }

    #[must_use]
    pub fn with_facing(mut self, yaw: f32, pitch: f32) -> Self {
        self.yaw = yaw;
        self.pitch = pitch;
        self
    }

    /// Squared distance to `other`, or `None` if they are in different zones.
    #[must_use]
    pub fn distance_squared(&self, other: &Location) -> Option<f64> {
        if self.zone != other.zone {
            return None;
        }
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        Some(dx * dx + dy * dy + dz * dz)
    }

    /// True if `other` is in the same zone and within `tolerance` blocks.
    #[must_use]
    pub fn is_within(&self, other: &Location, tolerance: f64) -> bool {
        self.distance_squared(other)
            .is_some_and(|d2| d2 <= tolerance * tolerance)
    }
}

/// What the environment reports about a loaded zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneInfo {
    pub zone: ZoneId,
    pub spawn: Location,
    /// Lowest buildable height of the zone.
    pub min_height: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_only_within_same_zone() {
        let a = Location::new("world", 0.0, 64.0, 0.0);
        let b = Location::new("world", 3.0, 64.0, 4.0);
        let c = Location::new("arena", 0.0, 64.0, 0.0);
        assert_eq!(a.distance_squared(&b), Some(25.0));
        assert_eq!(a.distance_squared(&c), None);
    }

    #[test]
    fn tolerance_is_inclusive() {
        let a = Location::new("world", 0.0, 64.0, 0.0);
        let b = Location::new("world", 3.0, 64.0, 0.0);
        assert!(a.is_within(&b, 3.0));
        assert!(!a.is_within(&b, 2.9));
    }
}
