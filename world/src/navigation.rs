//! Navigable floor of the arena used to answer reachable-point queries.

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

const RNG_MULTIPLIER: u64 = 6_364_136_223_846_793_005;
const RNG_INCREMENT: u64 = 1_442_695_040_888_963_407;

/// Axis-aligned walkable rectangle on the arena floor.
///
/// Points are sampled on the floor plane (`x`, `y`); the height of the query
/// origin is preserved so callers decide how far above ground to place actors.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct NavigableArea {
    /// Lower corner of the walkable rectangle.
    pub min: Vec2,
    /// Upper corner of the walkable rectangle.
    pub max: Vec2,
}

impl NavigableArea {
    /// Creates a square area centred on the origin with the provided half extent.
    #[must_use]
    pub fn centered(half_extent: f32) -> Self {
        Self {
            min: Vec2::splat(-half_extent),
            max: Vec2::splat(half_extent),
        }
    }

    /// Reports whether the floor position of `point` lies on walkable ground.
    #[must_use]
    pub fn contains(&self, point: Vec3) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
    }

    fn clamp(&self, point: Vec3) -> Vec3 {
        Vec3::new(
            point.x.clamp(self.min.x, self.max.x),
            point.y.clamp(self.min.y, self.max.y),
            point.z,
        )
    }
}

/// Deterministic sampler that scatters points inside a disc on walkable ground.
#[derive(Clone, Debug)]
pub(crate) struct PointSampler {
    rng_state: u64,
}

impl PointSampler {
    pub(crate) const fn new(seed: u64) -> Self {
        Self { rng_state: seed }
    }

    /// Picks a walkable point within `radius` of `origin`, or `None` off the floor.
    pub(crate) fn sample(
        &mut self,
        area: &NavigableArea,
        origin: Vec3,
        radius: f32,
    ) -> Option<Vec3> {
        if !area.contains(origin) {
            return None;
        }

        if radius <= 0.0 {
            return Some(origin);
        }

        let angle = self.next_unit() * std::f32::consts::TAU;
        let distance = radius * self.next_unit().sqrt();
        let candidate = origin + Vec3::new(angle.cos() * distance, angle.sin() * distance, 0.0);
        Some(area.clamp(candidate))
    }

    fn next_unit(&mut self) -> f32 {
        self.rng_state = self
            .rng_state
            .wrapping_mul(RNG_MULTIPLIER)
            .wrapping_add(RNG_INCREMENT);
        ((self.rng_state >> 40) as f32) / ((1_u64 << 24) as f32)
    }
}
