#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Reference arena world that hosts the wave spawn controller.
//!
//! The world owns every spawned enemy, the streaming asset catalog and the
//! walkable floor. It implements the collaborator contracts from
//! [`survival_waves_core::host`], so adapters and tests can run complete
//! matches without an engine behind them.

mod catalog;
mod navigation;

use std::collections::BTreeMap;

use glam::Vec3;
use serde::{Deserialize, Serialize};
use survival_waves_core::{
    host::{ActorFactory, ActorSpawnError, AssetResolver, NavigationQuery, SpawnPointProvider},
    EnemyId, KindHandle, KindReference, PreloadTicket, Rotation, SpawnPoint,
};
use tracing::debug;

pub use catalog::{CatalogEntry, LoadBehaviour, PreloadCompletion};
pub use navigation::NavigableArea;

use catalog::AssetCatalog;
use navigation::PointSampler;

const NAVIGATION_SEED: u64 = 0x42f0_e1eb_d4a5_3c21;
const DEFAULT_ACTOR_CAPACITY: usize = 64;
const DEFAULT_HALF_EXTENT: f32 = 2_000.0;

/// Static description of an arena, typically loaded from a match file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ArenaLayout {
    /// Spawn markers placed in the level.
    #[serde(default)]
    pub spawn_points: Vec<SpawnPoint>,
    /// Walkable floor of the arena.
    #[serde(default = "default_floor")]
    pub floor: NavigableArea,
    /// Maximum number of enemies alive at once.
    #[serde(default = "default_actor_capacity")]
    pub actor_capacity: usize,
    /// Enemy kinds the arena can stream in.
    #[serde(default)]
    pub catalog: Vec<CatalogEntry>,
}

impl Default for ArenaLayout {
    fn default() -> Self {
        Self {
            spawn_points: Vec::new(),
            floor: default_floor(),
            actor_capacity: DEFAULT_ACTOR_CAPACITY,
            catalog: Vec::new(),
        }
    }
}

fn default_floor() -> NavigableArea {
    NavigableArea::centered(DEFAULT_HALF_EXTENT)
}

fn default_actor_capacity() -> usize {
    DEFAULT_ACTOR_CAPACITY
}

/// Enemy instantiated inside the arena.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Enemy {
    /// Identifier assigned on spawn.
    pub id: EnemyId,
    /// Kind the enemy was created from.
    pub kind: KindHandle,
    /// Location the enemy was placed at.
    pub location: Vec3,
    /// Orientation the enemy was placed with.
    pub rotation: Rotation,
}

/// Authoritative arena state.
#[derive(Debug)]
pub struct World {
    spawn_points: Vec<SpawnPoint>,
    floor: NavigableArea,
    actor_capacity: usize,
    catalog: AssetCatalog,
    sampler: PointSampler,
    enemies: BTreeMap<EnemyId, Enemy>,
    next_enemy: u64,
    tick_index: u64,
}

impl World {
    /// Creates a world from the provided layout.
    #[must_use]
    pub fn new(layout: ArenaLayout) -> Self {
        Self {
            spawn_points: layout.spawn_points,
            floor: layout.floor,
            actor_capacity: layout.actor_capacity,
            catalog: AssetCatalog::new(layout.catalog),
            sampler: PointSampler::new(NAVIGATION_SEED),
            enemies: BTreeMap::new(),
            next_enemy: 0,
            tick_index: 0,
        }
    }

    /// Advances streaming by one frame and returns the completions that became ready.
    pub fn advance(&mut self) -> Vec<PreloadCompletion> {
        self.tick_index = self.tick_index.saturating_add(1);
        self.catalog.advance()
    }

    /// Removes an enemy from the arena, reporting whether it existed.
    pub fn destroy_enemy(&mut self, enemy: EnemyId) -> bool {
        let removed = self.enemies.remove(&enemy).is_some();
        if removed {
            debug!(enemy = enemy.get(), "enemy destroyed");
        }
        removed
    }

    /// Places an enemy without going through the wave spawn controller, as a summon would.
    pub fn summon_enemy(
        &mut self,
        kind: KindHandle,
        location: Vec3,
    ) -> Result<EnemyId, ActorSpawnError> {
        self.spawn_enemy(kind, location, Rotation::default())
    }
}

impl AssetResolver for World {
    fn request_kind(&mut self, ticket: PreloadTicket, reference: &KindReference) {
        debug!(serial = ticket.serial(), reference = %reference, "streaming kind");
        self.catalog.request(ticket, reference);
    }

    fn cancel_kind(&mut self, ticket: PreloadTicket) {
        if self.catalog.cancel(ticket) {
            debug!(serial = ticket.serial(), "streaming cancelled");
        }
    }
}

impl SpawnPointProvider for World {
    fn spawn_points(&self) -> Vec<SpawnPoint> {
        self.spawn_points.clone()
    }
}

impl NavigationQuery for World {
    fn find_reachable_point(&mut self, origin: Vec3, radius: f32) -> Option<Vec3> {
        self.sampler.sample(&self.floor, origin, radius)
    }
}

impl ActorFactory for World {
    fn spawn_enemy(
        &mut self,
        kind: KindHandle,
        location: Vec3,
        rotation: Rotation,
    ) -> Result<EnemyId, ActorSpawnError> {
        if !self.catalog.is_loaded_handle(kind) {
            return Err(ActorSpawnError::UnknownKind(kind.get()));
        }

        if !self.floor.contains(location) {
            return Err(ActorSpawnError::Obstructed {
                x: location.x,
                y: location.y,
                z: location.z,
            });
        }

        if self.enemies.len() >= self.actor_capacity {
            return Err(ActorSpawnError::CapacityReached {
                capacity: self.actor_capacity,
            });
        }

        let id = EnemyId::new(self.next_enemy);
        self.next_enemy = self.next_enemy.saturating_add(1);
        let _ = self.enemies.insert(
            id,
            Enemy {
                id,
                kind,
                location,
                rotation,
            },
        );
        Ok(id)
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use survival_waves_core::EnemyId;

    use super::{Enemy, World};

    /// Enemies currently alive, ordered by identifier.
    #[must_use]
    pub fn enemies(world: &World) -> Vec<Enemy> {
        world.enemies.values().copied().collect()
    }

    /// Identifiers of the enemies currently alive, ordered ascending.
    #[must_use]
    pub fn enemy_ids(world: &World) -> Vec<EnemyId> {
        world.enemies.keys().copied().collect()
    }

    /// Number of enemies currently alive.
    #[must_use]
    pub fn enemy_count(world: &World) -> usize {
        world.enemies.len()
    }

    /// Number of kind requests still streaming.
    #[must_use]
    pub fn pending_loads(world: &World) -> usize {
        world.catalog.pending_len()
    }

    /// Number of frames the world has advanced.
    #[must_use]
    pub fn tick_index(world: &World) -> u64 {
        world.tick_index
    }
}
