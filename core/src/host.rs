//! Collaborator contracts the host environment provides to the wave spawn controller.
//!
//! The controller owns sequencing, counting and timing. Everything that needs
//! world geometry, asset streaming or actor instantiation goes through these
//! traits. Implementations must never block: resolution requests return
//! immediately and complete on a later tick.

use glam::Vec3;
use thiserror::Error;

use crate::{EnemyId, KindHandle, KindReference, PreloadTicket, Rotation, SpawnPoint};

/// Failure reported by the asset resolver for a single reference.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// The reference names an asset the host does not know about.
    #[error("no asset registered at `{0}`")]
    UnknownAsset(String),
    /// The asset exists but is not an enemy kind.
    #[error("asset `{0}` is not a spawnable enemy kind")]
    NotSpawnable(String),
}

/// Failure reported by the actor factory when instantiation is refused.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ActorSpawnError {
    /// The host has no room for another actor.
    #[error("actor capacity of {capacity} reached")]
    CapacityReached {
        /// Maximum number of live actors.
        capacity: usize,
    },
    /// The handle does not correspond to a loaded kind.
    #[error("kind handle {0} is not loaded")]
    UnknownKind(u32),
    /// The location is blocked or otherwise unusable.
    #[error("location ({x}, {y}, {z}) is obstructed")]
    Obstructed {
        /// X coordinate of the rejected location.
        x: f32,
        /// Y coordinate of the rejected location.
        y: f32,
        /// Z coordinate of the rejected location.
        z: f32,
    },
}

/// Asynchronous loader that turns kind references into spawnable handles.
pub trait AssetResolver {
    /// Starts resolving `reference`; the outcome is delivered later together with `ticket`.
    fn request_kind(&mut self, ticket: PreloadTicket, reference: &KindReference);

    /// Withdraws a request the controller stopped waiting for; its outcome is no longer wanted.
    fn cancel_kind(&mut self, ticket: PreloadTicket);
}

/// Source of the spawn markers placed in the level.
pub trait SpawnPointProvider {
    /// Lists every spawn marker currently present in the world.
    fn spawn_points(&self) -> Vec<SpawnPoint>;
}

/// Navigation queries used to keep spawned enemies on walkable ground.
pub trait NavigationQuery {
    /// Finds a reachable point within `radius` of `origin`, if any exists.
    fn find_reachable_point(&mut self, origin: Vec3, radius: f32) -> Option<Vec3>;
}

/// Factory that places enemy actors into the world.
pub trait ActorFactory {
    /// Instantiates one enemy of the given kind.
    fn spawn_enemy(
        &mut self,
        kind: KindHandle,
        location: Vec3,
        rotation: Rotation,
    ) -> Result<EnemyId, ActorSpawnError>;
}

/// Everything the wave spawn controller needs from its host.
pub trait SpawnHost: AssetResolver + SpawnPointProvider + NavigationQuery + ActorFactory {}

impl<T> SpawnHost for T where
    T: AssetResolver + SpawnPointProvider + NavigationQuery + ActorFactory
{
}
