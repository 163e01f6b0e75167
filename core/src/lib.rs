#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Survival Waves workspace.
//!
//! This crate defines the vocabulary that connects the wave spawn controller,
//! the host world it runs inside, and the adapters that drive both. The host
//! implements the collaborator traits in [`host`], the controller consumes
//! them while ticking, and every observable step of progress is broadcast as
//! an [`Event`] that pure systems and adapters fold deterministically.

pub mod host;
pub mod table;

use std::fmt;

use glam::Vec3;
use serde::{Deserialize, Serialize};

pub use table::{EnemySpawnEntry, TableError, WaveDefinition, WaveTable};

/// Prefix shared by every wave table row key.
pub const WAVE_ROW_PREFIX: &str = "Wave";

/// Phases of the survival match state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SurvivalState {
    /// Idle interval before the next wave begins preparing.
    AwaitingNextWave,
    /// Enemy kinds for the current wave are being resolved asynchronously.
    PreparingWave,
    /// Every kind has reported back; the spawn batch is pending its delay.
    Spawning,
    /// Enemies of the current wave are in the field.
    WaveInProgress,
    /// The current wave finished and the wave index advanced.
    WaveComplete,
    /// Every wave in the table has been played. Terminal.
    AllWavesComplete,
    /// The player was defeated before the table was exhausted. Terminal.
    MatchFailed,
}

impl SurvivalState {
    /// Reports whether the state accepts no further transitions.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::AllWavesComplete | Self::MatchFailed)
    }
}

impl fmt::Display for SurvivalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::AwaitingNextWave => "awaiting next wave",
            Self::PreparingWave => "preparing wave",
            Self::Spawning => "spawning",
            Self::WaveInProgress => "wave in progress",
            Self::WaveComplete => "wave complete",
            Self::AllWavesComplete => "all waves complete",
            Self::MatchFailed => "match failed",
        };
        f.write_str(label)
    }
}

/// One-based index of a wave within the wave table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WaveIndex(u32);

impl WaveIndex {
    /// Index of the opening wave of every match.
    pub const FIRST: Self = Self(1);

    /// Creates a wave index, rejecting zero because indices are one-based.
    #[must_use]
    pub const fn new(value: u32) -> Option<Self> {
        if value == 0 {
            None
        } else {
            Some(Self(value))
        }
    }

    /// Retrieves the numeric representation of the index.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }

    /// Index of the wave that follows this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// Key of the wave table row describing this wave, e.g. `Wave3`.
    #[must_use]
    pub fn row_key(&self) -> String {
        format!("{WAVE_ROW_PREFIX}{}", self.0)
    }
}

impl fmt::Display for WaveIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unresolved reference to an enemy kind descriptor that still has to be loaded.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KindReference(String);

impl KindReference {
    /// Creates a reference pointing at the provided asset path.
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    /// Reference that points at nothing.
    #[must_use]
    pub const fn null() -> Self {
        Self(String::new())
    }

    /// Asset path addressed by the reference.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.0
    }

    /// Reports whether the reference points at nothing and can never resolve.
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for KindReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            f.write_str("<null>")
        } else {
            f.write_str(&self.0)
        }
    }
}

/// Resolved enemy kind that the actor factory can instantiate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KindHandle(u32);

impl KindHandle {
    /// Creates a new kind handle with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the handle.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Opaque identifier of an enemy owned by the host world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EnemyId(u64);

impl EnemyId {
    /// Creates a new enemy identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

/// Orientation expressed as Euler angles in degrees.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rotation {
    /// Rotation around the lateral axis.
    pub pitch: f32,
    /// Rotation around the vertical axis.
    pub yaw: f32,
    /// Rotation around the forward axis.
    pub roll: f32,
}

impl Rotation {
    /// Rotation that only turns around the vertical axis.
    #[must_use]
    pub const fn from_yaw(yaw: f32) -> Self {
        Self {
            pitch: 0.0,
            yaw,
            roll: 0.0,
        }
    }
}

/// Marker placed in the level from which enemies enter the arena.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpawnPoint {
    /// World-space position of the marker.
    pub location: Vec3,
    /// Orientation applied to enemies spawned from the marker.
    #[serde(default)]
    pub rotation: Rotation,
}

impl SpawnPoint {
    /// Creates a spawn point at the provided location and orientation.
    #[must_use]
    pub const fn new(location: Vec3, rotation: Rotation) -> Self {
        Self { location, rotation }
    }
}

/// Ticket issued with every asynchronous kind resolution request.
///
/// The host hands the ticket back with the completion so the controller can
/// discard callbacks that belong to an abandoned or expired request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PreloadTicket {
    wave: WaveIndex,
    serial: u64,
}

impl PreloadTicket {
    /// Creates a ticket for the given wave and request serial number.
    #[must_use]
    pub const fn new(wave: WaveIndex, serial: u64) -> Self {
        Self { wave, serial }
    }

    /// Wave whose preparation issued the request.
    #[must_use]
    pub const fn wave(&self) -> WaveIndex {
        self.wave
    }

    /// Match-unique serial number of the request.
    #[must_use]
    pub const fn serial(&self) -> u64 {
        self.serial
    }
}

/// Reason a kind reference failed to resolve during wave preparation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PreloadFailure {
    /// The entry referenced nothing, so no request was issued.
    NullReference,
    /// The resolver reported that the asset could not be loaded.
    Unresolved,
    /// The resolver did not answer within the preload timeout.
    TimedOut,
}

/// Events broadcast by the wave spawn controller, in the order they occurred.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Announces that the controller entered a new state.
    StateChanged {
        /// State that became active.
        state: SurvivalState,
        /// Wave index at the moment of the transition.
        wave: WaveIndex,
    },
    /// Reports that a kind resolution request was handed to the asset resolver.
    PreloadRequested {
        /// Ticket attached to the request.
        ticket: PreloadTicket,
        /// Reference being resolved.
        reference: KindReference,
    },
    /// Confirms that a kind reference resolved into a spawnable handle.
    KindPreloaded {
        /// Reference that resolved.
        reference: KindReference,
        /// Handle now cached for the reference.
        handle: KindHandle,
    },
    /// Reports that a kind reference will not be available for the wave.
    PreloadFailed {
        /// Reference that failed.
        reference: KindReference,
        /// Why the reference is unavailable.
        reason: PreloadFailure,
    },
    /// Confirms that an enemy was instantiated by the actor factory.
    EnemySpawned {
        /// Wave the enemy belongs to.
        wave: WaveIndex,
        /// Identifier assigned by the host.
        enemy: EnemyId,
        /// Kind of the enemy.
        kind: KindHandle,
        /// Location the enemy was placed at.
        location: Vec3,
    },
    /// Reports that the actor factory refused to instantiate an enemy.
    SpawnRejected {
        /// Wave the enemy would have belonged to.
        wave: WaveIndex,
        /// Kind the factory was asked to instantiate.
        kind: KindHandle,
    },
    /// Reports that a wave entry contributed nothing because its kind never resolved.
    EntrySkipped {
        /// Wave containing the entry.
        wave: WaveIndex,
        /// Reference of the unresolved entry.
        reference: KindReference,
    },
    /// Summarises one executed spawn batch.
    BatchSpawned {
        /// Wave the batch belongs to.
        wave: WaveIndex,
        /// Number of enemies actually instantiated by the batch.
        spawned: u32,
    },
    /// Reports enemies spawned outside the batch path and handed to the controller.
    EnemiesRegistered {
        /// Wave that was active when the enemies were registered.
        wave: WaveIndex,
        /// Number of newly tracked enemies.
        count: u32,
    },
    /// Publishes the final summary of a match once it reached a terminal state.
    ReportPublished {
        /// Summary folded from the match's event stream.
        report: MatchReport,
    },
}

/// Number of enemies instantiated during a single wave.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WaveTally {
    wave: WaveIndex,
    spawned: u32,
}

impl WaveTally {
    /// Creates a tally for the provided wave.
    #[must_use]
    pub const fn new(wave: WaveIndex, spawned: u32) -> Self {
        Self { wave, spawned }
    }

    /// Wave the tally describes.
    #[must_use]
    pub const fn wave(&self) -> WaveIndex {
        self.wave
    }

    /// Enemies instantiated through spawn batches during the wave.
    #[must_use]
    pub const fn spawned(&self) -> u32 {
        self.spawned
    }
}

/// Counters describing how a match unfolded, including every absorbed failure.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct MatchReport {
    /// Terminal state the match ended in, if it ended.
    pub outcome: Option<SurvivalState>,
    /// Spawn tallies for every wave that executed a batch, in wave order.
    pub waves: Vec<WaveTally>,
    /// Enemies the actor factory refused to instantiate.
    pub rejected_spawns: u32,
    /// Entries skipped because their kind never resolved.
    pub skipped_entries: u32,
    /// Entries whose kind reference was null.
    pub null_references: u32,
    /// Kind references the resolver failed to load.
    pub unresolved_kinds: u32,
    /// Kind references that exceeded the preload timeout.
    pub timed_out_kinds: u32,
    /// Enemies registered through the external spawn hook.
    pub registered_enemies: u32,
}

impl MatchReport {
    /// Total number of enemies instantiated through spawn batches.
    #[must_use]
    pub fn total_spawned(&self) -> u32 {
        self.waves
            .iter()
            .fold(0_u32, |total, tally| total.saturating_add(tally.spawned()))
    }

    /// Total number of preload failures regardless of reason.
    #[must_use]
    pub const fn preload_failures(&self) -> u32 {
        self.null_references
            .saturating_add(self.unresolved_kinds)
            .saturating_add(self.timed_out_kinds)
    }
}
