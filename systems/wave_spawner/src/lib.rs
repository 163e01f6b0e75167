#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Wave spawn controller driving a survival match through timed phases.
//!
//! The controller is ticked once per frame by its host. It owns the wave table,
//! the resolved-kind cache and every counter; the host only answers queries
//! through the collaborator traits in [`survival_waves_core::host`] and feeds
//! asynchronous completions back through [`WaveSpawner::complete_preload`].
//! Progress is observable exclusively through [`Event`] values appended to the
//! caller's buffer, in the order they happened.

mod preload;
mod rng;

use std::{collections::BTreeSet, time::Duration};

use glam::Vec3;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use survival_waves_core::{
    host::{ResolveError, SpawnHost},
    EnemyId, Event, KindHandle, KindReference, PreloadFailure, PreloadTicket, SpawnPoint,
    SurvivalState, TableError, WaveDefinition, WaveIndex, WaveTable,
};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::preload::PreloadTracker;
pub use crate::rng::draw_batch_count;

/// How enemies are released over the course of a wave.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SpawnPacing {
    /// One batch per wave. The wave completes as soon as its batch has run.
    #[default]
    SingleBurst,
    /// Every destroyed enemy triggers a refill batch until the cap is reached.
    /// The wave completes once the cap is met and no tracked enemy is alive.
    Replenish,
}

/// Tunables of the wave spawn controller.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Config {
    /// Idle time spent in [`SurvivalState::AwaitingNextWave`]. Defaults to 5 s.
    pub inter_wave_delay: Duration,
    /// Delay between entering [`SurvivalState::Spawning`] and running the batch. Defaults to 2 s.
    pub spawn_batch_delay: Duration,
    /// Time spent in [`SurvivalState::WaveComplete`] before moving on. Defaults to 5 s.
    pub post_wave_delay: Duration,
    /// Radius around a spawn point searched for a reachable location. Defaults to 400 units.
    pub spawn_search_radius: f32,
    /// Height added to every spawn location to keep enemies off the ground. Defaults to 150 units.
    pub spawn_vertical_clearance: f32,
    /// Age after which an unanswered preload request counts as failed. Defaults to 10 s.
    pub preload_timeout: Duration,
    /// Release pattern of enemies within a wave.
    pub pacing: SpawnPacing,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            inter_wave_delay: Duration::from_secs(5),
            spawn_batch_delay: Duration::from_secs(2),
            post_wave_delay: Duration::from_secs(5),
            spawn_search_radius: 400.0,
            spawn_vertical_clearance: 150.0,
            preload_timeout: Duration::from_secs(10),
            pacing: SpawnPacing::SingleBurst,
        }
    }
}

/// Fatal configuration errors that abort the match.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SpawnerError {
    /// The wave table is unusable.
    #[error(transparent)]
    Table(#[from] TableError),
    /// A batch needed a spawn point but the level defines none.
    #[error("the level defines no spawn points")]
    NoSpawnPoints,
}

/// Spawn attempts made by one batch and how many of them succeeded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct BatchOutcome {
    attempted: u32,
    spawned: u32,
}

impl BatchOutcome {
    /// A batch stalls when the factory refused every enemy it was asked for.
    /// Zero draws are not a stall; the next refill draws again.
    const fn stalled(self) -> bool {
        self.attempted > 0 && self.spawned == 0
    }
}

/// Per-match state machine that prepares, spawns and completes waves.
#[derive(Debug)]
pub struct WaveSpawner {
    config: Config,
    table: WaveTable,
    seed: u64,
    rng: ChaCha8Rng,
    state: SurvivalState,
    current_wave: WaveIndex,
    total_waves: u32,
    elapsed_in_phase: Duration,
    active_wave: Option<WaveDefinition>,
    spawned_this_wave: u32,
    lifetime_spawned: u64,
    refill_stalled: bool,
    live_enemies: BTreeSet<EnemyId>,
    spawn_points: Option<Vec<SpawnPoint>>,
    preload: PreloadTracker,
}

impl WaveSpawner {
    /// Creates a controller for one match, rejecting tables with missing rows.
    pub fn new(config: Config, table: WaveTable, seed: u64) -> Result<Self, SpawnerError> {
        table.ensure_contiguous()?;
        let total_waves = table.total_waves();
        Ok(Self {
            config,
            table,
            seed,
            rng: rng::wave_rng(seed, WaveIndex::FIRST),
            state: SurvivalState::AwaitingNextWave,
            current_wave: WaveIndex::FIRST,
            total_waves,
            elapsed_in_phase: Duration::ZERO,
            active_wave: None,
            spawned_this_wave: 0,
            lifetime_spawned: 0,
            refill_stalled: false,
            live_enemies: BTreeSet::new(),
            spawn_points: None,
            preload: PreloadTracker::default(),
        })
    }

    /// Announces the initial state so subscribers start from a known phase.
    pub fn start(&mut self, out: &mut Vec<Event>) {
        self.elapsed_in_phase = Duration::ZERO;
        info!(
            total_waves = self.total_waves,
            state = %self.state,
            "survival match started"
        );
        out.push(Event::StateChanged {
            state: self.state,
            wave: self.current_wave,
        });
    }

    /// Advances phase timers by `dt` and performs at most one state transition.
    pub fn tick<H>(
        &mut self,
        dt: Duration,
        host: &mut H,
        out: &mut Vec<Event>,
    ) -> Result<(), SpawnerError>
    where
        H: SpawnHost + ?Sized,
    {
        if self.state.is_terminal() {
            return Ok(());
        }

        self.elapsed_in_phase = self.elapsed_in_phase.saturating_add(dt);

        match self.state {
            SurvivalState::AwaitingNextWave => {
                if self.elapsed_in_phase >= self.config.inter_wave_delay {
                    self.enter_preparing(host, out)?;
                }
            }
            SurvivalState::PreparingWave => {
                for (ticket, reference) in self.preload.expire(dt, self.config.preload_timeout) {
                    host.cancel_kind(ticket);
                    warn!(
                        wave = self.current_wave.get(),
                        reference = %reference,
                        "kind preload timed out"
                    );
                    out.push(Event::PreloadFailed {
                        reference,
                        reason: PreloadFailure::TimedOut,
                    });
                }

                if self.preload.is_settled() {
                    self.transition(SurvivalState::Spawning, out);
                }
            }
            SurvivalState::Spawning => {
                if self.elapsed_in_phase >= self.config.spawn_batch_delay {
                    let _ = self.spawn_batch(host, out)?;
                    self.transition(SurvivalState::WaveInProgress, out);
                }
            }
            SurvivalState::WaveInProgress => {
                if self.config.pacing == SpawnPacing::Replenish
                    && self.live_enemies.is_empty()
                    && self.should_keep_spawning()
                {
                    let batch = self.spawn_batch(host, out)?;
                    if batch.stalled() {
                        warn!(
                            wave = self.current_wave.get(),
                            attempted = batch.attempted,
                            "refill batch could not place any enemy"
                        );
                        self.refill_stalled = true;
                    }
                }

                if self.wave_exhausted() {
                    self.transition(SurvivalState::WaveComplete, out);
                    self.current_wave = self.current_wave.next();
                }
            }
            SurvivalState::WaveComplete => {
                if self.elapsed_in_phase >= self.config.post_wave_delay {
                    if self.has_finished_all_waves() {
                        self.transition(SurvivalState::AllWavesComplete, out);
                    } else {
                        self.transition(SurvivalState::AwaitingNextWave, out);
                    }
                }
            }
            SurvivalState::AllWavesComplete | SurvivalState::MatchFailed => {}
        }

        Ok(())
    }

    /// Delivers the outcome of an asynchronous kind resolution request.
    ///
    /// Completions that arrive after the match ended, after their request timed
    /// out, or for tickets this controller never issued are ignored and leave
    /// the cache untouched.
    pub fn complete_preload(
        &mut self,
        ticket: PreloadTicket,
        outcome: Result<KindHandle, ResolveError>,
        out: &mut Vec<Event>,
    ) {
        if self.state.is_terminal() {
            debug!(
                serial = ticket.serial(),
                state = %self.state,
                "discarding preload completion after match end"
            );
            return;
        }

        let Some(reference) = self.preload.complete(ticket) else {
            debug!(
                serial = ticket.serial(),
                wave = ticket.wave().get(),
                "discarding preload completion for a retired ticket"
            );
            return;
        };

        match outcome {
            Ok(handle) => {
                debug!(reference = %reference, handle = handle.get(), "kind preloaded");
                self.preload.store(reference.clone(), handle);
                out.push(Event::KindPreloaded { reference, handle });
            }
            Err(error) => {
                warn!(reference = %reference, %error, "kind preload failed");
                out.push(Event::PreloadFailed {
                    reference,
                    reason: PreloadFailure::Unresolved,
                });
            }
        }
    }

    /// Ends the match in [`SurvivalState::MatchFailed`] from any non-terminal state.
    pub fn player_defeated(&mut self, out: &mut Vec<Event>) {
        if self.state.is_terminal() {
            return;
        }

        let abandoned = self.preload.abandon();
        if abandoned > 0 {
            debug!(abandoned, "abandoning outstanding preloads");
        }
        self.transition(SurvivalState::MatchFailed, out);
    }

    /// Tracks enemies spawned outside the batch path, such as summons.
    ///
    /// Registered enemies count towards the live set and the lifetime total but
    /// never consume the wave cap. Returns how many enemies were newly tracked.
    pub fn register_spawned_enemies<I>(&mut self, enemies: I, out: &mut Vec<Event>) -> u32
    where
        I: IntoIterator<Item = EnemyId>,
    {
        if self.state.is_terminal() {
            return 0;
        }

        let mut count = 0_u32;
        for enemy in enemies {
            if self.live_enemies.insert(enemy) {
                count = count.saturating_add(1);
            }
        }

        if count > 0 {
            self.lifetime_spawned = self.lifetime_spawned.saturating_add(u64::from(count));
            debug!(count, wave = self.current_wave.get(), "registered external enemies");
            out.push(Event::EnemiesRegistered {
                wave: self.current_wave,
                count,
            });
        }
        count
    }

    /// Stops tracking a destroyed enemy and, when replenishing, refills the wave.
    pub fn enemy_destroyed<H>(
        &mut self,
        enemy: EnemyId,
        host: &mut H,
        out: &mut Vec<Event>,
    ) -> Result<(), SpawnerError>
    where
        H: SpawnHost + ?Sized,
    {
        if !self.live_enemies.remove(&enemy) {
            debug!(enemy = enemy.get(), "ignoring destruction of untracked enemy");
            return Ok(());
        }

        if self.state == SurvivalState::WaveInProgress
            && self.config.pacing == SpawnPacing::Replenish
            && self.should_keep_spawning()
        {
            let _ = self.spawn_batch(host, out)?;
        }
        Ok(())
    }

    /// Active state of the match.
    #[must_use]
    pub const fn state(&self) -> SurvivalState {
        self.state
    }

    /// One-based index of the wave being played, or of the next one while idle.
    #[must_use]
    pub const fn current_wave(&self) -> WaveIndex {
        self.current_wave
    }

    /// Number of waves in the table.
    #[must_use]
    pub const fn total_waves(&self) -> u32 {
        self.total_waves
    }

    /// Reports whether the wave index moved past the last row of the table.
    #[must_use]
    pub const fn has_finished_all_waves(&self) -> bool {
        self.current_wave.get() > self.total_waves
    }

    /// Enemies spawned through batches during the current wave.
    #[must_use]
    pub const fn spawned_this_wave(&self) -> u32 {
        self.spawned_this_wave
    }

    /// Enemies spawned or registered since the match started.
    #[must_use]
    pub const fn lifetime_spawned(&self) -> u64 {
        self.lifetime_spawned
    }

    /// Enemies currently tracked as alive.
    pub fn live_enemies(&self) -> impl Iterator<Item = EnemyId> + '_ {
        self.live_enemies.iter().copied()
    }

    /// Handle cached for `reference`, if its preload succeeded.
    #[must_use]
    pub fn preloaded_kind(&self, reference: &KindReference) -> Option<KindHandle> {
        self.preload.handle(reference)
    }

    /// Tunables the controller was created with.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    fn transition(&mut self, state: SurvivalState, out: &mut Vec<Event>) {
        info!(
            from = %self.state,
            to = %state,
            wave = self.current_wave.get(),
            "survival state changed"
        );
        self.state = state;
        self.elapsed_in_phase = Duration::ZERO;
        out.push(Event::StateChanged {
            state,
            wave: self.current_wave,
        });
    }

    fn enter_preparing<H>(&mut self, host: &mut H, out: &mut Vec<Event>) -> Result<(), SpawnerError>
    where
        H: SpawnHost + ?Sized,
    {
        let wave = self.current_wave;
        let definition = self.table.row(wave)?.clone();

        self.rng = rng::wave_rng(self.seed, wave);
        self.spawned_this_wave = 0;
        self.refill_stalled = false;
        self.transition(SurvivalState::PreparingWave, out);

        let plan = self.preload.begin(wave, definition.distinct_kinds());
        debug!(
            wave = wave.get(),
            requested = plan.requests.len(),
            already_cached = plan.already_cached,
            cache_size = self.preload.cached_len(),
            "preparing wave"
        );

        for reference in plan.null_references {
            warn!(wave = wave.get(), "wave entry has a null kind reference");
            out.push(Event::PreloadFailed {
                reference,
                reason: PreloadFailure::NullReference,
            });
        }

        for (ticket, reference) in plan.requests {
            host.request_kind(ticket, &reference);
            out.push(Event::PreloadRequested { ticket, reference });
        }

        self.active_wave = Some(definition);
        Ok(())
    }

    fn should_keep_spawning(&self) -> bool {
        let Some(wave) = &self.active_wave else {
            return false;
        };
        !self.refill_stalled
            && self.spawned_this_wave < wave.total_enemy_cap()
            && self.has_spawnable_entry(wave)
    }

    fn has_spawnable_entry(&self, wave: &WaveDefinition) -> bool {
        wave.entries()
            .iter()
            .any(|entry| entry.max_count() > 0 && self.preload.handle(entry.kind()).is_some())
    }

    fn wave_exhausted(&self) -> bool {
        match self.config.pacing {
            SpawnPacing::SingleBurst => true,
            SpawnPacing::Replenish => self.live_enemies.is_empty() && !self.should_keep_spawning(),
        }
    }

    /// Runs one spawn batch over the active wave.
    fn spawn_batch<H>(
        &mut self,
        host: &mut H,
        out: &mut Vec<Event>,
    ) -> Result<BatchOutcome, SpawnerError>
    where
        H: SpawnHost + ?Sized,
    {
        let Some(wave) = self.active_wave.take() else {
            return Ok(BatchOutcome::default());
        };
        let result = self.spawn_entries(&wave, host, out);
        self.active_wave = Some(wave);
        let batch = result?;

        info!(
            wave = self.current_wave.get(),
            spawned = batch.spawned,
            attempted = batch.attempted,
            spawned_this_wave = self.spawned_this_wave,
            "spawn batch finished"
        );
        out.push(Event::BatchSpawned {
            wave: self.current_wave,
            spawned: batch.spawned,
        });
        Ok(batch)
    }

    fn spawn_entries<H>(
        &mut self,
        wave: &WaveDefinition,
        host: &mut H,
        out: &mut Vec<Event>,
    ) -> Result<BatchOutcome, SpawnerError>
    where
        H: SpawnHost + ?Sized,
    {
        let cap = wave.total_enemy_cap();
        let mut batch = BatchOutcome::default();

        for entry in wave.entries() {
            if self.spawned_this_wave >= cap {
                break;
            }

            let Some(kind) = self.preload.handle(entry.kind()) else {
                warn!(
                    wave = self.current_wave.get(),
                    reference = %entry.kind(),
                    "skipping entry whose kind never resolved"
                );
                out.push(Event::EntrySkipped {
                    wave: self.current_wave,
                    reference: entry.kind().clone(),
                });
                continue;
            };

            let count = draw_batch_count(&mut self.rng, entry);
            for _ in 0..count {
                if self.spawned_this_wave >= cap {
                    break;
                }

                batch.attempted += 1;
                let point = self.pick_spawn_point(host)?;
                let location = self.spawn_location(host, point);
                match host.spawn_enemy(kind, location, point.rotation) {
                    Ok(enemy) => {
                        batch.spawned += 1;
                        self.spawned_this_wave += 1;
                        self.lifetime_spawned = self.lifetime_spawned.saturating_add(1);
                        let _ = self.live_enemies.insert(enemy);
                        debug!(enemy = enemy.get(), kind = kind.get(), "enemy spawned");
                        out.push(Event::EnemySpawned {
                            wave: self.current_wave,
                            enemy,
                            kind,
                            location,
                        });
                    }
                    Err(error) => {
                        warn!(kind = kind.get(), %error, "actor factory rejected spawn");
                        out.push(Event::SpawnRejected {
                            wave: self.current_wave,
                            kind,
                        });
                    }
                }
            }
        }

        Ok(batch)
    }

    fn pick_spawn_point<H>(&mut self, host: &H) -> Result<SpawnPoint, SpawnerError>
    where
        H: SpawnHost + ?Sized,
    {
        if self.spawn_points.is_none() {
            let points = host.spawn_points();
            if points.is_empty() {
                return Err(SpawnerError::NoSpawnPoints);
            }
            debug!(count = points.len(), "cached spawn points");
            self.spawn_points = Some(points);
        }

        let Some(points) = self.spawn_points.as_ref() else {
            return Err(SpawnerError::NoSpawnPoints);
        };
        let index = self.rng.gen_range(0..points.len());
        Ok(points[index])
    }

    fn spawn_location<H>(&self, host: &mut H, point: SpawnPoint) -> Vec3
    where
        H: SpawnHost + ?Sized,
    {
        let ground = host
            .find_reachable_point(point.location, self.config.spawn_search_radius)
            .unwrap_or_else(|| {
                debug!("no reachable point near spawn marker, using the marker itself");
                point.location
            });
        ground + Vec3::Z * self.config.spawn_vertical_clearance
    }
}
