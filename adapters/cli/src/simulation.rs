//! Fixed-step driver that plays a match against the reference arena.

use std::time::Duration;

use anyhow::{Context, Result};
use rand::{seq::SliceRandom, SeedableRng};
use rand_chacha::ChaCha8Rng;
use survival_waves_core::{Event, MatchReport, SurvivalState};
use survival_waves_system_analytics::MatchAnalytics;
use survival_waves_system_wave_spawner::WaveSpawner;
use survival_waves_world::{query, World};
use tracing::{debug, warn};

use crate::match_file::MatchDefinition;

const CULL_SEED_SALT: u64 = 0x6b69_6c6c_6572_7321;

/// Knobs of a simulated match that are not part of the match file.
#[derive(Clone, Copy, Debug)]
pub(crate) struct SimulationOptions {
    pub(crate) dt: Duration,
    pub(crate) max_ticks: u64,
    pub(crate) kill_every: Option<Duration>,
    pub(crate) defeat_at: Option<Duration>,
}

/// How a simulated match ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct SimulationOutcome {
    pub(crate) report: MatchReport,
    pub(crate) ticks: u64,
    pub(crate) elapsed: Duration,
}

impl SimulationOutcome {
    pub(crate) fn finished(&self) -> bool {
        self.report.outcome.is_some()
    }
}

/// Plays the match until it reaches a terminal state or the tick budget runs out.
///
/// `observer` sees every controller event and the published report, in order.
pub(crate) fn run(
    definition: MatchDefinition,
    seed: u64,
    options: SimulationOptions,
    mut observer: impl FnMut(Duration, &Event),
) -> Result<SimulationOutcome> {
    let mut world = World::new(definition.arena);
    let mut spawner = WaveSpawner::new(definition.config, definition.table, seed)
        .context("match setup rejected the wave table")?;
    let mut analytics = MatchAnalytics::new();
    let mut culler = ChaCha8Rng::seed_from_u64(seed ^ CULL_SEED_SALT);

    let mut events = Vec::new();
    let mut published = Vec::new();
    let mut elapsed = Duration::ZERO;
    let mut since_kill = Duration::ZERO;
    let mut ticks = 0;

    spawner.start(&mut events);

    while ticks < options.max_ticks && !spawner.state().is_terminal() {
        ticks += 1;
        elapsed = elapsed.saturating_add(options.dt);

        for completion in world.advance() {
            spawner.complete_preload(completion.ticket, completion.outcome, &mut events);
        }

        spawner
            .tick(options.dt, &mut world, &mut events)
            .with_context(|| format!("wave spawner aborted the match on tick {ticks}"))?;

        if let Some(interval) = options.kill_every {
            since_kill = since_kill.saturating_add(options.dt);
            if since_kill >= interval {
                since_kill = Duration::ZERO;
                cull_one(&mut world, &mut spawner, &mut culler, &mut events)?;
            }
        }

        if options.defeat_at.is_some_and(|at| elapsed >= at) {
            spawner.player_defeated(&mut events);
        }

        analytics.handle(&events, &mut published);
        for event in events.drain(..).chain(published.drain(..)) {
            observer(elapsed, &event);
        }
    }

    let report = match analytics.last_report() {
        Some(report) => report.clone(),
        None => {
            warn!(
                ticks,
                state = %spawner.state(),
                "tick budget exhausted before the match ended"
            );
            analytics.current().clone()
        }
    };

    Ok(SimulationOutcome {
        report,
        ticks,
        elapsed,
    })
}

fn cull_one(
    world: &mut World,
    spawner: &mut WaveSpawner,
    rng: &mut ChaCha8Rng,
    events: &mut Vec<Event>,
) -> Result<()> {
    let alive = query::enemy_ids(world);
    let Some(&enemy) = alive.choose(rng) else {
        return Ok(());
    };

    if world.destroy_enemy(enemy) {
        debug!(enemy = enemy.get(), "culled enemy");
        spawner
            .enemy_destroyed(enemy, world, events)
            .context("refill after a kill failed")?;
    }
    Ok(())
}

/// Human-readable line for events worth printing, or `None` for per-enemy noise.
pub(crate) fn describe(event: &Event) -> Option<String> {
    match event {
        Event::StateChanged { state, wave } => Some(match state {
            SurvivalState::AllWavesComplete | SurvivalState::MatchFailed => format!("{state}"),
            _ => format!("wave {wave}: {state}"),
        }),
        Event::BatchSpawned { wave, spawned } => {
            Some(format!("wave {wave}: batch spawned {spawned} enemies"))
        }
        Event::PreloadFailed { reference, reason } => {
            Some(format!("kind {reference} unavailable ({reason:?})"))
        }
        Event::ReportPublished { report } => Some(format!(
            "report published: {} enemies over {} waves",
            report.total_spawned(),
            report.waves.len()
        )),
        _ => None,
    }
}

/// Multi-line summary of a finished or interrupted match.
pub(crate) fn summarize(outcome: &SimulationOutcome) -> String {
    let report = &outcome.report;
    let mut lines = vec![format!(
        "outcome: {}",
        report
            .outcome
            .map_or_else(|| "unfinished".to_owned(), |state| state.to_string())
    )];
    lines.push(format!(
        "simulated {:.2}s over {} ticks",
        outcome.elapsed.as_secs_f64(),
        outcome.ticks
    ));
    for tally in &report.waves {
        lines.push(format!("  wave {}: {} spawned", tally.wave(), tally.spawned()));
    }
    lines.push(format!("total spawned: {}", report.total_spawned()));
    lines.push(format!("registered enemies: {}", report.registered_enemies));
    lines.push(format!("rejected spawns: {}", report.rejected_spawns));
    lines.push(format!("skipped entries: {}", report.skipped_entries));
    lines.push(format!(
        "preload failures: {} (null {}, unresolved {}, timed out {})",
        report.preload_failures(),
        report.null_references,
        report.unresolved_kinds,
        report.timed_out_kinds
    ));
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use survival_waves_core::{
        EnemySpawnEntry, KindReference, Rotation, SpawnPoint, WaveDefinition, WaveTable,
    };
    use survival_waves_system_wave_spawner::{Config, SpawnPacing};
    use survival_waves_world::{ArenaLayout, CatalogEntry, LoadBehaviour};

    fn definition(pacing: SpawnPacing) -> MatchDefinition {
        MatchDefinition {
            seed: None,
            config: Config {
                inter_wave_delay: Duration::from_millis(200),
                spawn_batch_delay: Duration::from_millis(100),
                post_wave_delay: Duration::from_millis(200),
                pacing,
                ..Config::default()
            },
            table: WaveTable::from_waves([
                WaveDefinition::new(
                    vec![EnemySpawnEntry::new(KindReference::new("enemies/grunt"), 1, 3)],
                    4,
                ),
                WaveDefinition::new(
                    vec![EnemySpawnEntry::new(KindReference::new("enemies/grunt"), 2, 2)],
                    2,
                ),
            ])
            .expect("valid table"),
            arena: ArenaLayout {
                spawn_points: vec![SpawnPoint::new(Vec3::ZERO, Rotation::default())],
                catalog: vec![CatalogEntry {
                    reference: KindReference::new("enemies/grunt"),
                    load: LoadBehaviour::After { ticks: 2 },
                    spawnable: true,
                }],
                ..ArenaLayout::default()
            },
        }
    }

    fn options() -> SimulationOptions {
        SimulationOptions {
            dt: Duration::from_millis(50),
            max_ticks: 10_000,
            kill_every: Some(Duration::from_millis(100)),
            defeat_at: None,
        }
    }

    #[test]
    fn replenished_match_runs_to_completion() {
        let mut states = Vec::new();
        let outcome = run(definition(SpawnPacing::Replenish), 7, options(), |_, event| {
            if let Event::StateChanged { state, .. } = event {
                states.push(*state);
            }
        })
        .expect("match runs");

        assert!(outcome.finished());
        assert_eq!(outcome.report.outcome, Some(SurvivalState::AllWavesComplete));
        assert_eq!(outcome.report.total_spawned(), 6);
        assert_eq!(states.last(), Some(&SurvivalState::AllWavesComplete));
    }

    #[test]
    fn defeat_ends_the_match_early() {
        let options = SimulationOptions {
            defeat_at: Some(Duration::from_millis(250)),
            ..options()
        };
        let outcome = run(definition(SpawnPacing::SingleBurst), 7, options, |_, _| {})
            .expect("match runs");

        assert_eq!(outcome.report.outcome, Some(SurvivalState::MatchFailed));
        assert_eq!(outcome.ticks, 5);
        assert!(summarize(&outcome).contains("outcome: match failed"));
    }

    #[test]
    fn exhausted_budget_reports_progress_so_far() {
        let options = SimulationOptions {
            max_ticks: 3,
            ..options()
        };
        let outcome = run(definition(SpawnPacing::SingleBurst), 7, options, |_, _| {})
            .expect("match runs");

        assert!(!outcome.finished());
        assert!(summarize(&outcome).starts_with("outcome: unfinished"));
    }

    #[test]
    fn per_enemy_events_are_not_described() {
        assert_eq!(
            describe(&Event::SpawnRejected {
                wave: survival_waves_core::WaveIndex::FIRST,
                kind: survival_waves_core::KindHandle::new(0),
            }),
            None
        );
        assert_eq!(
            describe(&Event::StateChanged {
                state: SurvivalState::Spawning,
                wave: survival_waves_core::WaveIndex::FIRST,
            })
            .as_deref(),
            Some("wave 1: spawning")
        );
    }
}
