#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic analytics system that folds controller events into a match report.

use survival_waves_core::{Event, MatchReport, PreloadFailure, WaveIndex, WaveTally};
use tracing::info;

/// Pure analytics system that summarises a survival match and publishes the result once.
#[derive(Debug, Default)]
pub struct MatchAnalytics {
    current: MatchReport,
    last_report: Option<MatchReport>,
}

impl MatchAnalytics {
    /// Creates a new analytics system with an empty report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the report folded from every event observed so far.
    #[must_use]
    pub fn current(&self) -> &MatchReport {
        &self.current
    }

    /// Returns the report published when the match ended, if it has ended.
    #[must_use]
    pub fn last_report(&self) -> Option<&MatchReport> {
        self.last_report.as_ref()
    }

    /// Consumes controller events and publishes the final report on a terminal state change.
    ///
    /// Events observed after the report was published are ignored, so replaying
    /// the same stream never publishes twice.
    pub fn handle(&mut self, events: &[Event], out: &mut Vec<Event>) {
        for event in events {
            if self.last_report.is_some() {
                return;
            }

            match event {
                Event::StateChanged { state, .. } if state.is_terminal() => {
                    self.current.outcome = Some(*state);
                    let report = self.current.clone();
                    info!(
                        outcome = %state,
                        waves = report.waves.len(),
                        spawned = report.total_spawned(),
                        rejected = report.rejected_spawns,
                        preload_failures = report.preload_failures(),
                        "match report published"
                    );
                    self.last_report = Some(report.clone());
                    out.push(Event::ReportPublished { report });
                }
                Event::BatchSpawned { wave, spawned } => self.record_batch(*wave, *spawned),
                Event::SpawnRejected { .. } => {
                    self.current.rejected_spawns = self.current.rejected_spawns.saturating_add(1);
                }
                Event::EntrySkipped { .. } => {
                    self.current.skipped_entries = self.current.skipped_entries.saturating_add(1);
                }
                Event::PreloadFailed { reason, .. } => {
                    let counter = match reason {
                        PreloadFailure::NullReference => &mut self.current.null_references,
                        PreloadFailure::Unresolved => &mut self.current.unresolved_kinds,
                        PreloadFailure::TimedOut => &mut self.current.timed_out_kinds,
                    };
                    *counter = counter.saturating_add(1);
                }
                Event::EnemiesRegistered { count, .. } => {
                    self.current.registered_enemies =
                        self.current.registered_enemies.saturating_add(*count);
                }
                _ => {}
            }
        }
    }

    fn record_batch(&mut self, wave: WaveIndex, spawned: u32) {
        match self.current.waves.last_mut() {
            Some(tally) if tally.wave() == wave => {
                *tally = WaveTally::new(wave, tally.spawned().saturating_add(spawned));
            }
            _ => self.current.waves.push(WaveTally::new(wave, spawned)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refill_batches_accumulate_into_one_tally() {
        let mut analytics = MatchAnalytics::new();
        let second = WaveIndex::FIRST.next();

        analytics.record_batch(WaveIndex::FIRST, 3);
        analytics.record_batch(WaveIndex::FIRST, 2);
        analytics.record_batch(second, 0);

        assert_eq!(
            analytics.current().waves,
            vec![WaveTally::new(WaveIndex::FIRST, 5), WaveTally::new(second, 0)]
        );
    }
}
