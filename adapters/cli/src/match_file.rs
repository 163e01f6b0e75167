//! Loading of match definitions from TOML files.

use std::{collections::BTreeMap, fs, path::Path, time::Duration};

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use survival_waves_core::{WaveDefinition, WaveTable};
use survival_waves_system_wave_spawner::{Config, SpawnPacing};
use survival_waves_world::ArenaLayout;

const SUPPORTED_MATCH_VERSION: u32 = 1;

/// Everything needed to play one match.
#[derive(Debug)]
pub(crate) struct MatchDefinition {
    pub(crate) seed: Option<u64>,
    pub(crate) config: Config,
    pub(crate) table: WaveTable,
    pub(crate) arena: ArenaLayout,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct MatchManifest {
    version: u32,
    seed: Option<u64>,
    #[serde(default)]
    spawner: SpawnerSettings,
    #[serde(default)]
    arena: ArenaLayout,
    #[serde(default)]
    waves: BTreeMap<String, WaveDefinition>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SpawnerSettings {
    inter_wave_delay_secs: Option<f64>,
    spawn_batch_delay_secs: Option<f64>,
    post_wave_delay_secs: Option<f64>,
    preload_timeout_secs: Option<f64>,
    spawn_search_radius: Option<f32>,
    spawn_vertical_clearance: Option<f32>,
    pacing: Option<PacingSetting>,
}

#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum PacingSetting {
    SingleBurst,
    Replenish,
}

impl From<PacingSetting> for SpawnPacing {
    fn from(value: PacingSetting) -> Self {
        match value {
            PacingSetting::SingleBurst => Self::SingleBurst,
            PacingSetting::Replenish => Self::Replenish,
        }
    }
}

impl MatchDefinition {
    /// Reads and validates the match file at `path`.
    pub(crate) fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read match file at {}", path.display()))?;
        parse_match(&contents).with_context(|| format!("invalid match file {}", path.display()))
    }
}

fn parse_match(contents: &str) -> Result<MatchDefinition> {
    let manifest: MatchManifest =
        toml::from_str(contents).context("failed to parse match toml contents")?;
    if manifest.version != SUPPORTED_MATCH_VERSION {
        bail!(
            "unsupported match file version {}; expected {}",
            manifest.version,
            SUPPORTED_MATCH_VERSION
        );
    }

    if manifest.waves.is_empty() {
        bail!("match file defines no waves");
    }
    let table = WaveTable::from_rows(manifest.waves).context("invalid wave table")?;
    table
        .ensure_contiguous()
        .context("wave table rows must be numbered without gaps")?;

    if manifest.arena.spawn_points.is_empty() {
        bail!("arena defines no spawn points");
    }

    let config = manifest.spawner.apply(Config::default())?;

    Ok(MatchDefinition {
        seed: manifest.seed,
        config,
        table,
        arena: manifest.arena,
    })
}

impl SpawnerSettings {
    fn apply(self, mut config: Config) -> Result<Config> {
        if let Some(secs) = self.inter_wave_delay_secs {
            config.inter_wave_delay = seconds("inter_wave_delay_secs", secs)?;
        }
        if let Some(secs) = self.spawn_batch_delay_secs {
            config.spawn_batch_delay = seconds("spawn_batch_delay_secs", secs)?;
        }
        if let Some(secs) = self.post_wave_delay_secs {
            config.post_wave_delay = seconds("post_wave_delay_secs", secs)?;
        }
        if let Some(secs) = self.preload_timeout_secs {
            config.preload_timeout = seconds("preload_timeout_secs", secs)?;
        }
        if let Some(radius) = self.spawn_search_radius {
            if !radius.is_finite() || radius < 0.0 {
                bail!("spawn_search_radius must be a non-negative number, got {radius}");
            }
            config.spawn_search_radius = radius;
        }
        if let Some(clearance) = self.spawn_vertical_clearance {
            if !clearance.is_finite() {
                bail!("spawn_vertical_clearance must be finite, got {clearance}");
            }
            config.spawn_vertical_clearance = clearance;
        }
        if let Some(pacing) = self.pacing {
            config.pacing = pacing.into();
        }
        Ok(config)
    }
}

fn seconds(field: &str, secs: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(secs)
        .with_context(|| format!("`{field}` must be a non-negative number of seconds, got {secs}"))
}
