//! Wave table data model and the data-load validation applied to it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{KindReference, WaveIndex, WAVE_ROW_PREFIX};

/// One enemy kind listed by a wave, with the bounds of its per-batch count.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnemySpawnEntry {
    kind: KindReference,
    min_count: u32,
    max_count: u32,
}

impl EnemySpawnEntry {
    /// Creates an entry; the bounds are checked when the owning table is built.
    #[must_use]
    pub const fn new(kind: KindReference, min_count: u32, max_count: u32) -> Self {
        Self {
            kind,
            min_count,
            max_count,
        }
    }

    /// Reference to the enemy kind spawned by the entry.
    #[must_use]
    pub const fn kind(&self) -> &KindReference {
        &self.kind
    }

    /// Inclusive lower bound of the per-batch spawn count.
    #[must_use]
    pub const fn min_count(&self) -> u32 {
        self.min_count
    }

    /// Inclusive upper bound of the per-batch spawn count.
    #[must_use]
    pub const fn max_count(&self) -> u32 {
        self.max_count
    }
}

/// One row of the wave table.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WaveDefinition {
    entries: Vec<EnemySpawnEntry>,
    total_enemy_cap: u32,
}

impl WaveDefinition {
    /// Creates a wave from its ordered entries and the wave-wide enemy cap.
    #[must_use]
    pub fn new(entries: Vec<EnemySpawnEntry>, total_enemy_cap: u32) -> Self {
        Self {
            entries,
            total_enemy_cap,
        }
    }

    /// Entries in table order.
    #[must_use]
    pub fn entries(&self) -> &[EnemySpawnEntry] {
        &self.entries
    }

    /// Hard ceiling on enemies spawned through batches during the wave.
    #[must_use]
    pub const fn total_enemy_cap(&self) -> u32 {
        self.total_enemy_cap
    }

    /// Distinct kind references of the wave, in order of first appearance.
    #[must_use]
    pub fn distinct_kinds(&self) -> Vec<&KindReference> {
        let mut kinds: Vec<&KindReference> = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            if !kinds.contains(&entry.kind()) {
                kinds.push(entry.kind());
            }
        }
        kinds
    }
}

/// Configuration errors detected while building or reading a wave table.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum TableError {
    /// The table contains no rows at all.
    #[error("wave table contains no rows")]
    Empty,
    /// A row key does not follow the `Wave<N>` naming scheme.
    #[error("row key `{key}` does not match `Wave<N>` with N >= 1")]
    MalformedRowKey {
        /// Offending key.
        key: String,
    },
    /// The same row key appears twice.
    #[error("row key `{key}` appears more than once")]
    DuplicateRow {
        /// Repeated key.
        key: String,
    },
    /// An entry's minimum batch count exceeds its maximum.
    #[error("entry {entry} of row `{key}` has min_count {min} greater than max_count {max}")]
    InvertedBatchRange {
        /// Row containing the entry.
        key: String,
        /// Zero-based position of the entry within the row.
        entry: usize,
        /// Declared minimum.
        min: u32,
        /// Declared maximum.
        max: u32,
    },
    /// The row expected for a wave index is absent.
    #[error("wave table has no row `{key}`")]
    MissingRow {
        /// Key that was looked up.
        key: String,
    },
}

/// Validated collection of wave rows keyed by `Wave<N>`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "WaveTableRows", into = "WaveTableRows")]
pub struct WaveTable {
    rows: BTreeMap<String, WaveDefinition>,
}

impl WaveTable {
    /// Builds a table from keyed rows, validating every entry's batch bounds.
    pub fn from_rows<I>(rows: I) -> Result<Self, TableError>
    where
        I: IntoIterator<Item = (String, WaveDefinition)>,
    {
        let mut validated = BTreeMap::new();
        for (key, definition) in rows {
            if parse_row_key(&key).is_none() {
                return Err(TableError::MalformedRowKey { key });
            }

            for (position, entry) in definition.entries().iter().enumerate() {
                if entry.min_count() > entry.max_count() {
                    return Err(TableError::InvertedBatchRange {
                        key,
                        entry: position,
                        min: entry.min_count(),
                        max: entry.max_count(),
                    });
                }
            }

            if validated.contains_key(&key) {
                return Err(TableError::DuplicateRow { key });
            }
            let _ = validated.insert(key, definition);
        }

        if validated.is_empty() {
            return Err(TableError::Empty);
        }

        Ok(Self { rows: validated })
    }

    /// Builds a table whose rows are numbered `Wave1..=WaveN` in the given order.
    pub fn from_waves<I>(waves: I) -> Result<Self, TableError>
    where
        I: IntoIterator<Item = WaveDefinition>,
    {
        Self::from_rows(
            waves
                .into_iter()
                .enumerate()
                .map(|(position, wave)| (format!("{WAVE_ROW_PREFIX}{}", position + 1), wave)),
        )
    }

    /// Number of waves a match played from this table lasts.
    #[must_use]
    pub fn total_waves(&self) -> u32 {
        u32::try_from(self.rows.len()).unwrap_or(u32::MAX)
    }

    /// Looks up a row by its raw key.
    #[must_use]
    pub fn lookup_row(&self, key: &str) -> Option<&WaveDefinition> {
        self.rows.get(key)
    }

    /// Looks up the row describing the provided wave.
    pub fn row(&self, wave: WaveIndex) -> Result<&WaveDefinition, TableError> {
        let key = wave.row_key();
        match self.rows.get(&key) {
            Some(definition) => Ok(definition),
            None => Err(TableError::MissingRow { key }),
        }
    }

    /// Confirms that every wave from the first to the last has a row.
    pub fn ensure_contiguous(&self) -> Result<(), TableError> {
        let mut wave = WaveIndex::FIRST;
        while wave.get() <= self.total_waves() {
            let _ = self.row(wave)?;
            wave = wave.next();
        }
        Ok(())
    }

    /// Iterates rows in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &WaveDefinition)> {
        self.rows.iter().map(|(key, row)| (key.as_str(), row))
    }
}

/// Serialized shape of a [`WaveTable`], validated on conversion.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct WaveTableRows {
    /// Rows keyed by `Wave<N>`.
    pub rows: BTreeMap<String, WaveDefinition>,
}

impl TryFrom<WaveTableRows> for WaveTable {
    type Error = TableError;

    fn try_from(value: WaveTableRows) -> Result<Self, Self::Error> {
        Self::from_rows(value.rows)
    }
}

impl From<WaveTable> for WaveTableRows {
    fn from(value: WaveTable) -> Self {
        Self { rows: value.rows }
    }
}

fn parse_row_key(key: &str) -> Option<WaveIndex> {
    let digits = key.strip_prefix(WAVE_ROW_PREFIX)?;
    if digits.starts_with(['+', '0']) {
        return None;
    }
    digits.parse::<u32>().ok().and_then(WaveIndex::new)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_row_keys() {
        assert_eq!(parse_row_key("Wave1"), WaveIndex::new(1));
        assert_eq!(parse_row_key("Wave12"), WaveIndex::new(12));
        assert_eq!(parse_row_key("Wave0"), None);
        assert_eq!(parse_row_key("wave1"), None);
        assert_eq!(parse_row_key("Wave+1"), None);
        assert_eq!(parse_row_key("Wave01"), None);
        assert_eq!(parse_row_key("Wave"), None);
    }

    #[test]
    fn distinct_kinds_preserve_first_appearance() {
        let grunt = KindReference::new("enemies/grunt");
        let archer = KindReference::new("enemies/archer");
        let wave = WaveDefinition::new(
            vec![
                EnemySpawnEntry::new(grunt.clone(), 1, 2),
                EnemySpawnEntry::new(archer.clone(), 1, 1),
                EnemySpawnEntry::new(grunt.clone(), 3, 4),
            ],
            10,
        );
        assert_eq!(wave.distinct_kinds(), vec![&grunt, &archer]);
    }
}
