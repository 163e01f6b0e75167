//! Asset catalog that resolves enemy kind references with simulated streaming latency.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use survival_waves_core::{host::ResolveError, KindHandle, KindReference, PreloadTicket};

/// How the catalog answers a request for one asset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadBehaviour {
    /// The asset resolves on a later world advance.
    After {
        /// Advances until the completion is reported; zero and one both mean the next advance.
        ticks: u32,
    },
    /// The request is accepted but never answered.
    Never,
}

/// Asset registered in the catalog.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Reference under which the asset is addressed.
    pub reference: KindReference,
    /// Streaming behaviour of the asset.
    pub load: LoadBehaviour,
    /// Whether the asset describes a spawnable enemy kind.
    #[serde(default = "spawnable_by_default")]
    pub spawnable: bool,
}

fn spawnable_by_default() -> bool {
    true
}

/// Outcome of a resolution request, ready to hand to the wave spawn controller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PreloadCompletion {
    /// Ticket the request was issued with.
    pub ticket: PreloadTicket,
    /// Resolved handle or the reason resolution failed.
    pub outcome: Result<KindHandle, ResolveError>,
}

#[derive(Clone, Debug)]
struct PendingLoad {
    ticket: PreloadTicket,
    outcome: Result<KindHandle, ResolveError>,
    remaining: Option<u32>,
}

/// Registered assets plus the requests currently streaming.
#[derive(Clone, Debug, Default)]
pub(crate) struct AssetCatalog {
    entries: BTreeMap<KindReference, (KindHandle, CatalogEntry)>,
    pending: Vec<PendingLoad>,
}

impl AssetCatalog {
    pub(crate) fn new(entries: Vec<CatalogEntry>) -> Self {
        let mut catalog = Self::default();
        for (index, entry) in entries.into_iter().enumerate() {
            let handle = KindHandle::new(u32::try_from(index).unwrap_or(u32::MAX));
            let _ = catalog
                .entries
                .insert(entry.reference.clone(), (handle, entry));
        }
        catalog
    }

    pub(crate) fn request(&mut self, ticket: PreloadTicket, reference: &KindReference) {
        let (outcome, remaining) = match self.entries.get(reference) {
            Some((handle, entry)) => {
                let outcome = if entry.spawnable {
                    Ok(*handle)
                } else {
                    Err(ResolveError::NotSpawnable(reference.path().to_owned()))
                };
                let remaining = match entry.load {
                    LoadBehaviour::After { ticks } => Some(ticks),
                    LoadBehaviour::Never => None,
                };
                (outcome, remaining)
            }
            None => (
                Err(ResolveError::UnknownAsset(reference.path().to_owned())),
                Some(1),
            ),
        };

        self.pending.push(PendingLoad {
            ticket,
            outcome,
            remaining,
        });
    }

    /// Drops the pending request issued with `ticket`, reporting whether one existed.
    pub(crate) fn cancel(&mut self, ticket: PreloadTicket) -> bool {
        let before = self.pending.len();
        self.pending.retain(|pending| pending.ticket != ticket);
        self.pending.len() != before
    }

    /// Ages pending requests by one advance and returns those that finished.
    pub(crate) fn advance(&mut self) -> Vec<PreloadCompletion> {
        let mut finished = Vec::new();
        self.pending.retain_mut(|pending| match pending.remaining.as_mut() {
            Some(remaining) if *remaining <= 1 => {
                finished.push(PreloadCompletion {
                    ticket: pending.ticket,
                    outcome: pending.outcome.clone(),
                });
                false
            }
            Some(remaining) => {
                *remaining -= 1;
                true
            }
            None => true,
        });
        finished
    }

    pub(crate) fn is_loaded_handle(&self, handle: KindHandle) -> bool {
        self.entries
            .values()
            .any(|(candidate, entry)| *candidate == handle && entry.spawnable)
    }

    pub(crate) fn pending_len(&self) -> usize {
        self.pending.len()
    }
}
