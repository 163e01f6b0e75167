//! Bookkeeping for asynchronous kind resolution requests and the resolved-kind cache.

use std::{collections::HashMap, time::Duration};

use survival_waves_core::{KindHandle, KindReference, PreloadTicket, WaveIndex};

/// Requests issued for one wave, split by how each distinct reference was handled.
#[derive(Debug, Default)]
pub(crate) struct PreloadPlan {
    pub(crate) requests: Vec<(PreloadTicket, KindReference)>,
    pub(crate) null_references: Vec<KindReference>,
    pub(crate) already_cached: usize,
}

#[derive(Debug)]
struct Outstanding {
    ticket: PreloadTicket,
    reference: KindReference,
    elapsed: Duration,
}

/// Tracks in-flight resolution requests and the append-only cache they populate.
#[derive(Debug, Default)]
pub(crate) struct PreloadTracker {
    cache: HashMap<KindReference, KindHandle>,
    outstanding: Vec<Outstanding>,
    next_serial: u64,
}

impl PreloadTracker {
    /// Plans one request per distinct, non-null, uncached reference.
    pub(crate) fn begin<'a, I>(&mut self, wave: WaveIndex, kinds: I) -> PreloadPlan
    where
        I: IntoIterator<Item = &'a KindReference>,
    {
        let mut plan = PreloadPlan::default();
        for reference in kinds {
            if reference.is_null() {
                if !plan.null_references.contains(reference) {
                    plan.null_references.push(reference.clone());
                }
                continue;
            }

            if self.cache.contains_key(reference) {
                plan.already_cached += 1;
                continue;
            }

            if self
                .outstanding
                .iter()
                .any(|pending| &pending.reference == reference)
            {
                continue;
            }

            let ticket = PreloadTicket::new(wave, self.next_serial);
            self.next_serial = self.next_serial.wrapping_add(1);
            self.outstanding.push(Outstanding {
                ticket,
                reference: reference.clone(),
                elapsed: Duration::ZERO,
            });
            plan.requests.push((ticket, reference.clone()));
        }
        plan
    }

    /// Retires the request matching `ticket`, returning its reference if it was still live.
    pub(crate) fn complete(&mut self, ticket: PreloadTicket) -> Option<KindReference> {
        let position = self
            .outstanding
            .iter()
            .position(|pending| pending.ticket == ticket)?;
        Some(self.outstanding.swap_remove(position).reference)
    }

    /// Stores a resolved handle. Existing entries are never replaced.
    pub(crate) fn store(&mut self, reference: KindReference, handle: KindHandle) {
        let _ = self.cache.entry(reference).or_insert(handle);
    }

    /// Ages every live request by `dt` and retires those older than `timeout`.
    pub(crate) fn expire(
        &mut self,
        dt: Duration,
        timeout: Duration,
    ) -> Vec<(PreloadTicket, KindReference)> {
        let mut expired = Vec::new();
        self.outstanding.retain_mut(|pending| {
            pending.elapsed = pending.elapsed.saturating_add(dt);
            if pending.elapsed >= timeout {
                expired.push((pending.ticket, pending.reference.clone()));
                false
            } else {
                true
            }
        });
        expired
    }

    /// Drops every live request so that late completions are ignored.
    pub(crate) fn abandon(&mut self) -> usize {
        let abandoned = self.outstanding.len();
        self.outstanding.clear();
        abandoned
    }

    /// Reports whether every issued request has reported back or expired.
    pub(crate) fn is_settled(&self) -> bool {
        self.outstanding.is_empty()
    }

    /// Resolved handle cached for `reference`, if any.
    pub(crate) fn handle(&self, reference: &KindReference) -> Option<KindHandle> {
        self.cache.get(reference).copied()
    }

    /// Number of references resolved so far in the match.
    pub(crate) fn cached_len(&self) -> usize {
        self.cache.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference(path: &str) -> KindReference {
        KindReference::new(path)
    }

    #[test]
    fn plans_one_request_per_distinct_reference() {
        let mut tracker = PreloadTracker::default();
        let grunt = reference("enemies/grunt");
        let archer = reference("enemies/archer");
        let null = KindReference::null();

        let plan = tracker.begin(WaveIndex::FIRST, [&grunt, &archer, &grunt, &null, &null]);

        assert_eq!(plan.requests.len(), 2);
        assert_eq!(plan.requests[0].1, grunt);
        assert_eq!(plan.requests[1].1, archer);
        assert_ne!(plan.requests[0].0, plan.requests[1].0);
        assert_eq!(plan.null_references, vec![null]);
        assert!(!tracker.is_settled());
    }

    #[test]
    fn cached_references_are_not_requested_again() {
        let mut tracker = PreloadTracker::default();
        let grunt = reference("enemies/grunt");
        tracker.store(grunt.clone(), KindHandle::new(7));

        let plan = tracker.begin(WaveIndex::FIRST, [&grunt]);

        assert!(plan.requests.is_empty());
        assert_eq!(plan.already_cached, 1);
        assert!(tracker.is_settled());
    }

    #[test]
    fn store_keeps_the_first_handle() {
        let mut tracker = PreloadTracker::default();
        let grunt = reference("enemies/grunt");
        tracker.store(grunt.clone(), KindHandle::new(1));
        tracker.store(grunt.clone(), KindHandle::new(2));
        assert_eq!(tracker.handle(&grunt), Some(KindHandle::new(1)));
        assert_eq!(tracker.cached_len(), 1);
    }

    #[test]
    fn expired_tickets_can_no_longer_complete() {
        let mut tracker = PreloadTracker::default();
        let grunt = reference("enemies/grunt");
        let plan = tracker.begin(WaveIndex::FIRST, [&grunt]);
        let ticket = plan.requests[0].0;

        assert!(tracker
            .expire(Duration::from_secs(1), Duration::from_secs(2))
            .is_empty());
        let expired = tracker.expire(Duration::from_secs(1), Duration::from_secs(2));

        assert_eq!(expired, vec![(ticket, grunt)]);
        assert!(tracker.is_settled());
        assert_eq!(tracker.complete(ticket), None);
    }

    #[test]
    fn abandon_discards_live_requests() {
        let mut tracker = PreloadTracker::default();
        let plan = tracker.begin(
            WaveIndex::FIRST,
            [&reference("enemies/grunt"), &reference("enemies/archer")],
        );

        assert_eq!(tracker.abandon(), 2);
        assert!(tracker.is_settled());
        assert_eq!(tracker.complete(plan.requests[0].0), None);
    }
}
