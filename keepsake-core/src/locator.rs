//! Current-generation lookup.
//!
//! Generations of a key are numbered `0, 1, 2, …` and written contiguously,
//! so the "current" save is the highest index whose key exists. Rather than
//! scanning every index, [`GenerationLocator`] gallops forward with a growing
//! stride until a probe misses, then bisects the gap:
//!
//! ```text
//! probe 0 ─▶ 100 ─▶ 300 ─▶ 700 ✗      stride phase (stride doubles)
//!            bisect (300, 700): 500 ✗ 400 ✗ 350 ✗ … 301 ✗   ─▶ 300
//! ```
//!
//! Every probe is charged against `max_probes`. When the budget runs out the
//! best index seen so far is returned with `converged == false`.

use tracing::{debug, warn};

use crate::config::LocatorConfig;
use crate::error::Result;
use crate::slot_key::append_generation;
use crate::store::SaveStore;

/// Outcome of a successful search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Located {
    /// Highest generation index found to exist.
    pub index: u32,
    /// Number of existence probes issued.
    pub probes: u32,
    /// `false` when the probe budget ran out before the gap closed; `index`
    /// is then a lower bound.
    pub converged: bool,
}

/// Adaptive stride-then-bisect search over generation indices.
#[derive(Debug, Clone)]
pub struct GenerationLocator {
    initial_step: u32,
    max_probes: u32,
}

impl Default for GenerationLocator {
    fn default() -> Self {
        Self::new(&LocatorConfig::default())
    }
}

impl GenerationLocator {
    /// Build a locator from configuration.
    #[must_use]
    pub fn new(config: &LocatorConfig) -> Self {
        Self {
            initial_step: config.initial_step.max(1),
            max_probes: config.max_probes.max(1),
        }
    }

    /// Find the highest existing generation of `base_key`.
    ///
    /// `probe` answers whether a full generation key exists. Returns
    /// `Ok(None)` when generation 0 is absent.
    ///
    /// # Errors
    ///
    /// Propagates the first error returned by `probe`.
    pub fn locate<P>(&self, base_key: &str, mut probe: P) -> Result<Option<Located>>
    where
        P: FnMut(&str) -> Result<bool>,
    {
        let mut probes = 1;
        if !probe(&append_generation(base_key, 0))? {
            debug!(base_key, "No generation 0, nothing to locate");
            return Ok(None);
        }

        let mut last_valid = 0_u32;
        let mut stride = self.initial_step;

        let mut upper = loop {
            if probes >= self.max_probes {
                return Ok(Some(self.exhausted(base_key, last_valid, probes)));
            }
            let Some(next) = last_valid.checked_add(stride) else {
                break u32::MAX;
            };
            probes += 1;
            if probe(&append_generation(base_key, next))? {
                last_valid = next;
                stride = stride.saturating_mul(2);
            } else {
                break next;
            }
        };

        while upper - last_valid > 1 {
            if probes >= self.max_probes {
                return Ok(Some(self.exhausted(base_key, last_valid, probes)));
            }
            let mid = last_valid + (upper - last_valid) / 2;
            probes += 1;
            if probe(&append_generation(base_key, mid))? {
                last_valid = mid;
            } else {
                upper = mid;
            }
        }

        debug!(base_key, index = last_valid, probes, "Located current generation");
        Ok(Some(Located {
            index: last_valid,
            probes,
            converged: true,
        }))
    }

    /// [`Self::locate`] against a store's existence check.
    ///
    /// # Errors
    ///
    /// Propagates storage errors.
    pub fn locate_in(&self, store: &dyn SaveStore, base_key: &str) -> Result<Option<Located>> {
        self.locate(base_key, |key| store.exists(key))
    }

    /// Index the next generation of `base_key` should be written under.
    ///
    /// An unconverged search is settled with [`settle`] first, so the
    /// returned index never names an existing generation.
    ///
    /// # Errors
    ///
    /// Propagates storage errors.
    pub fn next_generation(&self, store: &dyn SaveStore, base_key: &str) -> Result<u32> {
        let Some(located) = self.locate_in(store, base_key)? else {
            return Ok(0);
        };
        let latest = settle(base_key, located, |key| store.exists(key))?;
        Ok(latest.saturating_add(1))
    }

    fn exhausted(&self, base_key: &str, last_valid: u32, probes: u32) -> Located {
        warn!(
            base_key,
            best_estimate = last_valid,
            max_probes = self.max_probes,
            "Generation search ran out of probes; using best estimate"
        );
        Located {
            index: last_valid,
            probes,
            converged: false,
        }
    }
}

/// Exact newest index from a search result.
///
/// A converged result is returned as is. Otherwise `probe` is asked about
/// each index after the estimate until the first miss; writing to an index
/// the budgeted search under-reported would clobber a newer generation.
///
/// # Errors
///
/// Propagates the first error returned by `probe`.
pub fn settle<P>(base_key: &str, located: Located, mut probe: P) -> Result<u32>
where
    P: FnMut(&str) -> Result<bool>,
{
    let mut index = located.index;
    if located.converged {
        return Ok(index);
    }
    while let Some(next) = index.checked_add(1) {
        if !probe(&append_generation(base_key, next))? {
            break;
        }
        index = next;
    }
    debug!(base_key, estimate = located.index, index, "Settled unconverged generation search");
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::KeepsakeError;

    /// Probe for a store holding generations `0..=last`.
    fn contiguous(last: u32) -> impl FnMut(&str) -> Result<bool> {
        move |key: &str| {
            let index: u32 = key.rsplit('_').next().and_then(|s| s.parse().ok()).unwrap_or(u32::MAX);
            Ok(index <= last)
        }
    }

    #[test]
    fn missing_generation_zero_is_not_found() {
        let locator = GenerationLocator::default();
        let mut calls = 0;
        let result = locator
            .locate("A_P_S1", |_| {
                calls += 1;
                Ok(false)
            })
            .expect("locate");
        assert!(result.is_none());
        assert_eq!(calls, 1);
    }

    #[test]
    fn finds_exact_tail_for_contiguous_generations() {
        let locator = GenerationLocator::default();
        for last in [0, 1, 2, 99, 100, 101, 300, 301, 1_234, 99_999] {
            let located = locator
                .locate("A_P_S1", contiguous(last))
                .expect("locate")
                .expect("found");
            assert_eq!(located.index, last, "last = {last}");
            assert!(located.converged);
        }
    }

    #[test]
    fn sampled_hundreds_converge_to_300() {
        let existing = [0_u32, 100, 200, 300];
        let locator = GenerationLocator::default();
        let located = locator
            .locate("Adventure_Player1_S1", |key| {
                let index: u32 = key.rsplit('_').next().and_then(|s| s.parse().ok()).unwrap_or(u32::MAX);
                Ok(existing.contains(&index))
            })
            .expect("locate")
            .expect("found");
        assert_eq!(located.index, 300);
        assert!(located.converged);
    }

    #[test]
    fn budget_exhaustion_returns_best_estimate() {
        let locator = GenerationLocator::new(&LocatorConfig {
            initial_step: 1,
            max_probes: 3,
        });
        let located = locator
            .locate("k", contiguous(1_000))
            .expect("locate")
            .expect("found");
        assert!(!located.converged);
        assert_eq!(located.probes, 3);
        assert!(located.index <= 1_000);
    }

    #[test]
    fn settle_walks_past_an_exhausted_estimate() {
        let locator = GenerationLocator::new(&LocatorConfig {
            initial_step: 1,
            max_probes: 2,
        });
        let located = locator.locate("k", contiguous(5)).expect("locate").expect("found");
        assert!(!located.converged);
        assert_eq!(located.index, 1);
        assert_eq!(settle("k", located, contiguous(5)).expect("settle"), 5);

        let exact = Located {
            index: 3,
            probes: 4,
            converged: true,
        };
        assert_eq!(settle("k", exact, |_| Ok(true)).expect("settle"), 3);
    }

    #[test]
    fn probe_errors_propagate() {
        let locator = GenerationLocator::default();
        let result = locator.locate("k", |_| Err(KeepsakeError::Config("offline".into())));
        assert!(result.is_err());
    }
}
