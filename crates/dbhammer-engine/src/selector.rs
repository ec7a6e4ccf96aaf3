use std::sync::Arc;

use dbhammer_core::{CallerBuckets, CallerRole, ProcedureMetadata, SelectionWeights};
use rand::seq::SliceRandom;
use rand::Rng;

/// Picks procedures so that traffic approximates the configured role mix.
///
/// A roll `r` in `[1, total]` is tested against cumulative bands in
/// User, Batch, Admin order. A band whose bucket is empty falls through to
/// the next band instead of redistributing its share, and anything left
/// unmatched is drawn uniformly from the full list.
#[derive(Debug, Clone, Copy, Default)]
pub struct WeightedSelector {
    weights: SelectionWeights,
}

impl WeightedSelector {
    pub fn new(weights: SelectionWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> SelectionWeights {
        self.weights
    }

    /// Returns `None` only when the catalog is empty.
    pub fn select<R: Rng + ?Sized>(
        &self,
        buckets: &CallerBuckets,
        rng: &mut R,
    ) -> Option<Arc<ProcedureMetadata>> {
        let total = self.weights.total();
        if total > 0 {
            let roll = rng.gen_range(1..=total);
            let bands = [
                (CallerRole::User, self.weights.user_weight),
                (
                    CallerRole::Batch,
                    self.weights.user_weight.saturating_add(self.weights.batch_weight),
                ),
                (CallerRole::Admin, total),
            ];

            for (role, upper) in bands {
                if roll <= upper {
                    if let Some(picked) = buckets.bucket(role).choose(rng) {
                        return Some(Arc::clone(picked));
                    }
                }
            }
        }

        buckets.all().choose(rng).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::partition;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashMap;

    fn proc(name: &str, caller: Option<&str>) -> ProcedureMetadata {
        ProcedureMetadata::new(name, caller.map(str::to_string), Vec::new())
    }

    fn role_counts(buckets: &CallerBuckets, trials: usize, seed: u64) -> HashMap<String, usize> {
        let selector = WeightedSelector::default();
        let mut rng = StdRng::seed_from_u64(seed);
        let mut counts = HashMap::new();
        for _ in 0..trials {
            let picked = selector.select(buckets, &mut rng).expect("non-empty catalog");
            *counts.entry(picked.caller_label().to_string()).or_insert(0) += 1;
        }
        counts
    }

    #[test]
    fn default_weights_are_seven_two_one() {
        let weights = WeightedSelector::default().weights();
        assert_eq!(
            (weights.user_weight, weights.batch_weight, weights.admin_weight),
            (7, 2, 1)
        );
    }

    #[test]
    fn distribution_approximates_role_mix() {
        let buckets = partition(vec![
            proc("usp_u1", Some("User")),
            proc("usp_u2", Some("User")),
            proc("usp_b1", Some("Batch")),
            proc("usp_a1", Some("Admin")),
            proc("usp_x1", None),
        ]);

        let trials = 100_000;
        let counts = role_counts(&buckets, trials, 7);
        let share = |label: &str| counts.get(label).copied().unwrap_or(0) as f64 / trials as f64;

        assert!((share("User") - 0.70).abs() < 0.01, "user share {}", share("User"));
        assert!((share("Batch") - 0.20).abs() < 0.01, "batch share {}", share("Batch"));
        assert!((share("Admin") - 0.10).abs() < 0.01, "admin share {}", share("Admin"));
        // Untagged procedures are only reachable through the fallback.
        assert_eq!(counts.get("-"), None);
    }

    #[test]
    fn empty_user_bucket_falls_through_to_later_bands() {
        let buckets = partition(vec![proc("usp_b1", Some("Batch")), proc("usp_a1", Some("Admin"))]);
        let mut rng = StdRng::seed_from_u64(11);
        let selector = WeightedSelector::default();

        let mut batch = 0usize;
        for _ in 0..10_000 {
            let picked = selector.select(&buckets, &mut rng).expect("selection succeeds");
            if picked.name == "usp_b1" {
                batch += 1;
            }
        }
        // Rolls 1..=9 land on Batch, roll 10 on Admin.
        assert!((8_700..=9_300).contains(&batch), "batch picks {batch}");
    }

    #[test]
    fn untagged_catalog_uses_full_list() {
        let buckets = partition(vec![proc("usp_x1", None), proc("usp_x2", Some("Reporting"))]);
        let mut rng = StdRng::seed_from_u64(3);
        let selector = WeightedSelector::default();

        for _ in 0..100 {
            assert!(selector.select(&buckets, &mut rng).is_some());
        }
    }

    #[test]
    fn admin_band_takes_every_roll_when_earlier_bands_are_empty() {
        let buckets = partition(vec![proc("usp_admin", Some("Admin")), proc("usp_untagged", None)]);
        let counts = role_counts(&buckets, 20_000, 6);

        assert_eq!(counts.get("Admin"), Some(&20_000));
        assert_eq!(counts.len(), 1);
    }

    #[test]
    fn empty_catalog_selects_nothing() {
        let buckets = partition(Vec::new());
        let mut rng = StdRng::seed_from_u64(5);
        assert!(WeightedSelector::default().select(&buckets, &mut rng).is_none());
    }

    #[test]
    fn custom_weights_shift_the_mix() {
        let buckets = partition(vec![proc("usp_u1", Some("User")), proc("usp_a1", Some("Admin"))]);
        let selector = WeightedSelector::new(SelectionWeights {
            user_weight: 0,
            batch_weight: 0,
            admin_weight: 1,
        });
        let mut rng = StdRng::seed_from_u64(9);

        for _ in 0..100 {
            let picked = selector.select(&buckets, &mut rng).unwrap();
            assert_eq!(picked.name, "usp_a1");
        }
    }
}
