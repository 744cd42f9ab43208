//! Online Monte-Carlo accumulation (spec.md §3 "Estimator", §4.4, §9
//! "Global-state-free accumulation"). Each worker thread owns a private
//! `PartialEstimator`; `Estimator::merge` folds the per-thread tables
//! together by summing over the union of keys, which spec.md notes is
//! numerically order-independent at the precision this solver needs.

use crate::geometry::Float;
use crate::scene::Side;
use std::collections::HashMap;

/// Online `(sum_w, sum_w^2)` accumulator; derives mean/variance/standard
/// error against a realisation count supplied by the caller (spec.md §3:
/// "mean = sum_w / N, variance = sum_w^2/N - mean^2, standard error =
/// sqrt(variance/N)").
#[derive(Debug, Clone, Copy, Default)]
pub struct Accumulator {
    pub sum_w: f64,
    pub sum_w2: f64,
}

impl Accumulator {
    pub fn add(&mut self, w: Float) {
        let w = w as f64;
        self.sum_w += w;
        self.sum_w2 += w * w;
    }

    pub fn merge(&mut self, other: &Accumulator) {
        self.sum_w += other.sum_w;
        self.sum_w2 += other.sum_w2;
    }

    pub fn mean(&self, n: u64) -> f64 {
        if n == 0 {
            0.0
        } else {
            self.sum_w / n as f64
        }
    }

    pub fn variance(&self, n: u64) -> f64 {
        if n == 0 {
            0.0
        } else {
            let mean = self.mean(n);
            (self.sum_w2 / n as f64 - mean * mean).max(0.0)
        }
    }

    pub fn standard_error(&self, n: u64) -> f64 {
        if n == 0 {
            0.0
        } else {
            (self.variance(n) / n as f64).sqrt()
        }
    }
}

/// The four quantities tracked at every receiver visit (spec.md §3:
/// "integrated irradiance, absorptivity loss, reflectivity loss, cosine
/// loss").
#[derive(Debug, Clone, Copy, Default)]
pub struct ReceiverAccumulators {
    pub integrated_irradiance: Accumulator,
    pub absorptivity_loss: Accumulator,
    pub reflectivity_loss: Accumulator,
    pub cosine_loss: Accumulator,
}

impl ReceiverAccumulators {
    fn merge(&mut self, other: &ReceiverAccumulators) {
        self.integrated_irradiance.merge(&other.integrated_irradiance);
        self.absorptivity_loss.merge(&other.absorptivity_loss);
        self.reflectivity_loss.merge(&other.reflectivity_loss);
        self.cosine_loss.merge(&other.cosine_loss);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReceiverKey {
    pub instance_id: u64,
    pub side: ReceiverSide,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReceiverSide {
    Front,
    Back,
}

impl From<Side> for ReceiverSide {
    fn from(side: Side) -> Self {
        match side {
            Side::Front => ReceiverSide::Front,
            Side::Back => ReceiverSide::Back,
        }
    }
}

#[derive(Default)]
struct ReceiverEntry {
    totals: ReceiverAccumulators,
    per_primitive: Option<HashMap<u32, ReceiverAccumulators>>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PrimaryAccumulators {
    pub shadow: Accumulator,
    pub cosine_loss: Accumulator,
}

impl PrimaryAccumulators {
    fn merge(&mut self, other: &PrimaryAccumulators) {
        self.shadow.merge(&other.shadow);
        self.cosine_loss.merge(&other.cosine_loss);
    }
}

#[derive(Default)]
struct PrimaryEntry {
    totals: PrimaryAccumulators,
    per_receiver: HashMap<ReceiverKey, ReceiverAccumulators>,
}

/// One thread's private, lock-free tally; merged into the shared
/// [`Estimator`] once the parallel realisation loop closes.
#[derive(Default)]
pub struct PartialEstimator {
    n: u64,
    missing: Accumulator,
    shadow: Accumulator,
    receivers: HashMap<ReceiverKey, ReceiverEntry>,
    primaries: HashMap<u64, PrimaryEntry>,
}

impl PartialEstimator {
    pub fn new() -> Self {
        PartialEstimator::default()
    }

    pub fn record_realisation(&mut self) {
        self.n += 1;
    }

    pub fn record_missing(&mut self, w: Float) {
        self.missing.add(w);
    }

    pub fn record_shadow(&mut self, w: Float) {
        self.shadow.add(w);
    }

    /// Scores a receiver visit (spec.md §4.4 step 6): always into the
    /// side's totals, and additionally into the per-triangle table when
    /// `score_per_primitive` is set.
    pub fn record_receiver_hit(
        &mut self,
        instance_id: u64,
        side: Side,
        score_per_primitive: bool,
        triangle_index: u32,
        irradiance: Float,
        absorptivity_loss: Float,
        reflectivity_loss: Float,
        cosine_loss: Float,
    ) {
        let key = ReceiverKey { instance_id, side: side.into() };
        let entry = self.receivers.entry(key).or_default();
        entry.totals.integrated_irradiance.add(irradiance);
        entry.totals.absorptivity_loss.add(absorptivity_loss);
        entry.totals.reflectivity_loss.add(reflectivity_loss);
        entry.totals.cosine_loss.add(cosine_loss);
        if score_per_primitive {
            let per_prim = entry.per_primitive.get_or_insert_with(HashMap::new);
            let prim_entry = per_prim.entry(triangle_index).or_default();
            prim_entry.integrated_irradiance.add(irradiance);
            prim_entry.absorptivity_loss.add(absorptivity_loss);
            prim_entry.reflectivity_loss.add(reflectivity_loss);
            prim_entry.cosine_loss.add(cosine_loss);
        }
    }

    /// Records a primary's own shadow/cosine tallies for the realisation
    /// (spec.md §3 "Estimator": "a per-primary table ... carrying
    /// shadow/cosine accumulators"). Called exactly once per realisation,
    /// whether or not the shadow test succeeded.
    pub fn record_primary_totals(&mut self, primary_instance_id: u64, shadow_w: Float, cosine_loss: Float) {
        let entry = self.primaries.entry(primary_instance_id).or_default();
        entry.totals.shadow.add(shadow_w);
        entry.totals.cosine_loss.add(cosine_loss);
    }

    /// Records one (primary, receiver) pair reaching the nested table
    /// (spec.md §3: "plus a nested per-receiver table reaching the same
    /// four quantities per (primary, receiver) pair"). Called once per
    /// receiver visit along the walk.
    pub fn record_primary_receiver(
        &mut self,
        primary_instance_id: u64,
        key: ReceiverKey,
        irradiance: Float,
        absorptivity_loss: Float,
        reflectivity_loss: Float,
        cosine_loss: Float,
    ) {
        let entry = self.primaries.entry(primary_instance_id).or_default();
        let per_receiver = entry.per_receiver.entry(key).or_default();
        per_receiver.integrated_irradiance.add(irradiance);
        per_receiver.absorptivity_loss.add(absorptivity_loss);
        per_receiver.reflectivity_loss.add(reflectivity_loss);
        per_receiver.cosine_loss.add(cosine_loss);
    }
}

/// The merged, queryable result of a solve (spec.md §3 "Estimator").
#[derive(Default)]
pub struct Estimator {
    n: u64,
    missing: Accumulator,
    shadow: Accumulator,
    receivers: HashMap<ReceiverKey, ReceiverEntry>,
    primaries: HashMap<u64, PrimaryEntry>,
}

impl Estimator {
    pub fn new() -> Self {
        Estimator::default()
    }

    /// Folds every thread's partial table into this one. Merge order does
    /// not affect the result (spec.md §9).
    pub fn merge(&mut self, partial: PartialEstimator) {
        self.n += partial.n;
        self.missing.merge(&partial.missing);
        self.shadow.merge(&partial.shadow);

        for (key, entry) in partial.receivers {
            let target = self.receivers.entry(key).or_default();
            target.totals.merge(&entry.totals);
            if let Some(per_prim) = entry.per_primitive {
                let target_map = target.per_primitive.get_or_insert_with(HashMap::new);
                for (tri, accs) in per_prim {
                    target_map.entry(tri).or_default().merge(&accs);
                }
            }
        }

        for (id, entry) in partial.primaries {
            let target = self.primaries.entry(id).or_default();
            target.totals.merge(&entry.totals);
            for (key, accs) in entry.per_receiver {
                target.per_receiver.entry(key).or_default().merge(&accs);
            }
        }
    }

    pub fn realisation_count(&self) -> u64 {
        self.n
    }

    pub fn global_missing(&self) -> &Accumulator {
        &self.missing
    }

    pub fn global_shadow(&self) -> &Accumulator {
        &self.shadow
    }

    pub fn receiver(&self, instance_id: u64, side: Side) -> Option<&ReceiverAccumulators> {
        self.receivers
            .get(&ReceiverKey { instance_id, side: side.into() })
            .map(|e| &e.totals)
    }

    pub fn receiver_primitive(
        &self,
        instance_id: u64,
        side: Side,
        triangle_index: u32,
    ) -> Option<&ReceiverAccumulators> {
        self.receivers
            .get(&ReceiverKey { instance_id, side: side.into() })?
            .per_primitive
            .as_ref()?
            .get(&triangle_index)
    }

    pub fn primary(&self, instance_id: u64) -> Option<&PrimaryAccumulators> {
        self.primaries.get(&instance_id).map(|e| &e.totals)
    }

    pub fn primary_receiver(
        &self,
        primary_instance_id: u64,
        receiver_instance_id: u64,
        side: Side,
    ) -> Option<&ReceiverAccumulators> {
        self.primaries
            .get(&primary_instance_id)?
            .per_receiver
            .get(&ReceiverKey { instance_id: receiver_instance_id, side: side.into() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_and_standard_error_match_hand_computation() {
        let mut acc = Accumulator::default();
        for w in [1.0f32, 2.0, 3.0, 4.0] {
            acc.add(w);
        }
        assert!((acc.mean(4) - 2.5).abs() < 1e-9);
        let expected_variance = (1.0 + 4.0 + 9.0 + 16.0) / 4.0 - 2.5 * 2.5;
        assert!((acc.variance(4) - expected_variance).abs() < 1e-9);
        assert!((acc.standard_error(4) - (expected_variance / 4.0).sqrt()).abs() < 1e-9);
    }

    #[test]
    fn merge_is_order_independent() {
        let mut partial_a = PartialEstimator::new();
        partial_a.record_realisation();
        partial_a.record_receiver_hit(1, Side::Front, false, 0, 10.0, 1.0, 2.0, 0.5);

        let mut partial_b = PartialEstimator::new();
        partial_b.record_realisation();
        partial_b.record_receiver_hit(1, Side::Front, false, 0, 20.0, 2.0, 3.0, 0.5);

        let mut est1 = Estimator::new();
        est1.merge(partial_a);
        est1.merge(partial_b);

        let mut partial_c = PartialEstimator::new();
        partial_c.record_realisation();
        partial_c.record_receiver_hit(1, Side::Front, false, 0, 20.0, 2.0, 3.0, 0.5);

        let mut partial_d = PartialEstimator::new();
        partial_d.record_realisation();
        partial_d.record_receiver_hit(1, Side::Front, false, 0, 10.0, 1.0, 2.0, 0.5);

        let mut est2 = Estimator::new();
        est2.merge(partial_d);
        est2.merge(partial_c);

        let r1 = est1.receiver(1, Side::Front).unwrap();
        let r2 = est2.receiver(1, Side::Front).unwrap();
        assert!((r1.integrated_irradiance.sum_w - r2.integrated_irradiance.sum_w).abs() < 1e-9);
        assert_eq!(est1.realisation_count(), est2.realisation_count());
    }

    #[test]
    fn per_primitive_table_is_only_populated_when_requested() {
        let mut partial = PartialEstimator::new();
        partial.record_receiver_hit(1, Side::Front, false, 3, 5.0, 0.0, 0.0, 0.0);
        let mut est = Estimator::new();
        est.merge(partial);
        assert!(est.receiver_primitive(1, Side::Front, 3).is_none());

        let mut partial2 = PartialEstimator::new();
        partial2.record_receiver_hit(2, Side::Front, true, 3, 5.0, 0.0, 0.0, 0.0);
        let mut est2 = Estimator::new();
        est2.merge(partial2);
        assert!(est2.receiver_primitive(2, Side::Front, 3).is_some());
    }
}
