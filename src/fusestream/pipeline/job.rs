//! The physical job model: a typed bundle of optional map / combine / reduce
//! transformation slots, plus the two fusion rules that merge adjacent jobs.
//!
//! Jobs are immutable once constructed; merging always builds a new job from
//! composed slots. A job must declare at least one phase.

use crate::fusestream::pipeline::error::{PipelineError, PipelineResult};
use crate::fusestream::pipeline::execution::grouping::{Group, GroupIterator};
use crate::fusestream::pipeline::execution::types::Pair;
use std::fmt;
use std::sync::Arc;

/// One of the three roles in a shuffle-based batch pipeline.
///
/// The derived order (`Map < Combine < Reduce`) is what the sequential
/// fusion rule compares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    Map,
    Combine,
    Reduce,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Map => write!(f, "Map"),
            Phase::Combine => write!(f, "Combine"),
            Phase::Reduce => write!(f, "Reduce"),
        }
    }
}

/// Batch transformation: sees the whole partition at once, which is what
/// makes stateful batch operators like bounded `take` expressible.
pub type BatchFn = Arc<dyn Fn(Vec<Pair>) -> PipelineResult<Vec<Pair>> + Send + Sync>;

/// Grouped transformation: consumes the lazy, single-pass group sequence
/// produced by the grouping reconstructor.
pub type GroupFn =
    Arc<dyn Fn(&mut dyn Iterator<Item = Group>) -> PipelineResult<Vec<Pair>> + Send + Sync>;

/// A transformation slot value.
///
/// `Batch` is the shape of map slots; `Grouped` is the shape of combine and
/// reduce slots. Cloning is cheap (shared `Arc`).
#[derive(Clone)]
pub enum Transform {
    Batch(BatchFn),
    Grouped(GroupFn),
}

impl fmt::Debug for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transform::Batch(_) => write!(f, "Transform::Batch"),
            Transform::Grouped(_) => write!(f, "Transform::Grouped"),
        }
    }
}

impl Transform {
    pub fn batch<F>(f: F) -> Self
    where
        F: Fn(Vec<Pair>) -> PipelineResult<Vec<Pair>> + Send + Sync + 'static,
    {
        Transform::Batch(Arc::new(f))
    }

    pub fn grouped<F>(f: F) -> Self
    where
        F: Fn(&mut dyn Iterator<Item = Group>) -> PipelineResult<Vec<Pair>> + Send + Sync + 'static,
    {
        Transform::Grouped(Arc::new(f))
    }

    /// Apply the transformation to a decoded pair sequence.
    ///
    /// A grouped transformation sees the pairs re-grouped by key adjacency;
    /// the grouping is lazy and single-pass.
    pub fn apply(&self, pairs: Vec<Pair>) -> PipelineResult<Vec<Pair>> {
        self.apply_stream(pairs.into_iter())
    }

    /// Apply the transformation to a pair stream without materializing it
    /// first. A batch transformation collects the stream (it needs the whole
    /// partition anyway); a grouped transformation pulls pairs one group at
    /// a time, so only the current group is ever held in memory.
    pub fn apply_stream<I>(&self, pairs: I) -> PipelineResult<Vec<Pair>>
    where
        I: Iterator<Item = Pair>,
    {
        match self {
            Transform::Batch(f) => f(pairs.collect()),
            Transform::Grouped(f) => {
                let mut groups = GroupIterator::new(pairs);
                f(&mut groups)
            }
        }
    }

    /// Pipe `self`'s output into `next`'s input.
    ///
    /// The composed transformation keeps `self`'s input shape. When `next`
    /// is grouped, the intermediate pairs are re-grouped by key adjacency
    /// before `next` consumes them; compatibility of the payloads is the
    /// caller's precondition and is not re-validated here.
    pub fn compose(&self, next: &Transform) -> Transform {
        let next = next.clone();
        match self {
            Transform::Batch(f) => {
                let f = Arc::clone(f);
                Transform::batch(move |pairs| next.apply(f(pairs)?))
            }
            Transform::Grouped(f) => {
                let f = Arc::clone(f);
                Transform::grouped(move |groups| next.apply(f(groups)?))
            }
        }
    }
}

/// If either side is absent, the other survives; otherwise pipe `first`'s
/// output as `next`'s single input.
fn compose_optional(first: &Option<Transform>, next: &Option<Transform>) -> Option<Transform> {
    match (first, next) {
        (Some(a), Some(b)) => Some(a.compose(b)),
        (Some(a), None) => Some(a.clone()),
        (None, Some(b)) => Some(b.clone()),
        (None, None) => None,
    }
}

/// One physical pipeline stage: up to three transformation slots, each
/// independently present, with at least one present.
#[derive(Clone)]
pub struct MapReduceJob {
    map: Option<Transform>,
    combine: Option<Transform>,
    reduce: Option<Transform>,
}

impl fmt::Debug for MapReduceJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapReduceJob")
            .field("phases", &self.phases())
            .finish()
    }
}

impl MapReduceJob {
    /// Build a job from explicit slots. A job with no phase at all is a
    /// programming error and rejected as `InvalidConfiguration`.
    pub fn new(
        map: Option<Transform>,
        combine: Option<Transform>,
        reduce: Option<Transform>,
    ) -> PipelineResult<Self> {
        if map.is_none() && combine.is_none() && reduce.is_none() {
            return Err(PipelineError::invalid_configuration(
                "a job must declare at least one phase",
            ));
        }
        Ok(MapReduceJob {
            map,
            combine,
            reduce,
        })
    }

    /// Internal constructor for slots known to be non-empty (merge results).
    fn from_slots(
        map: Option<Transform>,
        combine: Option<Transform>,
        reduce: Option<Transform>,
    ) -> Self {
        debug_assert!(map.is_some() || combine.is_some() || reduce.is_some());
        MapReduceJob {
            map,
            combine,
            reduce,
        }
    }

    pub fn map_only(map: Transform) -> Self {
        Self::from_slots(Some(map), None, None)
    }

    pub fn combine_only(combine: Transform) -> Self {
        Self::from_slots(None, Some(combine), None)
    }

    pub fn reduce_only(reduce: Transform) -> Self {
        Self::from_slots(None, None, Some(reduce))
    }

    /// The transformation declared for `phase`, if any.
    pub fn transform(&self, phase: Phase) -> Option<&Transform> {
        match phase {
            Phase::Map => self.map.as_ref(),
            Phase::Combine => self.combine.as_ref(),
            Phase::Reduce => self.reduce.as_ref(),
        }
    }

    /// The declared phase set, in phase order. Never empty.
    pub fn phases(&self) -> Vec<Phase> {
        let mut phases = Vec::with_capacity(3);
        if self.map.is_some() {
            phases.push(Phase::Map);
        }
        if self.combine.is_some() {
            phases.push(Phase::Combine);
        }
        if self.reduce.is_some() {
            phases.push(Phase::Reduce);
        }
        phases
    }

    pub fn declares(&self, phase: Phase) -> bool {
        self.transform(phase).is_some()
    }

    fn min_phase(&self) -> Phase {
        // Non-empty invariant: some slot is always present.
        if self.map.is_some() {
            Phase::Map
        } else if self.combine.is_some() {
            Phase::Combine
        } else {
            Phase::Reduce
        }
    }

    fn max_phase(&self) -> Phase {
        if self.reduce.is_some() {
            Phase::Reduce
        } else if self.combine.is_some() {
            Phase::Combine
        } else {
            Phase::Map
        }
    }

    /// Attempt to merge `next` into `self`, producing a new job.
    ///
    /// Two rules are tried in order; `None` means the jobs stay separate
    /// physical units with a shuffle boundary between them. A failed match
    /// is a normal outcome, never an error.
    pub fn try_merge(&self, next: &MapReduceJob) -> Option<MapReduceJob> {
        // Rule 1: sequential phase-range merge. When every phase of `self`
        // runs no later than every phase of `next`, the two run back to back
        // inside one physical job with no phase reordering.
        if self.max_phase() <= next.min_phase() {
            log::debug!(
                "fusing {:?} with {:?} via sequential phase-range merge",
                self.phases(),
                next.phases()
            );
            return Some(MapReduceJob::from_slots(
                compose_optional(&self.map, &next.map),
                compose_optional(&self.combine, &next.combine),
                compose_optional(&self.reduce, &next.reduce),
            ));
        }

        // Rule 2: map-after-reduce pushback. A reduce's output partition can
        // be re-mapped locally without another shuffle, so a trailing
        // map-only job folds into the reduce slot.
        if self.declares(Phase::Reduce) && next.phases() == [Phase::Map] {
            log::debug!(
                "fusing {:?} with map-only job via reduce pushback",
                self.phases()
            );
            return Some(MapReduceJob::from_slots(
                self.map.clone(),
                self.combine.clone(),
                compose_optional(&self.reduce, &next.map),
            ));
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fusestream::pipeline::execution::types::FieldValue;

    fn identity_batch() -> Transform {
        Transform::batch(Ok)
    }

    fn counting_grouped() -> Transform {
        Transform::grouped(|groups| {
            Ok(groups
                .map(|g| (g.key, FieldValue::Integer(g.values.len() as i64)))
                .collect())
        })
    }

    #[test]
    fn empty_job_is_invalid_configuration() {
        let result = MapReduceJob::new(None, None, None);
        assert!(matches!(
            result,
            Err(PipelineError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn phase_order_is_map_combine_reduce() {
        assert!(Phase::Map < Phase::Combine);
        assert!(Phase::Combine < Phase::Reduce);
    }

    #[test]
    fn phases_reports_declared_slots_in_order() {
        let job = MapReduceJob::new(Some(identity_batch()), None, Some(counting_grouped()))
            .expect("valid job");
        assert_eq!(job.phases(), vec![Phase::Map, Phase::Reduce]);
        assert!(job.declares(Phase::Map));
        assert!(!job.declares(Phase::Combine));
    }

    #[test]
    fn grouped_apply_regroups_by_adjacency() {
        let transform = counting_grouped();
        let pairs = vec![
            (FieldValue::Integer(1), FieldValue::String("a".into())),
            (FieldValue::Integer(1), FieldValue::String("b".into())),
            (FieldValue::Integer(2), FieldValue::String("c".into())),
        ];
        let out = transform.apply(pairs).expect("transform");
        assert_eq!(
            out,
            vec![
                (FieldValue::Integer(1), FieldValue::Integer(2)),
                (FieldValue::Integer(2), FieldValue::Integer(1)),
            ]
        );
    }

    #[test]
    fn composed_batch_pipes_left_to_right() {
        let double = Transform::batch(|pairs: Vec<Pair>| {
            Ok(pairs
                .into_iter()
                .map(|(k, v)| {
                    let doubled = v.as_integer().unwrap_or(0) * 2;
                    (k, FieldValue::Integer(doubled))
                })
                .collect())
        });
        let increment = Transform::batch(|pairs: Vec<Pair>| {
            Ok(pairs
                .into_iter()
                .map(|(k, v)| {
                    let bumped = v.as_integer().unwrap_or(0) + 1;
                    (k, FieldValue::Integer(bumped))
                })
                .collect())
        });
        let composed = double.compose(&increment);
        let out = composed
            .apply(vec![(FieldValue::Integer(0), FieldValue::Integer(5))])
            .expect("composed transform");
        // double first, then increment
        assert_eq!(out[0].1, FieldValue::Integer(11));
    }
}
