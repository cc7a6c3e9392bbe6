//! Greedy pipeline fusion.
//!
//! A single left-to-right pass over the lowered job list, merging each next
//! job into a running accumulator whenever a fusion rule applies. Greedy,
//! adjacent-only fusion is a deliberate trade-off: it cannot look ahead to
//! decide that skipping a merge would yield fewer jobs overall, and accepts
//! that in exchange for a one-pass algorithm.

use crate::fusestream::pipeline::job::MapReduceJob;

/// Fold a lowered job list into the smallest job list the greedy pass finds.
///
/// Jobs that do not fuse stay separate physical units; the shuffle/sort
/// boundary between them is owned by the surrounding infrastructure.
pub fn fuse(jobs: Vec<MapReduceJob>) -> Vec<MapReduceJob> {
    let mut iter = jobs.into_iter();
    let mut accumulator = match iter.next() {
        Some(first) => first,
        None => return Vec::new(),
    };

    let mut fused = Vec::new();
    for next in iter {
        match accumulator.try_merge(&next) {
            Some(merged) => accumulator = merged,
            None => {
                log::debug!(
                    "no fusion rule applies between {:?} and {:?}; emitting physical job",
                    accumulator,
                    next
                );
                fused.push(accumulator);
                accumulator = next;
            }
        }
    }
    fused.push(accumulator);
    fused
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fusestream::pipeline::job::{Phase, Transform};

    fn map_job() -> MapReduceJob {
        MapReduceJob::map_only(Transform::batch(Ok))
    }

    fn reduce_job() -> MapReduceJob {
        MapReduceJob::reduce_only(Transform::grouped(|groups| {
            Ok(groups.map(|g| (g.key, g.values.into_iter().next().unwrap())).collect())
        }))
    }

    #[test]
    fn empty_pipeline_fuses_to_nothing() {
        assert!(fuse(Vec::new()).is_empty());
    }

    #[test]
    fn map_then_reduce_fuses_into_one_job() {
        let fused = fuse(vec![map_job(), reduce_job()]);
        assert_eq!(fused.len(), 1);
        assert_eq!(fused[0].phases(), vec![Phase::Map, Phase::Reduce]);
    }

    #[test]
    fn reduce_then_map_combine_keeps_the_boundary() {
        // Neither rule matches: the second job starts at Map after a Reduce,
        // and it declares more than a lone map slot.
        let blocked = MapReduceJob::new(
            Some(Transform::batch(Ok)),
            Some(Transform::grouped(|groups| {
                Ok(groups.map(|g| (g.key, g.values.into_iter().next().unwrap())).collect())
            })),
            None,
        )
        .expect("valid job");
        let fused = fuse(vec![reduce_job(), blocked]);
        assert_eq!(fused.len(), 2);
    }

    #[test]
    fn greedy_pass_is_left_to_right() {
        // map, reduce, map: first two fuse, trailing map folds back into
        // the fused job's reduce slot via pushback.
        let fused = fuse(vec![map_job(), reduce_job(), map_job()]);
        assert_eq!(fused.len(), 1);
        assert_eq!(fused[0].phases(), vec![Phase::Map, Phase::Reduce]);
    }
}
