//! Operator lowering: declarative query operators to primitive jobs.
//!
//! Each [`Operator`] variant lowers to exactly one primitive
//! [`MapReduceJob`] through a static match, one handler per variant. The
//! resulting job list is what the fusion pass folds into physical jobs;
//! [`plan`] runs both steps.
//!
//! Phase shapes produced by lowering:
//! - `Select` / `Filter` / `Take` / `Join` — map only
//! - `GroupBy` — map (rekey) + reduce (materialize groups)
//! - `Aggregate` — combine (partial) + reduce (finalize)
//! - `Distinct` — map + combine + reduce (group-based dedup)

pub mod aggregate;

pub use aggregate::AggregateFunction;

use crate::fusestream::pipeline::error::{PipelineError, PipelineResult};
use crate::fusestream::pipeline::execution::types::{FieldValue, Pair};
use crate::fusestream::pipeline::fusion::fuse;
use crate::fusestream::pipeline::job::{MapReduceJob, Transform};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Per-record projection; may emit zero, one or many output pairs.
pub type ProjectFn = Arc<dyn Fn(Pair) -> PipelineResult<Vec<Pair>> + Send + Sync>;

/// Per-record predicate for `Filter`.
pub type PredicateFn = Arc<dyn Fn(&Pair) -> PipelineResult<bool> + Send + Sync>;

/// Key extractor for `GroupBy`.
pub type KeyFn = Arc<dyn Fn(&Pair) -> PipelineResult<FieldValue> + Send + Sync>;

/// The closed set of supported query operators.
pub enum Operator {
    /// Project each record into zero or more records
    Select(ProjectFn),
    /// Keep records the predicate accepts
    Filter(PredicateFn),
    /// Re-key records and materialize each key's values as an array
    GroupBy(KeyFn),
    /// Map-side join against a materialized right-hand side; the only join
    /// shape expressible in a linear single-input pipeline
    Join { right: Vec<Pair> },
    /// Keep at most the first `n` records of the partition batch
    Take(usize),
    /// Aggregate each key's values with a combinable function
    Aggregate(AggregateFunction),
    /// Drop duplicate records via group-based dedup
    Distinct,
}

impl fmt::Debug for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operator::Select(_) => write!(f, "Select"),
            Operator::Filter(_) => write!(f, "Filter"),
            Operator::GroupBy(_) => write!(f, "GroupBy"),
            Operator::Join { right } => write!(f, "Join({} right records)", right.len()),
            Operator::Take(n) => write!(f, "Take({})", n),
            Operator::Aggregate(agg) => write!(f, "Aggregate({:?})", agg),
            Operator::Distinct => write!(f, "Distinct"),
        }
    }
}

impl Operator {
    pub fn select<F>(f: F) -> Self
    where
        F: Fn(Pair) -> PipelineResult<Vec<Pair>> + Send + Sync + 'static,
    {
        Operator::Select(Arc::new(f))
    }

    pub fn filter<F>(f: F) -> Self
    where
        F: Fn(&Pair) -> PipelineResult<bool> + Send + Sync + 'static,
    {
        Operator::Filter(Arc::new(f))
    }

    pub fn group_by<F>(f: F) -> Self
    where
        F: Fn(&Pair) -> PipelineResult<FieldValue> + Send + Sync + 'static,
    {
        Operator::GroupBy(Arc::new(f))
    }
}

/// Lower every operator to its primitive job, one job per operator.
pub fn lower(operators: &[Operator]) -> PipelineResult<Vec<MapReduceJob>> {
    operators.iter().map(lower_operator).collect()
}

/// Lower and fuse: the full compilation path from operator chain to
/// physical job list.
pub fn plan(operators: &[Operator]) -> PipelineResult<Vec<MapReduceJob>> {
    let jobs = lower(operators)?;
    log::debug!(
        "lowered {} operators into {} primitive jobs",
        operators.len(),
        jobs.len()
    );
    Ok(fuse(jobs))
}

fn lower_operator(operator: &Operator) -> PipelineResult<MapReduceJob> {
    match operator {
        Operator::Select(project) => {
            let project = Arc::clone(project);
            Ok(MapReduceJob::map_only(Transform::batch(move |pairs| {
                let mut out = Vec::with_capacity(pairs.len());
                for pair in pairs {
                    out.extend(project(pair)?);
                }
                Ok(out)
            })))
        }
        Operator::Filter(predicate) => {
            let predicate = Arc::clone(predicate);
            Ok(MapReduceJob::map_only(Transform::batch(move |pairs| {
                let mut out = Vec::with_capacity(pairs.len());
                for pair in pairs {
                    if predicate(&pair)? {
                        out.push(pair);
                    }
                }
                Ok(out)
            })))
        }
        Operator::Take(limit) => {
            // Whole-partition batch semantics are exactly what makes a
            // bounded take expressible as a map.
            let limit = *limit;
            Ok(MapReduceJob::map_only(Transform::batch(move |mut pairs| {
                pairs.truncate(limit);
                Ok(pairs)
            })))
        }
        Operator::Join { right } => {
            // The joined row is a two-field struct, not an array: the left
            // and right payload types may differ, and a struct carries one
            // schema per field where a list carries one for all elements.
            let right = right.clone();
            Ok(MapReduceJob::map_only(Transform::batch(move |pairs| {
                let mut out = Vec::new();
                for (key, value) in pairs {
                    for (right_key, right_value) in &right {
                        if *right_key == key {
                            let mut joined = HashMap::with_capacity(2);
                            joined.insert("left".to_string(), value.clone());
                            joined.insert("right".to_string(), right_value.clone());
                            out.push((key.clone(), FieldValue::Struct(joined)));
                        }
                    }
                }
                Ok(out)
            })))
        }
        Operator::GroupBy(key_fn) => {
            let key_fn = Arc::clone(key_fn);
            let rekey = Transform::batch(move |pairs| {
                let mut out = Vec::with_capacity(pairs.len());
                for pair in pairs {
                    let key = key_fn(&pair)?;
                    out.push((key, pair.1));
                }
                Ok(out)
            });
            let materialize = Transform::grouped(|groups| {
                Ok(groups
                    .map(|group| (group.key, FieldValue::Array(group.values)))
                    .collect())
            });
            MapReduceJob::new(Some(rekey), None, Some(materialize))
        }
        Operator::Aggregate(function) => {
            let partial_fn = *function;
            let combine = Transform::grouped(move |groups| {
                let mut out = Vec::new();
                for group in groups {
                    let partial = partial_fn.partial(&group.values)?;
                    out.push((group.key, partial));
                }
                Ok(out)
            });
            let finalize_fn = *function;
            let reduce = Transform::grouped(move |groups| {
                let mut out = Vec::new();
                for group in groups {
                    let merged = finalize_fn.finalize(&group.values)?;
                    out.push((group.key, merged));
                }
                Ok(out)
            });
            MapReduceJob::new(None, Some(combine), Some(reduce))
        }
        Operator::Distinct => {
            // Re-key by the whole record so equal records cluster; one
            // record per group survives. The composite key is a struct so
            // the key and value halves keep their own schemas, and the
            // placeholder value is a boolean because null carries no shape
            // the wire codec could derive.
            let rekey = Transform::batch(|pairs| {
                Ok(pairs
                    .into_iter()
                    .map(|(key, value)| {
                        let mut record = HashMap::with_capacity(2);
                        record.insert("k".to_string(), key);
                        record.insert("v".to_string(), value);
                        (FieldValue::Struct(record), FieldValue::Boolean(true))
                    })
                    .collect())
            });
            let combine = Transform::grouped(|groups| {
                Ok(groups
                    .map(|group| (group.key, FieldValue::Boolean(true)))
                    .collect())
            });
            let unkey = Transform::grouped(|groups| {
                let mut out = Vec::new();
                for group in groups {
                    match group.key {
                        FieldValue::Struct(mut record) => {
                            match (record.remove("k"), record.remove("v")) {
                                (Some(key), Some(value)) => out.push((key, value)),
                                _ => {
                                    return Err(PipelineError::transformation(
                                        "distinct composite key is missing its fields",
                                    ))
                                }
                            }
                        }
                        other => {
                            return Err(PipelineError::transformation(format!(
                                "distinct expects composite keys, got {}",
                                other.type_name()
                            )))
                        }
                    }
                }
                Ok(out)
            });
            MapReduceJob::new(Some(rekey), Some(combine), Some(unkey))
        }
    }
}
