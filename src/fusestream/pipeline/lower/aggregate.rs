//! Aggregate function kinds used by operator lowering.
//!
//! Each function splits into a combine-side partial over raw group values and
//! a reduce-side finalize over partial states, so the fused job can shrink
//! data locally before the shuffle. Avg is the one function whose partial is
//! not its own final shape: it carries a sum/count struct until finalize.

use crate::fusestream::pipeline::error::{PipelineError, PipelineResult};
use crate::fusestream::pipeline::execution::types::FieldValue;
use std::collections::HashMap;

/// Supported aggregate functions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunction {
    Count,
    Sum,
    Min,
    Max,
    Avg,
}

impl AggregateFunction {
    /// Combine-side partial aggregation over one group's raw values.
    pub fn partial(&self, values: &[FieldValue]) -> PipelineResult<FieldValue> {
        match self {
            AggregateFunction::Count => Ok(FieldValue::Integer(values.len() as i64)),
            AggregateFunction::Sum => numeric_sum(values),
            AggregateFunction::Min => extremum(values, std::cmp::Ordering::Less),
            AggregateFunction::Max => extremum(values, std::cmp::Ordering::Greater),
            AggregateFunction::Avg => {
                let sum = float_sum(values)?;
                let mut state = HashMap::with_capacity(2);
                state.insert("sum".to_string(), FieldValue::Float(sum));
                state.insert(
                    "count".to_string(),
                    FieldValue::Integer(values.len() as i64),
                );
                Ok(FieldValue::Struct(state))
            }
        }
    }

    /// Reduce-side merge of partial states into the final value.
    pub fn finalize(&self, partials: &[FieldValue]) -> PipelineResult<FieldValue> {
        match self {
            AggregateFunction::Count | AggregateFunction::Sum => numeric_sum(partials),
            AggregateFunction::Min => extremum(partials, std::cmp::Ordering::Less),
            AggregateFunction::Max => extremum(partials, std::cmp::Ordering::Greater),
            AggregateFunction::Avg => {
                let mut total = 0.0f64;
                let mut count = 0i64;
                for partial in partials {
                    let state = match partial {
                        FieldValue::Struct(state) => state,
                        other => {
                            return Err(PipelineError::transformation(format!(
                                "avg expects sum/count partial states, got {}",
                                other.type_name()
                            )))
                        }
                    };
                    total += state
                        .get("sum")
                        .and_then(FieldValue::as_float)
                        .ok_or_else(|| {
                            PipelineError::transformation("avg partial state is missing 'sum'")
                        })?;
                    count += state
                        .get("count")
                        .and_then(|v| v.as_integer())
                        .ok_or_else(|| {
                            PipelineError::transformation("avg partial state is missing 'count'")
                        })?;
                }
                if count == 0 {
                    return Err(PipelineError::transformation(
                        "avg over zero values is undefined",
                    ));
                }
                Ok(FieldValue::Float(total / count as f64))
            }
        }
    }
}

/// Sum that stays integral while it can and widens to float otherwise.
fn numeric_sum(values: &[FieldValue]) -> PipelineResult<FieldValue> {
    let all_integers = values.iter().all(|v| matches!(v, FieldValue::Integer(_)));
    if all_integers {
        let mut sum = 0i64;
        for value in values {
            if let FieldValue::Integer(i) = value {
                sum += i;
            }
        }
        return Ok(FieldValue::Integer(sum));
    }
    Ok(FieldValue::Float(float_sum(values)?))
}

fn float_sum(values: &[FieldValue]) -> PipelineResult<f64> {
    let mut sum = 0.0f64;
    for value in values {
        sum += value.as_float().ok_or_else(|| {
            PipelineError::transformation(format!(
                "cannot sum non-numeric value of type {}",
                value.type_name()
            ))
        })?;
    }
    Ok(sum)
}

fn extremum(values: &[FieldValue], wanted: std::cmp::Ordering) -> PipelineResult<FieldValue> {
    let mut best: Option<&FieldValue> = None;
    for value in values {
        best = match best {
            None => Some(value),
            Some(current) => {
                if compare(value, current)? == wanted {
                    Some(value)
                } else {
                    Some(current)
                }
            }
        };
    }
    best.cloned().ok_or_else(|| {
        PipelineError::transformation("min/max over zero values is undefined")
    })
}

/// Orders two values of compatible types; numerics widen, strings compare
/// lexicographically.
fn compare(a: &FieldValue, b: &FieldValue) -> PipelineResult<std::cmp::Ordering> {
    if let (Some(x), Some(y)) = (a.as_float(), b.as_float()) {
        return x.partial_cmp(&y).ok_or_else(|| {
            PipelineError::transformation("cannot order NaN values")
        });
    }
    if let (FieldValue::String(x), FieldValue::String(y)) = (a, b) {
        return Ok(x.cmp(y));
    }
    Err(PipelineError::transformation(format!(
        "cannot order {} against {}",
        a.type_name(),
        b.type_name()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ints(values: &[i64]) -> Vec<FieldValue> {
        values.iter().map(|i| FieldValue::Integer(*i)).collect()
    }

    #[test]
    fn count_partials_sum_at_finalize() {
        let agg = AggregateFunction::Count;
        let p1 = agg.partial(&ints(&[1, 2, 3])).expect("partial");
        let p2 = agg.partial(&ints(&[4])).expect("partial");
        assert_eq!(
            agg.finalize(&[p1, p2]).expect("finalize"),
            FieldValue::Integer(4)
        );
    }

    #[test]
    fn sum_stays_integral_for_integer_input() {
        let agg = AggregateFunction::Sum;
        assert_eq!(
            agg.partial(&ints(&[1, 2, 3])).expect("partial"),
            FieldValue::Integer(6)
        );
    }

    #[test]
    fn avg_carries_sum_and_count_through_partials() {
        let agg = AggregateFunction::Avg;
        let p1 = agg.partial(&ints(&[1, 2])).expect("partial");
        let p2 = agg.partial(&ints(&[6])).expect("partial");
        assert_eq!(
            agg.finalize(&[p1, p2]).expect("finalize"),
            FieldValue::Float(3.0)
        );
    }

    #[test]
    fn min_orders_strings_lexicographically() {
        let agg = AggregateFunction::Min;
        let values = vec![
            FieldValue::String("pear".to_string()),
            FieldValue::String("apple".to_string()),
        ];
        assert_eq!(
            agg.partial(&values).expect("partial"),
            FieldValue::String("apple".to_string())
        );
    }

    #[test]
    fn sum_of_non_numeric_fails() {
        let agg = AggregateFunction::Sum;
        let result = agg.partial(&[FieldValue::Boolean(true)]);
        assert!(matches!(
            result,
            Err(PipelineError::TransformationError { .. })
        ));
    }
}
