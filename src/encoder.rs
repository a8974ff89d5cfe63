//! Randomized synthesis of a single query.
//!
//! Each column independently draws whether it is skipped, compared against a
//! single value, or compared against two values (BETWEEN, IN or NOT-IN).
//! Values are placed near the target record so answers carry signal about it,
//! at grid-aligned distances so differencing between queries stays possible.

use rand::Rng;
use rand::distributions::{Distribution, WeightedIndex};
use rand::seq::SliceRandom;

use crate::config::SyntaxPolicy;
use crate::error::{Result, SearchError};
use crate::query::{Comparison, Condition, Query, TriState};
use crate::schema::{Column, ColumnKind, Schema, TargetRecord};

/// Second IN/NOT-IN value that no column domain contains.
pub const OUT_OF_DOMAIN: f64 = -1_000_000.0;

const ORDERS_OF_MAGNITUDE: [i32; 3] = [-2, -1, 0];
const WIDTH_STEPS: [f64; 3] = [1.0, 2.0, 5.0];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SingleOp {
    Eq,
    Neq,
}

/// How many values a column is compared against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueShape {
    Single(SingleOp),
    Pair,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Targeted {
    Single(f64),
    Pair(f64, f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PairFamily {
    Between,
    In,
    NotIn,
}

pub struct QueryEncoder<'a> {
    schema: &'a Schema,
    target: &'a TargetRecord,
    policy: SyntaxPolicy,
}

impl<'a> QueryEncoder<'a> {
    pub fn new(schema: &'a Schema, target: &'a TargetRecord, policy: SyntaxPolicy) -> Self {
        Self { schema, target, policy }
    }

    pub fn policy(&self) -> SyntaxPolicy {
        self.policy
    }

    /// Synthesizes one query, consuming randomness only from `rng`.
    pub fn encode<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Query> {
        if self.policy.use_limited_syntax_fast_qbs {
            let symbols = (0..self.schema.len())
                .map(|_| TriState::ALL[rng.gen_range(0..TriState::ALL.len())])
                .collect();
            return Ok(Query::Limited(symbols));
        }

        let mut projection = vec![self.schema.identifier().to_owned()];
        let mut comparisons = Vec::new();
        for column in self.schema.columns() {
            let name = column.name();
            let value_count: u8 = rng.gen_range(0..3);
            match value_count {
                0 => continue,
                1 => {
                    let op = if rng.gen_bool(0.5) { SingleOp::Neq } else { SingleOp::Eq };
                    let value = match self.targeting_values(column, ValueShape::Single(op), rng)? {
                        Targeted::Single(v) => v.into(),
                        Targeted::Pair(..) => {
                            return Err(SearchError::Invariant("single comparison got two values".into()));
                        }
                    };
                    let condition = match op {
                        SingleOp::Eq => Condition::Eq(value),
                        SingleOp::Neq => Condition::Neq(value),
                    };
                    comparisons.push(Comparison::new(name, condition));
                }
                2 => {
                    let families = self.pair_families(column);
                    let family = families.choose(rng).copied().ok_or_else(|| {
                        SearchError::Config(format!(
                            "column '{name}' drew a two-value comparison but no operator family is enabled for it"
                        ))
                    })?;
                    match family {
                        PairFamily::Between => match self.targeting_values(column, ValueShape::Pair, rng)? {
                            Targeted::Pair(lo, hi) => {
                                comparisons.push(Comparison::new(name, Condition::Between(lo.into(), hi.into())));
                            }
                            Targeted::Single(_) => {
                                return Err(SearchError::Invariant("range comparison got one value".into()));
                            }
                        },
                        PairFamily::In => {
                            // projected so the matching value is observable in the answer
                            projection.push(name.to_owned());
                            let (first, second) = self.in_values(column, rng)?;
                            comparisons.push(Comparison::new(name, Condition::In(first.into(), second.into())));
                        }
                        PairFamily::NotIn => {
                            let (first, second) = self.in_values(column, rng)?;
                            comparisons.push(Comparison::new(name, Condition::Neq(first.into())));
                            comparisons.push(Comparison::new(name, Condition::Neq(second.into())));
                        }
                    }
                }
                other => {
                    return Err(SearchError::Invariant(format!("unsupported value count {other}")));
                }
            }
        }
        Ok(Query::Select { projection, comparisons })
    }

    fn pair_families(&self, column: &Column) -> Vec<PairFamily> {
        let mut families = Vec::with_capacity(3);
        if self.policy.use_operator_between && column.kind() == ColumnKind::Continuous {
            families.push(PairFamily::Between);
        }
        if self.policy.use_operator_in {
            families.push(PairFamily::In);
        }
        if self.policy.use_neq_multiple_times {
            families.push(PairFamily::NotIn);
        }
        families
    }

    /// Picks the value(s) a numeric comparison on `column` uses.
    pub fn targeting_values<R: Rng + ?Sized>(
        &self,
        column: &Column,
        shape: ValueShape,
        rng: &mut R,
    ) -> Result<Targeted> {
        let center = self.schema.center(column, self.target)?;
        if self.policy.use_target_user_values {
            return Ok(match shape {
                ValueShape::Single(_) => Targeted::Single(center),
                ValueShape::Pair => Targeted::Pair(center, center),
            });
        }

        let order = ORDERS_OF_MAGNITUDE[rng.gen_range(0..ORDERS_OF_MAGNITUDE.len())];
        let width = WIDTH_STEPS[rng.gen_range(0..WIDTH_STEPS.len())] * 10f64.powi(order);
        let offset = grid_offset(center, width);

        Ok(match shape {
            ValueShape::Single(SingleOp::Eq) => Targeted::Single(center),
            ValueShape::Single(SingleOp::Neq) => {
                if rng.gen_bool(0.5) {
                    Targeted::Single(offset)
                } else {
                    Targeted::Single(center)
                }
            }
            ValueShape::Pair => Targeted::Pair(offset, offset + width),
        })
    }

    /// The two values of an IN or NOT-IN comparison: the target's own category,
    /// and either another category drawn by softmax weight or [`OUT_OF_DOMAIN`].
    pub fn in_values<R: Rng + ?Sized>(&self, column: &Column, rng: &mut R) -> Result<(f64, f64)> {
        let first = self.schema.center(column, self.target)?;
        let distribution = column.distribution().ok_or_else(|| {
            SearchError::Schema(format!("column '{}' has no value distribution", column.name()))
        })?;
        let excluded = distribution.position_of(first);

        let mut second = if rng.gen_bool(0.5) {
            OUT_OF_DOMAIN
        } else {
            let others: Vec<(f64, f64)> = distribution
                .entries()
                .iter()
                .enumerate()
                .filter(|(i, _)| Some(*i) != excluded)
                .map(|(_, entry)| *entry)
                .collect();
            if others.is_empty() {
                return Err(SearchError::Schema(format!(
                    "column '{}' has no category other than the target's",
                    column.name()
                )));
            }
            let weights = softmax(&others.iter().map(|(_, w)| *w).collect::<Vec<_>>());
            let picker = WeightedIndex::new(&weights).map_err(|e| SearchError::Schema(e.to_string()))?;
            others[picker.sample(rng)].0
        };
        if self.policy.use_target_user_values {
            second = first;
        }
        Ok((first, second))
    }
}

/// Grid point closest to `center`, from two grids of pitch `2 * width`:
/// one through zero and one shifted by `width / 2`. Ties go to the shifted grid.
pub fn grid_offset(center: f64, width: f64) -> f64 {
    let aligned = (center / (2.0 * width)).round_ties_even() * 2.0 * width;
    let k = ((2.0 * center - width) / (4.0 * width)).round_ties_even();
    let shifted = width * (2.0 * k + 0.5);
    if (center - aligned).abs() < (center - shifted).abs() { aligned } else { shifted }
}

/// Softmax with the maximum subtracted before exponentiating.
pub fn softmax(x: &[f64]) -> Vec<f64> {
    let max = x.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = x.iter().map(|v| (v - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}
