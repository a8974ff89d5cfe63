//! Structured queries and their canonical rendering.
//!
//! A [`Query`] is its own identity: the answer cache is keyed by the
//! structured form, and the SQL text produced by `Display` is only what an
//! evaluator transmits to a query-based system.

// used to give numeric literals a total order and a stable hash
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

// used to print out readable forms of a query
use std::fmt;

use serde::{Deserialize, Serialize};

/// Table name every textual query selects from.
pub const TABLE: &str = "data";

// ------------- Value -------------
/// A numeric literal. `-0.0` is folded into `0.0` so equal renderings
/// never produce distinct cache keys.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(from = "f64", into = "f64")]
pub struct Value(f64);

impl Value {
    pub fn new(value: f64) -> Self {
        Self(if value == 0.0 { 0.0 } else { value })
    }
    pub fn get(&self) -> f64 {
        self.0
    }
}
impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::new(value)
    }
}
impl From<Value> for f64 {
    fn from(value: Value) -> Self {
        value.0
    }
}
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}
impl Eq for Value {}
impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}
impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}
impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", format_significant(self.0, 7))
    }
}

/// Formats like C's `%.{digits}g`: the shorter of fixed and exponent
/// notation, trailing zeros removed.
pub fn format_significant(value: f64, digits: usize) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    if value == 0.0 {
        return "0".to_owned();
    }
    let digits = digits.max(1);
    // rounding to the requested precision decides the exponent, e.g. 9999999.5 -> 1e+07
    let scientific = format!("{:.*e}", digits - 1, value);
    let (mantissa, exponent) = match scientific.split_once('e') {
        Some((m, e)) => (m.to_owned(), e.parse::<i32>().unwrap_or(0)),
        None => (scientific.clone(), 0),
    };
    if exponent < -4 || exponent >= digits as i32 {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", trim_fraction(&mantissa), sign, exponent.abs())
    } else {
        let decimals = (digits as i32 - 1 - exponent).max(0) as usize;
        trim_fraction(&format!("{:.*}", decimals, value)).to_owned()
    }
}

fn trim_fraction(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

// ------------- Comparison -------------
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Condition {
    Eq(Value),
    Neq(Value),
    Between(Value, Value),
    In(Value, Value),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Comparison {
    column: String,
    condition: Condition,
}

impl Comparison {
    pub fn new(column: impl Into<String>, condition: Condition) -> Self {
        Self { column: column.into(), condition }
    }
    pub fn column(&self) -> &str {
        &self.column
    }
    pub fn condition(&self) -> &Condition {
        &self.condition
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let c = &self.column;
        match &self.condition {
            Condition::Eq(v) => write!(f, "{c} = {v}"),
            Condition::Neq(v) => write!(f, "{c} != {v}"),
            Condition::Between(lo, hi) => write!(f, "{c} BETWEEN {lo} AND {hi}"),
            Condition::In(a, b) => write!(f, "{c} IN ({a}, {b})"),
        }
    }
}

// ------------- Query -------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TriState {
    Minus,
    Zero,
    Plus,
}

impl TriState {
    pub const ALL: [TriState; 3] = [TriState::Minus, TriState::Zero, TriState::Plus];

    pub fn as_i8(&self) -> i8 {
        match self {
            TriState::Minus => -1,
            TriState::Zero => 0,
            TriState::Plus => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Textual,
    TriState,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Query {
    /// `SELECT projection FROM data WHERE c1 and c2 ...`
    Select {
        projection: Vec<String>,
        comparisons: Vec<Comparison>,
    },
    /// One symbol per column, for systems that take vectorized predicates.
    Limited(Vec<TriState>),
}

impl Query {
    pub fn encoding(&self) -> Encoding {
        match self {
            Query::Select { .. } => Encoding::Textual,
            Query::Limited(_) => Encoding::TriState,
        }
    }
    pub fn comparisons(&self) -> &[Comparison] {
        match self {
            Query::Select { comparisons, .. } => comparisons,
            Query::Limited(_) => &[],
        }
    }
    pub fn projection(&self) -> &[String] {
        match self {
            Query::Select { projection, .. } => projection,
            Query::Limited(_) => &[],
        }
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Query::Select { projection, comparisons } => {
                write!(f, "SELECT {} FROM {TABLE}", projection.join(", "))?;
                for (i, comparison) in comparisons.iter().enumerate() {
                    let joiner = if i == 0 { " WHERE " } else { " and " };
                    write!(f, "{joiner}{comparison}")?;
                }
                Ok(())
            }
            Query::Limited(symbols) => {
                let rendered: Vec<String> = symbols.iter().map(|s| s.as_i8().to_string()).collect();
                write!(f, "({})", rendered.join(", "))
            }
        }
    }
}
