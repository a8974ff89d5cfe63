// used for the ordered column list and the lookups by name
use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SearchError};

pub const DEFAULT_IDENTIFIER: &str = "id";
pub const DEFAULT_SENSITIVE: &str = "sens";
/// The target's value for the sensitive column is never known, so it is probed as this.
pub const SENSITIVE_SENTINEL: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnKind {
    Continuous,
    Discrete,
}

/// Observed values of a column with their weights. Insertion order is kept,
/// since sampling excludes the target's category by position.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValueDistribution {
    entries: Vec<(f64, f64)>,
}

impl ValueDistribution {
    pub fn new(entries: Vec<(f64, f64)>) -> Self {
        Self { entries }
    }
    pub fn entries(&self) -> &[(f64, f64)] {
        &self.entries
    }
    pub fn len(&self) -> usize {
        self.entries.len()
    }
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
    /// Position of `value`, but only when it occurs exactly once.
    pub fn position_of(&self, value: f64) -> Option<usize> {
        let mut found = self.entries.iter().enumerate().filter(|(_, (v, _))| *v == value);
        match (found.next(), found.next()) {
            (Some((i, _)), None) => Some(i),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    name: String,
    kind: ColumnKind,
    distribution: Option<ValueDistribution>,
}

impl Column {
    pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
        Self { name: name.into(), kind, distribution: None }
    }
    pub fn with_distribution(mut self, distribution: ValueDistribution) -> Self {
        self.distribution = Some(distribution);
        self
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn kind(&self) -> ColumnKind {
        self.kind
    }
    pub fn is_continuous(&self) -> bool {
        self.kind == ColumnKind::Continuous
    }
    pub fn distribution(&self) -> Option<&ValueDistribution> {
        self.distribution.as_ref()
    }
}

/// The record whose presence or attributes the search probes for.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetRecord {
    values: HashMap<String, f64>,
}

impl TargetRecord {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with(mut self, column: impl Into<String>, value: f64) -> Self {
        self.values.insert(column.into(), value);
        self
    }
    pub fn get(&self, column: &str) -> Option<f64> {
        self.values.get(column).copied()
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for TargetRecord {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        Self { values: iter.into_iter().map(|(k, v)| (k.into(), v)).collect() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    columns: Vec<Column>,
    identifier: String,
    sensitive: String,
}

impl Schema {
    pub fn new(columns: Vec<Column>) -> Self {
        Self {
            columns,
            identifier: DEFAULT_IDENTIFIER.to_owned(),
            sensitive: DEFAULT_SENSITIVE.to_owned(),
        }
    }

    /// Builds a schema from the loose inputs a caller typically holds:
    /// an ordered name list, the continuous subset, and per-column value weights.
    pub fn from_parts(
        column_names: &[&str],
        continuous_columns: &HashSet<String>,
        mut aux_value_probabilities: HashMap<String, ValueDistribution>,
    ) -> Self {
        let columns = column_names
            .iter()
            .map(|name| {
                let kind = if continuous_columns.contains(*name) {
                    ColumnKind::Continuous
                } else {
                    ColumnKind::Discrete
                };
                let column = Column::new(*name, kind);
                match aux_value_probabilities.remove(*name) {
                    Some(distribution) => column.with_distribution(distribution),
                    None => column,
                }
            })
            .collect();
        Self::new(columns)
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = identifier.into();
        self
    }
    pub fn with_sensitive(mut self, sensitive: impl Into<String>) -> Self {
        self.sensitive = sensitive.into();
        self
    }
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }
    pub fn len(&self) -> usize {
        self.columns.len()
    }
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
    pub fn identifier(&self) -> &str {
        &self.identifier
    }
    pub fn sensitive(&self) -> &str {
        &self.sensitive
    }

    /// The value queries on `column` are centered on.
    pub fn center(&self, column: &Column, target: &TargetRecord) -> Result<f64> {
        if column.name() == self.sensitive {
            return Ok(SENSITIVE_SENTINEL);
        }
        target.get(column.name()).ok_or_else(|| {
            SearchError::Schema(format!("target record has no value for column '{}'", column.name()))
        })
    }
}
