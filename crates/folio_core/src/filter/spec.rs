//! Declarative filter specification: field-to-constraint mapping.
//!
//! A spec whose constraints all resolve to no predicate is empty; finders
//! and filtered deletes must reject it instead of scanning the whole store.

use super::{boolean_filter, exact_match, is_absent, range_filter, text_filter, FieldFilter};
use crate::model::record::Record;
use crate::model::{FieldValue, RecordField, UnknownField};

/// Constraint on one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
    Exact(FieldValue),
    /// Case-insensitive text match; partial or exact per [`FilterSpec`].
    Text(Vec<String>),
    Range {
        min: Option<FieldValue>,
        max: Option<FieldValue>,
        exact: Option<Vec<FieldValue>>,
    },
    Flag(Option<bool>),
    Absent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

/// Filter specification for records with field enumeration `F`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterSpec<F> {
    constraints: Vec<(F, Constraint)>,
    partial: bool,
    limit: Option<usize>,
    order: Option<(F, SortOrder)>,
}

impl<F> Default for FilterSpec<F> {
    fn default() -> Self {
        Self {
            constraints: Vec::new(),
            partial: false,
            limit: None,
            order: None,
        }
    }
}

impl<F: RecordField> FilterSpec<F> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn constrain(mut self, field: F, constraint: Constraint) -> Self {
        self.constraints.push((field, constraint));
        self
    }

    /// Adds a constraint for a field given by name.
    pub fn named(self, name: &str, constraint: Constraint) -> Result<Self, UnknownField> {
        let field = F::parse(name)?;
        Ok(self.constrain(field, constraint))
    }

    pub fn exact(self, field: F, value: impl Into<FieldValue>) -> Self {
        self.constrain(field, Constraint::Exact(value.into()))
    }

    pub fn text<I, S>(self, field: F, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values = values.into_iter().map(Into::into).collect();
        self.constrain(field, Constraint::Text(values))
    }

    pub fn range(self, field: F, min: impl Into<FieldValue>, max: impl Into<FieldValue>) -> Self {
        self.constrain(
            field,
            Constraint::Range {
                min: Some(min.into()),
                max: Some(max.into()),
                exact: None,
            },
        )
    }

    pub fn one_of<I, V>(self, field: F, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<FieldValue>,
    {
        let exact = values.into_iter().map(Into::into).collect();
        self.constrain(
            field,
            Constraint::Range {
                min: None,
                max: None,
                exact: Some(exact),
            },
        )
    }

    pub fn flag(self, field: F, value: Option<bool>) -> Self {
        self.constrain(field, Constraint::Flag(value))
    }

    pub fn absent(self, field: F) -> Self {
        self.constrain(field, Constraint::Absent)
    }

    /// Switches text constraints between substring and whole-value matching.
    pub fn with_partial(mut self, partial: bool) -> Self {
        self.partial = partial;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_order(mut self, field: F, order: SortOrder) -> Self {
        self.order = Some((field, order));
        self
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    pub fn order(&self) -> Option<(F, SortOrder)> {
        self.order
    }

    /// Resolves constraints to predicates, dropping the no-ops.
    pub fn predicates(&self) -> Vec<FieldFilter<F>> {
        self.constraints
            .iter()
            .filter_map(|(field, constraint)| match constraint {
                Constraint::Exact(value) => exact_match(*field, value.clone()),
                Constraint::Text(values) => text_filter(*field, values, self.partial),
                Constraint::Range { min, max, exact } => {
                    range_filter(*field, min.clone(), max.clone(), exact.clone())
                }
                Constraint::Flag(value) => boolean_filter(*field, *value),
                Constraint::Absent => Some(is_absent(*field)),
            })
            .collect()
    }

    /// True when no constraint would narrow the result.
    pub fn is_empty(&self) -> bool {
        self.predicates().is_empty()
    }

    /// All predicates hold for `record`.
    pub fn matches<R: Record<Field = F>>(&self, record: &R) -> bool {
        self.predicates()
            .iter()
            .all(|predicate| predicate.matches(record))
    }
}
