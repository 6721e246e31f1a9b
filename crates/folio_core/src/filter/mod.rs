//! Filter predicate library.
//!
//! # Responsibility
//! - Build named, composable predicates over one record field.
//! - Evaluate predicates in memory; the SQLite backend translates the same
//!   predicates to parameterized SQL.
//!
//! # Invariants
//! - A constructor returns `None` when its arguments impose no constraint;
//!   callers never see a predicate that matches everything.
//! - Text predicates compare ASCII-lowercased values on both sides.
//! - A null field value only satisfies [`Predicate::IsNull`].

pub mod spec;

use crate::model::normalize::fold_case;
use crate::model::record::Record;
use crate::model::{FieldValue, RecordField};
use std::cmp::Ordering;

pub use spec::{Constraint, FilterSpec, SortOrder};

/// Backend-neutral predicate over a single field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// Field equals the value.
    Equals(FieldValue),
    /// Field equals one of the values.
    OneOf(Vec<FieldValue>),
    /// Lowercased field contains any of the lowercased needles.
    TextContainsAny(Vec<String>),
    /// Lowercased field equals any of the lowercased values.
    TextEqualsAny(Vec<String>),
    /// Inclusive bounds; at least one side is set.
    Between {
        min: Option<FieldValue>,
        max: Option<FieldValue>,
    },
    /// Field has no value.
    IsNull,
}

impl Predicate {
    /// Evaluates the predicate against one field value.
    pub fn matches(&self, value: &FieldValue) -> bool {
        if value.is_null() {
            return matches!(self, Self::IsNull);
        }
        match self {
            Self::Equals(expected) => value == expected,
            Self::OneOf(expected) => expected.contains(value),
            Self::TextContainsAny(needles) => value
                .as_text()
                .map(fold_case)
                .is_some_and(|text| needles.iter().any(|needle| text.contains(needle.as_str()))),
            Self::TextEqualsAny(candidates) => value
                .as_text()
                .map(fold_case)
                .is_some_and(|text| candidates.contains(&text)),
            Self::Between { min, max } => {
                let above_min = min.as_ref().map_or(true, |min| {
                    matches!(
                        value.compare(min),
                        Some(Ordering::Greater | Ordering::Equal)
                    )
                });
                let below_max = max.as_ref().map_or(true, |max| {
                    matches!(value.compare(max), Some(Ordering::Less | Ordering::Equal))
                });
                above_min && below_max
            }
            Self::IsNull => false,
        }
    }
}

/// A predicate bound to the field it constrains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldFilter<F> {
    pub field: F,
    pub predicate: Predicate,
}

impl<F: RecordField> FieldFilter<F> {
    pub fn matches<R: Record<Field = F>>(&self, record: &R) -> bool {
        self.predicate.matches(&record.field(self.field))
    }
}

/// `field == value`; no constraint when `value` is null.
pub fn exact_match<F: RecordField>(
    field: F,
    value: impl Into<FieldValue>,
) -> Option<FieldFilter<F>> {
    let value = value.into();
    if value.is_null() {
        return None;
    }
    Some(FieldFilter {
        field,
        predicate: Predicate::Equals(value),
    })
}

/// Case-insensitive text match against any of `values`.
///
/// With `partial`, the field must contain one of the values; otherwise it
/// must equal one of them. Blank values are ignored; no values means no
/// constraint.
pub fn text_filter<F, I, S>(field: F, values: I, partial: bool) -> Option<FieldFilter<F>>
where
    F: RecordField,
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut folded: Vec<String> = values
        .into_iter()
        .map(|value| fold_case(value.as_ref()))
        .filter(|value| !value.is_empty())
        .collect();
    folded.dedup();
    if folded.is_empty() {
        return None;
    }
    let predicate = if partial {
        Predicate::TextContainsAny(folded)
    } else {
        Predicate::TextEqualsAny(folded)
    };
    Some(FieldFilter { field, predicate })
}

/// Inclusive range over `field`, or set membership when `exact` is given.
///
/// A non-empty `exact` list overrides `min`/`max`. Null bounds are ignored;
/// nothing supplied means no constraint.
pub fn range_filter<F: RecordField>(
    field: F,
    min: Option<FieldValue>,
    max: Option<FieldValue>,
    exact: Option<Vec<FieldValue>>,
) -> Option<FieldFilter<F>> {
    let exact: Vec<FieldValue> = exact
        .unwrap_or_default()
        .into_iter()
        .filter(|value| !value.is_null())
        .collect();
    if !exact.is_empty() {
        return Some(FieldFilter {
            field,
            predicate: Predicate::OneOf(exact),
        });
    }

    let min = min.filter(|value| !value.is_null());
    let max = max.filter(|value| !value.is_null());
    if min.is_none() && max.is_none() {
        return None;
    }
    Some(FieldFilter {
        field,
        predicate: Predicate::Between { min, max },
    })
}

/// `field == value` for a flag; no constraint when `value` is `None`.
pub fn boolean_filter<F: RecordField>(field: F, value: Option<bool>) -> Option<FieldFilter<F>> {
    value.and_then(|flag| exact_match(field, flag))
}

/// `field` has no value.
pub fn is_absent<F: RecordField>(field: F) -> FieldFilter<F> {
    FieldFilter {
        field,
        predicate: Predicate::IsNull,
    }
}

#[cfg(test)]
mod tests {
    use super::{boolean_filter, exact_match, range_filter, text_filter, Predicate};
    use crate::model::work::WorkField;
    use crate::model::FieldValue;

    #[test]
    fn null_arguments_produce_no_predicate() {
        assert!(exact_match(WorkField::Title, None::<String>).is_none());
        assert!(text_filter(WorkField::Genre, Vec::<String>::new(), true).is_none());
        assert!(text_filter(WorkField::Genre, ["  "], true).is_none());
        assert!(range_filter(WorkField::Year, None, Some(FieldValue::Null), None).is_none());
        assert!(boolean_filter(WorkField::IsRead, None).is_none());
    }

    #[test]
    fn exact_list_overrides_bounds() {
        let filter = range_filter(
            WorkField::Year,
            Some(FieldValue::from(1900)),
            Some(FieldValue::from(2000)),
            Some(vec![FieldValue::from(1965)]),
        )
        .unwrap();
        assert_eq!(filter.predicate, Predicate::OneOf(vec![FieldValue::from(1965)]));
        assert!(!filter.predicate.matches(&FieldValue::from(1970)));
    }

    #[test]
    fn text_predicates_fold_case() {
        let partial = text_filter(WorkField::Genre, ["SCIENCE"], true).unwrap();
        assert!(partial.predicate.matches(&FieldValue::from("Science Fiction")));
        assert!(!partial.predicate.matches(&FieldValue::Null));

        let exact = text_filter(WorkField::Genre, ["science"], false).unwrap();
        assert!(!exact.predicate.matches(&FieldValue::from("science fiction")));
        assert!(exact.predicate.matches(&FieldValue::from("Science")));
    }

    #[test]
    fn bounds_are_inclusive() {
        let filter = range_filter(
            WorkField::Year,
            Some(FieldValue::from(200)),
            Some(FieldValue::from(500)),
            None,
        )
        .unwrap();
        let hits: Vec<i64> = [150, 200, 500, 600]
            .into_iter()
            .filter(|pages| filter.predicate.matches(&FieldValue::from(*pages)))
            .collect();
        assert_eq!(hits, vec![200, 500]);
    }
}
