use std::cmp::Ordering;

use chrono::NaiveDateTime;
use serde::Deserialize;

use super::field::{CompareKind, FieldDescriptor, FieldValue};
use crate::util::parse_datetime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum SortDirection {
    #[default]
    #[serde(rename = "asc", alias = "ascending")]
    Ascending,
    #[serde(rename = "desc", alias = "descending")]
    Descending,
}

impl SortDirection {
    pub fn toggled(self) -> Self {
        match self {
            Self::Ascending => Self::Descending,
            Self::Descending => Self::Ascending,
        }
    }

    pub fn apply(self, ord: Ordering) -> Ordering {
        match self {
            Self::Ascending => ord,
            Self::Descending => ord.reverse(),
        }
    }

    /// Header suffix shown next to the sorted column.
    pub fn indicator(self) -> &'static str {
        match self {
            Self::Ascending => " ▲",
            Self::Descending => " ▼",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SortSpec {
    pub field: String,
    #[serde(default)]
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }

    pub fn ascending(field: impl Into<String>) -> Self {
        Self::new(field, SortDirection::Ascending)
    }

    pub fn descending(field: impl Into<String>) -> Self {
        Self::new(field, SortDirection::Descending)
    }
}

/// Pre-extracted comparison key for one record.
#[derive(Debug, Clone, PartialEq)]
enum SortKey {
    Number(f64),
    Instant(NaiveDateTime),
    Text { folded: String, raw: String },
}

impl SortKey {
    fn extract(kind: CompareKind, value: &FieldValue) -> Self {
        match kind {
            CompareKind::Numeric => Self::Number(numeric_value(value)),
            CompareKind::DateTime => Self::Instant(instant_value(value)),
            CompareKind::Text => {
                let raw = match value {
                    FieldValue::Missing => String::new(),
                    FieldValue::Number(n) => crate::util::format_number(*n),
                    FieldValue::Text(s) => s.clone(),
                };
                Self::Text {
                    folded: raw.to_lowercase(),
                    raw,
                }
            }
        }
    }

    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => a.total_cmp(b),
            (Self::Instant(a), Self::Instant(b)) => a.cmp(b),
            (
                Self::Text { folded: fa, raw: ra },
                Self::Text { folded: fb, raw: rb },
            ) => fa.cmp(fb).then_with(|| ra.cmp(rb)),
            // Keys of one sort pass always share a kind.
            _ => Ordering::Equal,
        }
    }
}

/// Numeric view of a value: text is parsed, anything unusable is 0.
pub fn numeric_value(value: &FieldValue) -> f64 {
    match value {
        FieldValue::Number(n) if n.is_finite() => *n,
        FieldValue::Text(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .unwrap_or(0.0),
        _ => 0.0,
    }
}

/// Instant view of a value: missing or unparseable dates are the epoch, so
/// they lead an ascending sort.
pub fn instant_value(value: &FieldValue) -> NaiveDateTime {
    let parsed = match value {
        FieldValue::Text(s) => parse_datetime(s),
        _ => None,
    };
    // NaiveDateTime's default is the Unix epoch.
    parsed.unwrap_or_default()
}

/// Compare two values under a column's comparison rule.
pub fn compare_values(kind: CompareKind, a: &FieldValue, b: &FieldValue) -> Ordering {
    SortKey::extract(kind, a).cmp(&SortKey::extract(kind, b))
}

/// Stable in-place sort of `indices` (positions into `records`).
pub fn sort_indices<R, T>(
    indices: &mut Vec<usize>,
    records: &[T],
    project: impl Fn(&T) -> &R,
    field: &FieldDescriptor<R>,
    direction: SortDirection,
) {
    let mut keyed: Vec<(SortKey, usize)> = indices
        .iter()
        .map(|&i| (SortKey::extract(field.kind, &field.value(project(&records[i]))), i))
        .collect();
    // `sort_by` is stable: equal keys keep their incoming order.
    keyed.sort_by(|(a, _), (b, _)| direction.apply(a.cmp(b)));
    indices.clear();
    indices.extend(keyed.into_iter().map(|(_, i)| i));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_coerces_text_and_missing() {
        assert_eq!(numeric_value(&FieldValue::Missing), 0.0);
        assert_eq!(numeric_value(&FieldValue::text(" 3 ")), 3.0);
        assert_eq!(numeric_value(&FieldValue::text("n/a")), 0.0);
        assert_eq!(numeric_value(&FieldValue::Number(f64::NAN)), 0.0);
        assert_eq!(numeric_value(&FieldValue::Number(5.5)), 5.5);
    }

    #[test]
    fn missing_date_sorts_first() {
        let ord = compare_values(
            CompareKind::DateTime,
            &FieldValue::Missing,
            &FieldValue::text("1999-01-01 00:00:00"),
        );
        assert_eq!(ord, Ordering::Less);
    }

    #[test]
    fn dates_compare_across_formats() {
        let ord = compare_values(
            CompareKind::DateTime,
            &FieldValue::text("2025.03.14 10:00:00"),
            &FieldValue::text("2025-03-14T09:00:00"),
        );
        assert_eq!(ord, Ordering::Greater);
    }

    #[test]
    fn text_ignores_case_then_breaks_ties_on_raw() {
        assert_eq!(
            compare_values(CompareKind::Text, &FieldValue::text("apple"), &FieldValue::text("Banana")),
            Ordering::Less
        );
        assert_eq!(
            compare_values(CompareKind::Text, &FieldValue::text("Apple"), &FieldValue::text("apple")),
            Ordering::Less
        );
        assert_eq!(
            compare_values(CompareKind::Text, &FieldValue::Missing, &FieldValue::text("a")),
            Ordering::Less
        );
    }

    #[test]
    fn direction_toggles_and_reverses() {
        assert_eq!(SortDirection::Ascending.toggled(), SortDirection::Descending);
        assert_eq!(SortDirection::Descending.apply(Ordering::Less), Ordering::Greater);
    }

    #[test]
    fn sort_spec_deserializes_short_and_long_direction() {
        let spec: SortSpec =
            toml::from_str("field = \"name\"\ndirection = \"desc\"").expect("valid toml");
        assert_eq!(spec, SortSpec::descending("name"));
        let spec: SortSpec =
            toml::from_str("field = \"name\"\ndirection = \"ascending\"").expect("valid toml");
        assert_eq!(spec, SortSpec::ascending("name"));
        let spec: SortSpec = toml::from_str("field = \"id\"").expect("valid toml");
        assert_eq!(spec.direction, SortDirection::Ascending);
    }
}
