use std::fmt::Debug;
use std::hash::Hash;

use indexmap::IndexMap;

use crate::util::format_number;

/// A displayable entity the controller can hold.
pub trait Record: Clone + Send + Sync + 'static {
    type Key: Clone + Eq + Hash + Debug + Send + Sync;

    /// Stable unique identity (login, product id, report id).
    fn key(&self) -> Self::Key;
}

/// A field value as seen by sorting and filtering.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Missing,
    Number(f64),
    Text(String),
}

impl FieldValue {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    pub fn opt_text(s: Option<&str>) -> Self {
        s.map_or(Self::Missing, Self::text)
    }

    pub fn opt_number(n: Option<f64>) -> Self {
        n.map_or(Self::Missing, Self::Number)
    }

    /// Text used for substring matching. Missing values never match.
    pub fn search_text(&self) -> Option<String> {
        match self {
            Self::Missing => None,
            Self::Number(n) => Some(format_number(*n)),
            Self::Text(s) => Some(s.to_lowercase()),
        }
    }
}

/// How a column orders its values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareKind {
    Numeric,
    DateTime,
    Text,
}

/// One column of a record schema: how to read it and how to compare it.
pub struct FieldDescriptor<R> {
    pub id: &'static str,
    pub label: &'static str,
    pub kind: CompareKind,
    pub accessor: fn(&R) -> FieldValue,
    pub searchable: bool,
}

// Manual impls: a derive would demand `R: Clone`.
impl<R> Clone for FieldDescriptor<R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R> Copy for FieldDescriptor<R> {}

impl<R> Debug for FieldDescriptor<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("searchable", &self.searchable)
            .finish_non_exhaustive()
    }
}

impl<R> FieldDescriptor<R> {
    pub fn numeric(id: &'static str, label: &'static str, accessor: fn(&R) -> FieldValue) -> Self {
        Self {
            id,
            label,
            kind: CompareKind::Numeric,
            accessor,
            searchable: false,
        }
    }

    pub fn datetime(id: &'static str, label: &'static str, accessor: fn(&R) -> FieldValue) -> Self {
        Self {
            id,
            label,
            kind: CompareKind::DateTime,
            accessor,
            searchable: false,
        }
    }

    pub fn text(id: &'static str, label: &'static str, accessor: fn(&R) -> FieldValue) -> Self {
        Self {
            id,
            label,
            kind: CompareKind::Text,
            accessor,
            searchable: false,
        }
    }

    /// Include this field in free-text filtering.
    pub fn searchable(mut self) -> Self {
        self.searchable = true;
        self
    }

    pub fn value(&self, record: &R) -> FieldValue {
        (self.accessor)(record)
    }
}

/// Ordered field descriptor table for one record type.
#[derive(Debug)]
pub struct Schema<R> {
    fields: IndexMap<&'static str, FieldDescriptor<R>>,
}

impl<R> Schema<R> {
    pub fn new(fields: impl IntoIterator<Item = FieldDescriptor<R>>) -> Self {
        Self {
            fields: fields.into_iter().map(|f| (f.id, f)).collect(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&FieldDescriptor<R>> {
        self.fields.get(id)
    }

    /// Look up a field by id or label, ignoring case.
    pub fn find(&self, name: &str) -> Option<&FieldDescriptor<R>> {
        self.get(name).or_else(|| {
            self.fields.values().find(|f| {
                f.id.eq_ignore_ascii_case(name) || f.label.eq_ignore_ascii_case(name)
            })
        })
    }

    /// Field at a 0-based column position.
    pub fn get_index(&self, index: usize) -> Option<&FieldDescriptor<R>> {
        self.fields.get_index(index).map(|(_, f)| f)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.fields.get_index_of(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldDescriptor<R>> {
        self.fields.values()
    }

    pub fn searchable(&self) -> impl Iterator<Item = &FieldDescriptor<R>> {
        self.fields.values().filter(|f| f.searchable)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Pair {
        name: String,
        score: Option<f64>,
    }

    fn schema() -> Schema<Pair> {
        Schema::new([
            FieldDescriptor::text("name", "Name", |p: &Pair| FieldValue::text(&p.name)).searchable(),
            FieldDescriptor::numeric("score", "Score", |p: &Pair| FieldValue::opt_number(p.score)),
        ])
    }

    #[test]
    fn fields_keep_declaration_order() {
        let s = schema();
        let ids: Vec<_> = s.iter().map(|f| f.id).collect();
        assert_eq!(ids, ["name", "score"]);
        assert_eq!(s.position("score"), Some(1));
        assert_eq!(s.get_index(0).map(|f| f.id), Some("name"));
    }

    #[test]
    fn find_matches_label_case_insensitively() {
        let s = schema();
        assert_eq!(s.find("SCORE").map(|f| f.id), Some("score"));
        assert_eq!(s.find("Name").map(|f| f.id), Some("name"));
        assert!(s.find("missing").is_none());
    }

    #[test]
    fn only_flagged_fields_are_searchable() {
        let s = schema();
        let ids: Vec<_> = s.searchable().map(|f| f.id).collect();
        assert_eq!(ids, ["name"]);
    }

    #[test]
    fn accessor_reads_record() {
        let s = schema();
        let p = Pair {
            name: "Oats".to_owned(),
            score: None,
        };
        assert_eq!(s.get("score").map(|f| f.value(&p)), Some(FieldValue::Missing));
        assert_eq!(
            s.get("name").and_then(|f| f.value(&p).search_text()),
            Some("oats".to_owned())
        );
    }
}
