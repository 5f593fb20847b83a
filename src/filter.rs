use crate::controller::field::Schema;

/// Parsed search input.
///
/// Whitespace-separated terms must all match. A `field:value` term matches
/// only that field (by id or label); other terms match any searchable field.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Query {
    /// Lowercased free-text terms.
    pub terms: Vec<String>,
    /// `(field, lowercased value)` pairs.
    pub scoped: Vec<(String, String)>,
}

impl Query {
    pub fn parse<R>(input: &str, schema: &Schema<R>) -> Self {
        let mut query = Self::default();
        for token in input.split_whitespace() {
            if let Some((field, value)) = token.split_once(':')
                && !value.is_empty()
                && let Some(desc) = schema.find(field)
            {
                query
                    .scoped
                    .push((desc.id.to_owned(), value.to_lowercase()));
            } else {
                query.terms.push(token.to_lowercase());
            }
        }
        query
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty() && self.scoped.is_empty()
    }

    pub fn matches<R>(&self, schema: &Schema<R>, record: &R) -> bool {
        let scoped_ok = self.scoped.iter().all(|(field, value)| {
            schema
                .get(field)
                .and_then(|f| f.value(record).search_text())
                .is_some_and(|text| text.contains(value.as_str()))
        });
        if !scoped_ok {
            return false;
        }

        if self.terms.is_empty() {
            return true;
        }
        let haystacks: Vec<String> = schema
            .searchable()
            .filter_map(|f| f.value(record).search_text())
            .collect();
        self.terms
            .iter()
            .all(|term| haystacks.iter().any(|h| h.contains(term.as_str())))
    }
}
