use serde::{Deserialize, Serialize};

use crate::controller::FieldValue;

/// A numeric field the backend sometimes sends as a string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LooseNumber {
    Number(f64),
    Text(String),
}

impl LooseNumber {
    pub fn as_f64(&self) -> f64 {
        crate::controller::sort::numeric_value(&self.to_field())
    }

    pub fn to_field(&self) -> FieldValue {
        match self {
            Self::Number(n) => FieldValue::Number(*n),
            Self::Text(s) => FieldValue::Text(s.clone()),
        }
    }
}

/// Field value for an optional loose number.
pub fn loose_field(value: Option<&LooseNumber>) -> FieldValue {
    value.map_or(FieldValue::Missing, LooseNumber::to_field)
}

// ---------------------------------------------------------------------------
// Error body
// ---------------------------------------------------------------------------

/// Error payload the backend attaches to 4xx/5xx responses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ErrorBody {
    pub message: Option<String>,
    /// Field name to validation message.
    pub errors: indexmap::IndexMap<String, String>,
    pub timestamp: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loose_number_accepts_both_shapes() {
        let n: LooseNumber = serde_json::from_str("5").expect("number");
        assert_eq!(n.as_f64(), 5.0);
        let t: LooseNumber = serde_json::from_str("\"3\"").expect("string");
        assert_eq!(t.as_f64(), 3.0);
        let junk: LooseNumber = serde_json::from_str("\"abc\"").expect("string");
        assert_eq!(junk.as_f64(), 0.0);
    }

    #[test]
    fn error_body_tolerates_missing_parts() {
        let body: ErrorBody = serde_json::from_str(
            r#"{"message":"Validation failed","errors":{"name":"required"}}"#,
        )
        .expect("valid json");
        assert_eq!(body.message.as_deref(), Some("Validation failed"));
        assert_eq!(body.errors.get("name").map(String::as_str), Some("required"));
        let empty: ErrorBody = serde_json::from_str("{}").expect("valid json");
        assert!(empty.errors.is_empty());
    }
}
