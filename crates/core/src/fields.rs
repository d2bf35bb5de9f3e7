use serde::{Deserialize, Serialize};

/// A single extracted invoice value.
///
/// Which variant a field carries depends on the strategy that matched: the
/// currency-tagged price path yields `Number`, the order-number path yields
/// `Integer` or `Text`, and keyword fallbacks yield `Text`. A field that no
/// strategy matched is `Missing`, which callers must treat as "not found"
/// rather than as an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Number(f64),
    Integer(i64),
    Text(String),
    Missing,
}

impl FieldValue {
    pub fn is_missing(&self) -> bool {
        matches!(self, FieldValue::Missing)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            FieldValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldValue::Number(n) => write!(f, "{n}"),
            FieldValue::Integer(i) => write!(f, "{i}"),
            FieldValue::Text(s) => write!(f, "{s}"),
            FieldValue::Missing => write!(f, ""),
        }
    }
}

/// The terminal artifact of invoice extraction. All six fields are always
/// present; empty lists and `Missing` values mean "not found".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedFields {
    pub price: FieldValue,
    pub date: Vec<String>,
    pub place: String,
    pub order_number: FieldValue,
    pub phone_number: Vec<String>,
    pub post_processed_word_list: Vec<String>,
}

impl ExtractedFields {
    /// All-empty result, the starting point every extraction fills in.
    pub fn empty() -> Self {
        Self {
            price: FieldValue::Missing,
            date: Vec::new(),
            place: String::new(),
            order_number: FieldValue::Missing,
            phone_number: Vec::new(),
            post_processed_word_list: Vec::new(),
        }
    }
}
