use std::collections::HashSet;
use std::sync::OnceLock;

use legible_core::{ExtractedFields, FieldValue, RecognizedText};
use regex::Regex;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("no text recognized; OCR a document first")]
    EmptyText,
    #[error("no detailed text fragments; the place field needs at least one")]
    NoFragments,
}

// ── Compiled regex cache ─────────────────────────────────────────────────────

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

// Fully anchored D(D)?[./-]M(M)?[./-]YY(YY)? — applied to raw tokens, where
// the separators are still intact.
re!(re_date,
    r"^([1-9]|0[1-9]|1[0-9]|2[0-9]|3[0-1])(\.|-|/)([1-9]|0[1-9]|1[0-2])(\.|-|/)([0-9][0-9]|19[0-9][0-9]|20[0-9][0-9])$");

// Prefix match: optional +/trunk-zero/91 country prefix with 10 or 12
// contiguous digits, or a 5+6-digit split.
re!(re_phone,
    r"^(?:(?:\+*)(?:(?:0[ -]*)*|(?:91 )*)(?:(?:\d{12})+|(?:\d{10})+)|\d{5}[- ]*\d{6})");

re!(re_word, r"\w+");

/// NLTK-style English stop words, minus apostrophe forms that the `\w+`
/// tokenizer can never produce.
const STOP_WORDS: &[&str] = &[
    "i", "me", "my", "myself", "we", "our", "ours", "ourselves", "you", "your", "yours",
    "yourself", "yourselves", "he", "him", "his", "himself", "she", "her", "hers", "herself",
    "it", "its", "itself", "they", "them", "their", "theirs", "themselves", "what", "which",
    "who", "whom", "this", "that", "these", "those", "am", "is", "are", "was", "were", "be",
    "been", "being", "have", "has", "had", "having", "do", "does", "did", "doing", "a", "an",
    "the", "and", "but", "if", "or", "because", "as", "until", "while", "of", "at", "by",
    "for", "with", "about", "against", "between", "into", "through", "during", "before",
    "after", "above", "below", "to", "from", "up", "down", "in", "out", "on", "off", "over",
    "under", "again", "further", "then", "once", "here", "there", "when", "where", "why",
    "how", "all", "any", "both", "each", "few", "more", "most", "other", "some", "such",
    "no", "nor", "not", "only", "own", "same", "so", "than", "too", "very", "s", "t", "can",
    "will", "just", "don", "should", "now", "d", "ll", "m", "o", "re", "ve", "y", "ain",
    "aren", "couldn", "didn", "doesn", "hadn", "hasn", "haven", "isn", "ma", "mightn",
    "mustn", "needn", "shan", "shouldn", "wasn", "weren", "won", "wouldn",
];

fn stop_words() -> &'static HashSet<&'static str> {
    static S: OnceLock<HashSet<&'static str>> = OnceLock::new();
    S.get_or_init(|| STOP_WORDS.iter().copied().collect())
}

// ── Public extraction API ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct ExtractorOptions {
    /// Additional currency marker accepted in front of an amount, on top of
    /// the built-in `Rs` / `INR` / `₹` / `रे` set.
    pub extra_currency_marker: Option<String>,
}

/// Recovers structured invoice fields from noisy OCR text with an ordered set
/// of pattern-matching strategies.
pub struct Extractor {
    price_re: Regex,
}

impl Extractor {
    pub fn new(options: ExtractorOptions) -> Self {
        let extra = options
            .extra_currency_marker
            .as_deref()
            .map(|m| format!("|{}", regex::escape(m)))
            .unwrap_or_default();
        let pattern = format!(
            r"(?:Rs\.?|INR|₹\.?|रे\.?{extra})\s*(\d+(?:[.,]\d+)*)|(\d+(?:[.,]\d+)*)\s*(?:Rs\.?|INR)"
        );
        let price_re = Regex::new(&pattern).expect("invalid price regex");
        Self { price_re }
    }

    /// Extract the six invoice fields from one recognition result.
    ///
    /// Total over its inputs: every field is always present, and a field no
    /// strategy matched is empty or `Missing` — "not found", not an error.
    /// The only failures are the preconditions: the text must be non-empty
    /// and at least one fragment must exist (its text becomes `place`).
    pub fn extract(&self, recognized: &RecognizedText) -> Result<ExtractedFields, ExtractError> {
        if recognized.is_empty() {
            return Err(ExtractError::EmptyText);
        }
        let first_fragment = recognized.fragments.first().ok_or(ExtractError::NoFragments)?;

        let text = &recognized.text;

        // Two token views: raw tokens keep the punctuation that date and
        // phone patterns need; cleaned tokens are bare words for the
        // price/order keyword scans.
        let raw_tokens: Vec<&str> = text.split_whitespace().collect();
        let cleaned_tokens: Vec<&str> = re_word()
            .find_iter(text)
            .map(|m| m.as_str())
            .filter(|w| !stop_words().contains(w))
            .collect();

        let date: Vec<String> = raw_tokens
            .iter()
            .filter(|t| re_date().is_match(t))
            .map(|t| t.to_string())
            .collect();

        let phone_number: Vec<String> = raw_tokens
            .iter()
            .filter(|t| re_phone().is_match(t))
            .map(|t| t.to_string())
            .collect();

        // Structural assumption: the first detected text region on a receipt
        // names the merchant/location. Preserved for compatibility; accuracy
        // is not guaranteed.
        let place = first_fragment.text.clone();

        let order_number = find_order_number(&cleaned_tokens);
        let price = self.find_price(text, &cleaned_tokens);

        debug!(
            dates = date.len(),
            phones = phone_number.len(),
            price_found = !price.is_missing(),
            "invoice extraction complete"
        );

        Ok(ExtractedFields {
            price,
            date,
            place,
            order_number,
            phone_number,
            post_processed_word_list: cleaned_tokens.iter().map(|w| w.to_string()).collect(),
        })
    }

    /// Two-tier price strategy.
    ///
    /// Primary: every amount tagged with a currency marker, taking the
    /// maximum — the grand total is typically the largest tagged figure on a
    /// receipt. An empty match list, or any match that does not parse as a
    /// float (comma-as-decimal-separator receipts), abandons the tier.
    ///
    /// Fallback: the token two past the last `grand`, else the token after
    /// the last `total`.
    fn find_price(&self, text: &str, cleaned_tokens: &[&str]) -> FieldValue {
        let mut amounts = Vec::new();
        let mut unparsable = false;
        for caps in self.price_re.captures_iter(text) {
            let matched = caps.get(1).or_else(|| caps.get(2));
            if let Some(m) = matched {
                match m.as_str().parse::<f64>() {
                    Ok(v) => amounts.push(v),
                    Err(_) => {
                        unparsable = true;
                        break;
                    }
                }
            }
        }
        if !unparsable {
            if let Some(max) = amounts.iter().copied().reduce(f64::max) {
                return FieldValue::Number(max);
            }
        }

        let lowered: Vec<String> = cleaned_tokens.iter().map(|w| w.to_lowercase()).collect();
        if let Some(i) = lowered.iter().rposition(|w| w == "grand") {
            return cleaned_tokens
                .get(i + 2)
                .map(|t| FieldValue::Text(t.to_string()))
                .unwrap_or(FieldValue::Missing);
        }
        if let Some(i) = lowered.iter().rposition(|w| w == "total") {
            return cleaned_tokens
                .get(i + 1)
                .map(|t| FieldValue::Text(t.to_string()))
                .unwrap_or(FieldValue::Missing);
        }
        FieldValue::Missing
    }
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new(ExtractorOptions::default())
    }
}

/// First token equal to "order" (case-insensitive) wins: the next token as an
/// integer if it parses, else the token after that as text.
fn find_order_number(cleaned_tokens: &[&str]) -> FieldValue {
    for (i, token) in cleaned_tokens.iter().enumerate() {
        if token.eq_ignore_ascii_case("order") {
            if let Some(next) = cleaned_tokens.get(i + 1) {
                if let Ok(n) = next.parse::<i64>() {
                    return FieldValue::Integer(n);
                }
            }
            return cleaned_tokens
                .get(i + 2)
                .map(|t| FieldValue::Text(t.to_string()))
                .unwrap_or(FieldValue::Missing);
        }
    }
    FieldValue::Missing
}
