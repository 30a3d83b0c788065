use super::payload::ENVELOPE_VALUE_KEY;
use super::surrogates::decode_utf16_strip_lone;
use super::table::{default_correction_table, CorrectionTable};
use serde_json::Value;
use std::sync::Arc;
use unicode_normalization::UnicodeNormalization;

/// A pass can expose new work for the next one (removing a control character
/// may join a pattern or let combining marks compose), so the pipeline is
/// repeated until the text stops changing.
const MAX_PASSES: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NormalizeDepth {
    /// Only direct field values and the `value` of an envelope.
    #[default]
    Shallow,
    /// Every string leaf below an envelope's `value`, including sub-table rows.
    Deep,
}

impl NormalizeDepth {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "" | "shallow" => Some(Self::Shallow),
            "deep" => Some(Self::Deep),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Shallow => "shallow",
            Self::Deep => "deep",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Normalizer {
    table: Arc<CorrectionTable>,
    depth: NormalizeDepth,
}

impl Normalizer {
    pub fn new(table: Arc<CorrectionTable>) -> Self {
        Self {
            table,
            depth: NormalizeDepth::Shallow,
        }
    }

    pub fn with_depth(mut self, depth: NormalizeDepth) -> Self {
        self.depth = depth;
        self
    }

    pub fn depth(&self) -> NormalizeDepth {
        self.depth
    }

    pub fn table(&self) -> &CorrectionTable {
        &self.table
    }

    /// Mojibake correction, NFKC, control stripping and trimming.
    pub fn normalize_text(&self, text: &str) -> String {
        let mut current = self.single_pass(text);
        for _ in 1..MAX_PASSES {
            let next = self.single_pass(&current);
            if next == current {
                break;
            }
            current = next;
        }
        current
    }

    fn single_pass(&self, text: &str) -> String {
        let corrected = self.table.correct(text);
        let composed: String = corrected.nfkc().collect();
        strip_invalid_chars(&composed).trim().to_string()
    }

    /// UTF-16 input may carry unpaired surrogates; they are dropped before
    /// the text pipeline runs.
    pub fn normalize_utf16(&self, units: &[u16]) -> String {
        self.normalize_text(&decode_utf16_strip_lone(units))
    }

    /// Strings are normalized; every other value is returned unchanged.
    pub fn normalize_string(&self, value: &Value) -> Value {
        match value {
            Value::String(text) => Value::String(self.normalize_text(text)),
            other => other.clone(),
        }
    }

    /// Normalizes an envelope's `value`. Shallow depth only rewrites a
    /// direct string; deep depth walks arrays and objects, treating nested
    /// objects that carry a `value` key as envelopes of their own.
    pub fn normalize_field_value(&self, value: &Value) -> Value {
        match self.depth {
            NormalizeDepth::Shallow => self.normalize_string(value),
            NormalizeDepth::Deep => self.normalize_deep(value),
        }
    }

    fn normalize_deep(&self, value: &Value) -> Value {
        match value {
            Value::String(_) => self.normalize_string(value),
            Value::Array(items) => {
                Value::Array(items.iter().map(|item| self.normalize_deep(item)).collect())
            }
            Value::Object(map) if map.contains_key(ENVELOPE_VALUE_KEY) => {
                let mut out = map.clone();
                if let Some(inner) = map.get(ENVELOPE_VALUE_KEY) {
                    out.insert(
                        ENVELOPE_VALUE_KEY.to_string(),
                        self.normalize_deep(inner),
                    );
                }
                Value::Object(out)
            }
            Value::Object(map) => Value::Object(
                map.iter()
                    .map(|(key, val)| (key.clone(), self.normalize_deep(val)))
                    .collect(),
            ),
            other => other.clone(),
        }
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(default_correction_table())
    }
}

/// `char` is a Unicode scalar value, so it can never be a surrogate; those
/// are removed where UTF-16 or JSON escapes are decoded. What remains to strip
/// here are the C0 and C1 control ranges.
fn strip_invalid_chars(text: &str) -> std::borrow::Cow<'_, str> {
    if !text.chars().any(is_stripped_char) {
        return std::borrow::Cow::Borrowed(text);
    }
    std::borrow::Cow::Owned(text.chars().filter(|c| !is_stripped_char(*c)).collect())
}

fn is_stripped_char(c: char) -> bool {
    matches!(c as u32, 0x00..=0x1F | 0x7F..=0x9F)
}

pub fn normalize_text(text: &str) -> String {
    Normalizer::default().normalize_text(text)
}

pub fn normalize_string(value: &Value) -> Value {
    Normalizer::default().normalize_string(value)
}
