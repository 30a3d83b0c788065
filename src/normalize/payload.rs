use super::pipeline::Normalizer;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

pub const ENVELOPE_VALUE_KEY: &str = "value";

/// A record field as the platform represents it. The tag is decided once,
/// when the payload is built from JSON.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// `{ "value": ..., <metadata>... }`. Metadata is carried through untouched.
    Enveloped {
        value: Value,
        metadata: Map<String, Value>,
    },
    Raw(Value),
}

impl FieldValue {
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Object(mut map) if map.contains_key(ENVELOPE_VALUE_KEY) => {
                let inner = map.remove(ENVELOPE_VALUE_KEY).unwrap_or(Value::Null);
                FieldValue::Enveloped {
                    value: inner,
                    metadata: map,
                }
            }
            other => FieldValue::Raw(other),
        }
    }

    pub fn enveloped(value: Value) -> Self {
        FieldValue::Enveloped {
            value,
            metadata: Map::new(),
        }
    }

    pub fn is_enveloped(&self) -> bool {
        matches!(self, FieldValue::Enveloped { .. })
    }

    pub fn value(&self) -> &Value {
        match self {
            FieldValue::Enveloped { value, .. } => value,
            FieldValue::Raw(value) => value,
        }
    }

    pub fn with_value(&self, next: Value) -> Self {
        match self {
            FieldValue::Enveloped { metadata, .. } => FieldValue::Enveloped {
                value: next,
                metadata: metadata.clone(),
            },
            FieldValue::Raw(_) => FieldValue::Raw(next),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Enveloped { value, metadata } => {
                let mut out = metadata.clone();
                out.insert(ENVELOPE_VALUE_KEY.to_string(), value.clone());
                Value::Object(out)
            }
            FieldValue::Raw(value) => value.clone(),
        }
    }

    pub fn normalized(&self, normalizer: &Normalizer) -> Self {
        match self {
            FieldValue::Enveloped { value, .. } => {
                self.with_value(normalizer.normalize_field_value(value))
            }
            FieldValue::Raw(value) => FieldValue::Raw(normalizer.normalize_string(value)),
        }
    }
}

/// Field code to field value. Codes are unique; order carries no meaning.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordPayload {
    fields: BTreeMap<String, FieldValue>,
}

impl RecordPayload {
    /// `None` for anything that is not a JSON object.
    pub fn from_json(value: &Value) -> Option<Self> {
        value.as_object().map(|map| Self::from_map(map.clone()))
    }

    pub fn from_map(map: Map<String, Value>) -> Self {
        map.into_iter()
            .map(|(code, value)| (code, FieldValue::from_json(value)))
            .collect()
    }

    pub fn to_json(&self) -> Value {
        Value::Object(
            self.fields
                .iter()
                .map(|(code, value)| (code.clone(), value.to_json()))
                .collect(),
        )
    }

    pub fn get(&self, code: &str) -> Option<&FieldValue> {
        self.fields.get(code)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.fields.iter()
    }

    pub fn normalized(&self, normalizer: &Normalizer) -> Self {
        self.fields
            .iter()
            .map(|(code, value)| (code.clone(), value.normalized(normalizer)))
            .collect()
    }

    /// Codes whose value differs between `self` and `other`, sorted.
    pub fn changed_fields(&self, other: &RecordPayload) -> Vec<String> {
        self.fields
            .iter()
            .filter(|(code, value)| other.fields.get(*code) != Some(*value))
            .map(|(code, _)| code.clone())
            .collect()
    }
}

impl FromIterator<(String, FieldValue)> for RecordPayload {
    fn from_iter<T: IntoIterator<Item = (String, FieldValue)>>(iter: T) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

impl Normalizer {
    /// Object payloads are rebuilt with every field normalized; any other JSON
    /// value is returned unchanged.
    pub fn normalize_payload(&self, payload: &Value) -> Value {
        match RecordPayload::from_json(payload) {
            Some(record) => record.normalized(self).to_json(),
            None => payload.clone(),
        }
    }
}

pub fn normalize_payload(payload: &Value) -> Value {
    Normalizer::default().normalize_payload(payload)
}
