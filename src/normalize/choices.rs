use super::payload::{FieldValue, RecordPayload};
use serde_json::Value;
use std::collections::BTreeMap;

pub const DEFAULT_DROPDOWN_CHOICES: &[(&str, &[&str])] = &[
    (
        "category",
        &["交通費", "会議費", "接待費", "消耗品費", "通信費", "光熱費", "その他"],
    ),
    ("approval_status", &["申請中", "承認済み", "差し戻し"]),
];

/// Allowed options for drop-down fields, used to pull near-miss values onto
/// a valid option before a write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DropdownChoices {
    fields: BTreeMap<String, Vec<String>>,
}

impl DropdownChoices {
    pub fn builtin() -> Self {
        DEFAULT_DROPDOWN_CHOICES
            .iter()
            .fold(Self::default(), |acc, (code, options)| {
                acc.with_field(*code, options.iter().map(|s| s.to_string()).collect())
            })
    }

    pub fn with_field(mut self, code: impl Into<String>, options: Vec<String>) -> Self {
        self.fields.insert(code.into(), options);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The option a value should become, or `None` when it is already valid,
    /// empty, or matches nothing.
    pub fn snap(&self, code: &str, value: &str) -> Option<String> {
        let options = self.fields.get(code)?;
        if value.is_empty() || options.iter().any(|option| option == value) {
            return None;
        }
        options
            .iter()
            .find(|option| option.contains(value) || value.contains(option.as_str()))
            .cloned()
    }

    /// Snaps enveloped string values of known drop-down fields. Returns the
    /// new payload and the codes that changed.
    pub fn apply(&self, payload: &RecordPayload) -> (RecordPayload, Vec<String>) {
        let mut changed = Vec::new();
        let snapped = payload
            .iter()
            .map(|(code, field)| {
                let replacement = match field {
                    FieldValue::Enveloped {
                        value: Value::String(text),
                        ..
                    } => self.snap(code, text),
                    _ => None,
                };
                match replacement {
                    Some(option) => {
                        changed.push(code.clone());
                        (code.clone(), field.with_value(Value::String(option)))
                    }
                    None => (code.clone(), field.clone()),
                }
            })
            .collect();
        (snapped, changed)
    }
}
