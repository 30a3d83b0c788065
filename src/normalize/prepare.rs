use super::choices::DropdownChoices;
use super::payload::RecordPayload;
use super::pipeline::Normalizer;
use serde_json::{Map, Value};

/// A record body ready to be sent, with the codes each stage rewrote.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRecord {
    pub original: RecordPayload,
    pub payload: RecordPayload,
    pub normalized: Vec<String>,
    pub snapped: Vec<String>,
}

impl PreparedRecord {
    /// Codes touched by any stage, sorted and without duplicates.
    pub fn changed_fields(&self) -> Vec<String> {
        self.payload.changed_fields(&self.original)
    }
}

/// Runs text normalization and, when configured, drop-down snapping over an
/// outgoing record body.
#[derive(Debug, Clone, Default)]
pub struct RecordPreparer {
    normalizer: Normalizer,
    choices: Option<DropdownChoices>,
}

impl RecordPreparer {
    pub fn new(normalizer: Normalizer, choices: Option<DropdownChoices>) -> Self {
        Self {
            normalizer,
            choices: choices.filter(|c| !c.is_empty()),
        }
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    pub fn snaps_dropdowns(&self) -> bool {
        self.choices.is_some()
    }

    pub fn prepare(&self, record: Map<String, Value>) -> PreparedRecord {
        let original = RecordPayload::from_map(record);
        let normalized_payload = original.normalized(&self.normalizer);
        let normalized = normalized_payload.changed_fields(&original);
        let (payload, snapped) = match &self.choices {
            Some(choices) => choices.apply(&normalized_payload),
            None => (normalized_payload, Vec::new()),
        };
        PreparedRecord {
            original,
            payload,
            normalized,
            snapped,
        }
    }
}
