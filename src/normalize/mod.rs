//! Text clean-up applied to record payloads before they are written.
//!
//! Every string goes through the same stages: literal mojibake correction,
//! NFKC, removal of C0/C1 controls, trimming. The transform is pure, never
//! fails and is idempotent.

mod choices;
mod payload;
mod pipeline;
mod prepare;
mod surrogates;
mod table;

pub use choices::{DropdownChoices, DEFAULT_DROPDOWN_CHOICES};
pub use payload::{normalize_payload, FieldValue, RecordPayload, ENVELOPE_VALUE_KEY};
pub use pipeline::{normalize_string, normalize_text, NormalizeDepth, Normalizer};
pub use prepare::{PreparedRecord, RecordPreparer};
pub use surrogates::{decode_utf16_strip_lone, strip_lone_surrogate_escapes};
pub use table::{default_correction_table, CorrectionTable, KNOWN_MOJIBAKE};
