use kintone_bridge::normalize::{
    normalize_payload, normalize_text, strip_lone_surrogate_escapes, NormalizeDepth, Normalizer,
    KNOWN_MOJIBAKE,
};
use proptest::prelude::*;
use serde_json::{json, Value};

#[test]
fn known_mojibake_is_corrected() {
    assert_eq!(normalize_text("豸郁怜刀雋ｻ"), "交通費");
    assert_eq!(normalize_text("莠､騾夊ｲｻ"), "会議費");
    assert_eq!(normalize_text("縺昴ｎ莉"), "その他");
}

#[test]
fn every_table_entry_settles_in_one_call() {
    for (pattern, _) in KNOWN_MOJIBAKE {
        let once = normalize_text(pattern);
        assert_eq!(normalize_text(&once), once, "pattern {:?}", pattern);
    }
}

#[test]
fn corrections_inside_longer_text_are_applied() {
    assert_eq!(normalize_text(" 区分:豸郁怜刀雋ｻ\u{0000} "), "区分:交通費");
}

#[test]
fn enveloped_fields_are_cleaned_and_metadata_kept() {
    let out = normalize_payload(&json!({
        "category": {"type": "DROP_DOWN", "value": "  豸郁怜刀雋ｻ  "},
        "amount": {"type": "NUMBER", "value": 1200},
        "memo": "ｶﾀｶﾅ\u{0007}"
    }));
    assert_eq!(
        out,
        json!({
            "category": {"type": "DROP_DOWN", "value": "交通費"},
            "amount": {"type": "NUMBER", "value": 1200},
            "memo": "カタカナ"
        })
    );
}

#[test]
fn lone_surrogate_escape_in_a_request_is_dropped_before_normalizing() {
    let raw = r#"{"note":{"value":" 会\udc86議 "}}"#;
    let parsed: Value =
        serde_json::from_str(&strip_lone_surrogate_escapes(raw)).expect("cleaned json parses");
    assert_eq!(
        normalize_payload(&parsed),
        json!({"note": {"value": "会議"}})
    );
}

#[test]
fn deep_normalizer_reaches_sub_table_cells() {
    let normalizer = Normalizer::default().with_depth(NormalizeDepth::Deep);
    let out = normalizer.normalize_payload(&json!({
        "expenses": {"type": "SUBTABLE", "value": [
            {"id": "1", "value": {"kind": {"type": "DROP_DOWN", "value": "莠､騾夊ｲｻ "}}}
        ]}
    }));
    assert_eq!(
        out["expenses"]["value"][0]["value"]["kind"]["value"],
        json!("会議費")
    );
}

fn interesting_text() -> impl Strategy<Value = String> {
    let pieces = prop_oneof![
        Just("豸郁怜刀雋ｻ".to_string()),
        Just("莠､騾夊ｲｻ".to_string()),
        Just("縺昴ｎ莉".to_string()),
        Just("\u{0007}".to_string()),
        Just("\u{0085}".to_string()),
        Just("\u{3000}".to_string()),
        Just("\u{0301}".to_string()),
        Just("\u{FFFD}".to_string()),
        Just("ｶ".to_string()),
        Just(" ".to_string()),
        "\\PC{0,4}",
    ];
    prop::collection::vec(pieces, 0..8).prop_map(|parts| parts.concat())
}

fn leaf_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        interesting_text().prop_map(Value::String),
        any::<i64>().prop_map(|n| json!(n)),
        any::<bool>().prop_map(Value::Bool),
        Just(Value::Null),
    ]
}

fn field_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        leaf_value(),
        leaf_value().prop_map(|v| json!({"type": "SINGLE_LINE_TEXT", "value": v})),
        prop::collection::vec(leaf_value(), 0..3).prop_map(|items| json!({"value": items})),
    ]
}

proptest! {
    #[test]
    fn normalization_is_idempotent(text in interesting_text()) {
        let once = normalize_text(&text);
        prop_assert_eq!(normalize_text(&once), once);
    }

    #[test]
    fn output_has_no_controls_and_no_outer_whitespace(text in interesting_text()) {
        let out = normalize_text(&text);
        prop_assert!(!out.chars().any(|c| matches!(c as u32, 0x00..=0x1F | 0x7F..=0x9F)));
        prop_assert_eq!(out.trim(), out.as_str());
    }

    #[test]
    fn payload_keeps_its_field_codes(
        record in prop::collection::btree_map("[a-z_]{1,8}", field_value(), 0..6)
    ) {
        let input = Value::Object(record.into_iter().collect());
        let out = normalize_payload(&input);
        let in_keys: Vec<&String> = input.as_object().expect("object").keys().collect();
        let out_keys: Vec<&String> = out.as_object().expect("object").keys().collect();
        prop_assert_eq!(in_keys, out_keys);
        prop_assert_eq!(normalize_payload(&out), out);
    }
}
