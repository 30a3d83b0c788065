use std::borrow::Cow;

fn is_high_surrogate(unit: u16) -> bool {
    (0xD800..=0xDBFF).contains(&unit)
}

fn is_low_surrogate(unit: u16) -> bool {
    (0xDC00..=0xDFFF).contains(&unit)
}

/// Decodes UTF-16, dropping every code unit that is not part of a valid
/// surrogate pair.
pub fn decode_utf16_strip_lone(units: &[u16]) -> String {
    char::decode_utf16(units.iter().copied())
        .filter_map(Result::ok)
        .collect()
}

fn read_escaped_unit(bytes: &[u8], at: usize) -> Option<u16> {
    if bytes.get(at) != Some(&b'\\') || bytes.get(at + 1) != Some(&b'u') {
        return None;
    }
    let hex = bytes.get(at + 2..at + 6)?;
    if !hex.iter().all(u8::is_ascii_hexdigit) {
        return None;
    }
    let text = std::str::from_utf8(hex).ok()?;
    u16::from_str_radix(text, 16).ok()
}

/// Removes `\uXXXX` escapes that encode an unpaired surrogate from a raw JSON
/// document. `serde_json` rejects such escapes outright, while a client that
/// produced them still expects the rest of its request to be honoured.
pub fn strip_lone_surrogate_escapes(raw: &str) -> Cow<'_, str> {
    if !raw.contains("\\u") {
        return Cow::Borrowed(raw);
    }
    let bytes = raw.as_bytes();
    let mut out = String::new();
    let mut copied = 0;
    let mut idx = 0;
    while idx < bytes.len() {
        if bytes[idx] != b'\\' {
            idx += 1;
            continue;
        }
        match read_escaped_unit(bytes, idx) {
            Some(unit) if is_high_surrogate(unit) => {
                let paired = read_escaped_unit(bytes, idx + 6)
                    .map(is_low_surrogate)
                    .unwrap_or(false);
                if paired {
                    idx += 12;
                    continue;
                }
                out.push_str(&raw[copied..idx]);
                idx += 6;
                copied = idx;
            }
            Some(unit) if is_low_surrogate(unit) => {
                out.push_str(&raw[copied..idx]);
                idx += 6;
                copied = idx;
            }
            Some(_) => idx += 6,
            // `\\`, `\"` and friends: skip the escaped character as well.
            None => idx += 2,
        }
    }
    if copied == 0 {
        return Cow::Borrowed(raw);
    }
    out.push_str(&raw[copied..]);
    Cow::Owned(out)
}
