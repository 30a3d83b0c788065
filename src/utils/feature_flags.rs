pub fn is_truthy(value: impl AsRef<str>) -> bool {
    matches!(
        value.as_ref().trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

pub fn is_falsy(value: impl AsRef<str>) -> bool {
    matches!(
        value.as_ref().trim().to_lowercase().as_str(),
        "0" | "false" | "no" | "off"
    )
}

/// Reads a boolean flag; unset, empty or unrecognised values yield `default`.
pub fn flag_or(value: Option<&str>, default: bool) -> bool {
    match value {
        Some(raw) if is_truthy(raw) => true,
        Some(raw) if is_falsy(raw) => false,
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_or_falls_back_on_noise() {
        assert!(flag_or(None, true));
        assert!(!flag_or(Some("off"), true));
        assert!(flag_or(Some(" YES "), false));
        assert!(!flag_or(Some("maybe"), false));
    }
}
