use once_cell::sync::Lazy;
use std::collections::HashMap;

/// A flat tool name kept for clients written against the older one-tool-per-call
/// surface. Calling it is the same as calling `tool` with `action` set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolAlias {
    pub name: &'static str,
    pub tool: &'static str,
    pub action: &'static str,
}

pub const BUILTIN_TOOL_ALIASES: &[ToolAlias] = &[
    ToolAlias {
        name: "get_record",
        tool: "kintone_record",
        action: "get",
    },
    ToolAlias {
        name: "search_records",
        tool: "kintone_record",
        action: "search",
    },
    ToolAlias {
        name: "create_record",
        tool: "kintone_record",
        action: "create",
    },
    ToolAlias {
        name: "update_record",
        tool: "kintone_record",
        action: "update",
    },
    ToolAlias {
        name: "add_record_comment",
        tool: "kintone_record",
        action: "add_comment",
    },
    ToolAlias {
        name: "get_apps_info",
        tool: "kintone_app",
        action: "list",
    },
    ToolAlias {
        name: "get_form_fields",
        tool: "kintone_app",
        action: "fields",
    },
    ToolAlias {
        name: "normalize_text",
        tool: "kintone_text",
        action: "normalize",
    },
    ToolAlias {
        name: "logging_get_level",
        tool: "logging",
        action: "get_level",
    },
    ToolAlias {
        name: "logging_set_level",
        tool: "logging",
        action: "set_level",
    },
    ToolAlias {
        name: "logging_send_message",
        tool: "logging",
        action: "send_message",
    },
];

static BUILTIN_TOOL_ALIAS_MAP: Lazy<HashMap<&'static str, ToolAlias>> = Lazy::new(|| {
    BUILTIN_TOOL_ALIASES
        .iter()
        .map(|alias| (alias.name, *alias))
        .collect()
});

pub fn builtin_tool_aliases() -> &'static [ToolAlias] {
    BUILTIN_TOOL_ALIASES
}

pub fn resolve_tool_alias(name: &str) -> Option<ToolAlias> {
    BUILTIN_TOOL_ALIAS_MAP.get(name).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alias_names_are_unique() {
        assert_eq!(BUILTIN_TOOL_ALIAS_MAP.len(), BUILTIN_TOOL_ALIASES.len());
    }

    #[test]
    fn legacy_names_resolve_to_tool_and_action() {
        let alias = resolve_tool_alias("add_record_comment").expect("alias");
        assert_eq!(alias.tool, "kintone_record");
        assert_eq!(alias.action, "add_comment");
        assert!(resolve_tool_alias("kintone_text").is_none());
    }
}
