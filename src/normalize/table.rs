use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;
use unicode_normalization::UnicodeNormalization;

/// Known corrupted renderings of Japanese business vocabulary, paired with the
/// text they were meant to be. Matched literally.
pub const KNOWN_MOJIBAKE: &[(&str, &str)] = &[
    ("繧ｪ繝輔ぅ繧ｹ逕ｨ蜩", "オフィス用品"),
    ("蜃ｺ蠑ｵ譎ゅ", "出張時"),
    ("莠､騾夊ｲｻ", "会議費"),
    ("豸郁怜刀雋ｻ", "交通費"),
    ("謗･蠖ｵ雋ｻ", "接待費"),
    ("豸郁枩蜩∵ｲｻ", "消耗品費"),
    ("騾夊ｨ夊ｲｻ", "通信費"),
    ("蜈画椡雋ｻ", "光熱費"),
    ("縺昴ｎ莉", "その他"),
    ("逕ｳ隲倶ｸｭ", "申請中"),
    ("謇ｿ隱阪☆縺ｿ", "承認済み"),
    ("蟾ｮ縺嶺ｻ倥＠", "差し戻し"),
    ("譬ｪ蠑丈ｼ夂､ｾ繧ｵ繝ｳ繝励Ν蝠莠", "株式会社サンプル商事"),
    ("譛蛾剞莨夂、セ繧オ繝ウ繝励Ν繧オ繝ウ繝励Ν蝠 莠", "株式会社サンプル商事"),
    ("譛蛾剞莨夂､ｾ繧ｵ繝ｳ繝励Ν繧ｵ繝ｳ繝励Ν蝠 莠", "株式会社サンプル商事"),
    ("蜃ｺ蠑ｵ蜈医〒縺ｮ遘ｻ蜍戊ｲｻ逕ｨ縺ｨ縺励※蛻ｩ逕ｨ", "出張時の交通費として使用"),
    ("蜃コ蠑オ譎ゅ ョ繧ソ繧ッ繧キ繝シ莉」縺ィ縺励※菴ソ逕ィ シ域擲莠ャ-蜊 闡蛾俣 シ", "出張時のタクシー代として使用（領収書-枚 添付）"),
    ("蜃ｺ蠑ｵ譎ゅ ｮ繧ｿ繧ｯ繧ｷ繝ｼ莉｣縺ｨ縺励※菴ｿ逕ｨ ｼ域擲莠ｬ-蜊 闡蛾俣 ｼ", "出張時のタクシー代として使用（領収書-枚 添付）"),
    ("\u{FFFD}", ""),
];

static DEFAULT_TABLE: Lazy<Arc<CorrectionTable>> = Lazy::new(|| {
    Arc::new(
        CorrectionTable::new(KNOWN_MOJIBAKE.iter().copied())
            .expect("builtin mojibake table must compile"),
    )
});

pub fn default_correction_table() -> Arc<CorrectionTable> {
    DEFAULT_TABLE.clone()
}

/// Immutable literal-replacement table. All patterns are compiled into a single
/// escaped alternation, longest first, so one sweep replaces every
/// non-overlapping occurrence and a replacement is never re-scanned.
#[derive(Debug)]
pub struct CorrectionTable {
    replacements: HashMap<String, String>,
    matcher: Option<Regex>,
}

impl CorrectionTable {
    pub fn new<'a, I>(entries: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut replacements: HashMap<String, String> = HashMap::new();
        let mut patterns: Vec<String> = Vec::new();
        let mut twins: Vec<(String, String)> = Vec::new();
        for (pattern, replacement) in entries {
            if pattern.is_empty() || replacements.contains_key(pattern) {
                continue;
            }
            replacements.insert(pattern.to_string(), replacement.to_string());
            patterns.push(pattern.to_string());
            let folded: String = pattern.nfkc().collect();
            if folded != pattern {
                twins.push((folded, replacement.to_string()));
            }
        }
        // NFKC turns a halfwidth pattern into its fullwidth twin; the twin is
        // what a later pass sees, so it maps to the same replacement.
        for (folded, replacement) in twins {
            if folded.is_empty() || replacements.contains_key(&folded) {
                continue;
            }
            replacements.insert(folded.clone(), replacement);
            patterns.push(folded);
        }
        if patterns.is_empty() {
            return Ok(Self {
                replacements,
                matcher: None,
            });
        }
        patterns.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        let alternation = patterns
            .iter()
            .map(|pattern| regex::escape(pattern))
            .collect::<Vec<_>>()
            .join("|");
        let matcher = Regex::new(&alternation)?;
        Ok(Self {
            replacements,
            matcher: Some(matcher),
        })
    }

    pub fn empty() -> Self {
        Self {
            replacements: HashMap::new(),
            matcher: None,
        }
    }

    pub fn len(&self) -> usize {
        self.replacements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.replacements.is_empty()
    }

    pub fn correct<'t>(&self, text: &'t str) -> Cow<'t, str> {
        let Some(matcher) = self.matcher.as_ref() else {
            return Cow::Borrowed(text);
        };
        matcher.replace_all(text, |caps: &regex::Captures<'_>| {
            let found = &caps[0];
            self.replacements
                .get(found)
                .cloned()
                .unwrap_or_else(|| found.to_string())
        })
    }
}
