fn normalize_token(value: &str) -> Vec<char> {
    value
        .trim()
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

fn levenshtein(a: &[char], b: &[char]) -> usize {
    if a == b {
        return 0;
    }
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

fn contains(haystack: &[char], needle: &[char]) -> bool {
    needle.len() <= haystack.len() && haystack.windows(needle.len()).any(|w| w == needle)
}

fn score_candidate(input: &[char], candidate: &str) -> Option<usize> {
    let b = normalize_token(candidate);
    if input.is_empty() || b.is_empty() {
        return None;
    }
    if input == b.as_slice() {
        return Some(0);
    }
    if contains(input, &b) || contains(&b, input) {
        return Some(1);
    }
    Some(levenshtein(input, &b))
}

fn max_allowed_distance(len: usize) -> usize {
    match len {
        0 => 0,
        1..=4 => 1,
        5..=8 => 2,
        _ => (len * 35 / 100).max(3),
    }
}

/// Names from `candidates` close to `input`, best first. Comparison ignores
/// case and punctuation, so `search-records` matches `search_records`.
pub fn suggest(input: &str, candidates: &[String], limit: usize) -> Vec<String> {
    let token = normalize_token(input);
    if token.is_empty() || candidates.is_empty() {
        return Vec::new();
    }
    let allowed = max_allowed_distance(token.len());
    let mut scored: Vec<(&String, usize)> = candidates
        .iter()
        .filter_map(|candidate| {
            score_candidate(&token, candidate)
                .filter(|score| *score <= allowed)
                .map(|score| (candidate, score))
        })
        .collect();
    scored.sort_by(|a, b| {
        a.1.cmp(&b.1)
            .then_with(|| a.0.len().cmp(&b.0.len()))
            .then_with(|| a.0.cmp(b.0))
    });
    let mut out: Vec<String> = Vec::new();
    for (candidate, _) in scored {
        if !out.contains(candidate) {
            out.push(candidate.clone());
        }
        if out.len() >= limit.max(1) {
            break;
        }
    }
    out
}
