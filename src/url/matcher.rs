/// Checks if a name matches a denylist pattern
///
/// Matching is ASCII case-insensitive and supports two kinds of pattern:
/// 1. Exact match: "orderby" matches only "orderby" (any case)
/// 2. Prefix wildcard: "wpf_*" matches any name starting with "wpf_",
///    including the bare prefix itself
///
/// # Examples
///
/// ```
/// use cache_warmer::url::matches_pattern;
///
/// assert!(matches_pattern("orderby", "OrderBy"));
/// assert!(!matches_pattern("orderby", "orderby_desc"));
///
/// assert!(matches_pattern("wpf_*", "wpf_filter_color"));
/// assert!(!matches_pattern("wpf_*", "xwpf_color"));
/// ```
pub fn matches_pattern(pattern: &str, candidate: &str) -> bool {
    if let Some(prefix) = pattern.strip_suffix('*') {
        candidate.len() >= prefix.len()
            && candidate.is_char_boundary(prefix.len())
            && candidate[..prefix.len()].eq_ignore_ascii_case(prefix)
    } else {
        candidate.eq_ignore_ascii_case(pattern)
    }
}

/// Returns the first pattern in `patterns` that matches `candidate`
pub fn first_match<'a>(patterns: &'a [String], candidate: &str) -> Option<&'a str> {
    patterns
        .iter()
        .map(String::as_str)
        .find(|p| matches_pattern(p, candidate))
}
