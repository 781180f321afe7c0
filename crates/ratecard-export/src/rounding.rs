//! Charging interval to rounding rule rewrite

/// Descriptive intervals with a fixed `<first>/<subsequent>` unit rule
const ROUNDING_RULES: [(&str, &str); 8] = [
    ("1 second", "1/1"),
    ("30 seconds", "30/30"),
    ("60 seconds", "60/60"),
    ("1 minute", "60/60"),
    ("1 KB", "1024/1024"),
    ("10 KB", "10240/10240"),
    ("100 KB", "102400/102400"),
    ("1 MB", "1048576/1048576"),
];

/// Rewrite a charging interval; unknown values pass through unchanged
pub fn rounding_rule(interval: Option<&str>) -> Option<String> {
    let interval = interval?;
    let trimmed = interval.trim();
    let rule = ROUNDING_RULES
        .iter()
        .find(|(from, _)| *from == trimmed)
        .map(|(_, to)| *to)
        .unwrap_or(interval);
    Some(rule.to_string())
}
