// src/stats/host.rs

/// Returns true when `host` is safe to hand to a probe: letters, digits, `.`, `:`, `_` and
/// `-` only. A leading `-` is refused so the value can never be taken for a ping option.
pub fn is_valid_host(host: &str) -> bool {
    !host.is_empty()
        && !host.starts_with('-')
        && host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | ':' | '_' | '-'))
}
