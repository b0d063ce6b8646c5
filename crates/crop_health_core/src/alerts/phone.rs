/// Normalizes a stored phone number for SMS dispatch and dedup.
///
/// All whitespace is removed. A number that already starts with `+` is kept
/// as-is; otherwise leading zeros are dropped and `+` is prepended. Returns
/// `None` when nothing dialable remains.
pub fn normalize_phone(raw: &str) -> Option<String> {
    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();

    if compact.starts_with('+') {
        return (compact.len() > 1).then_some(compact);
    }

    let digits = compact.trim_start_matches('0');
    if digits.is_empty() {
        None
    } else {
        Some(format!("+{digits}"))
    }
}
