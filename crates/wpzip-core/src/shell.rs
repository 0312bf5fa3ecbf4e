//! POSIX shell quoting for values embedded in remote command lines.

/// Wrap `value` in single quotes, escaping embedded quotes as `'\''`.
#[must_use]
pub fn single_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Leave shell-safe words untouched and single-quote everything else.
#[must_use]
pub fn quote_if_needed(value: &str) -> String {
    let safe = !value.is_empty()
        && value
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || "._-/:@%+=,".contains(ch));
    if safe {
        value.to_string()
    } else {
        single_quote(value)
    }
}
