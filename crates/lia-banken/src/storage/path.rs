use chrono::{DateTime, Utc};

const MAX_FILENAME_LEN: usize = 96;

/// Replace anything outside `[A-Za-z0-9._-]` with `_` and cap the length.
pub fn sanitize_filename(filename: &str) -> String {
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();

    let mut cleaned: String = base
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '_' | '-') {
                ch
            } else {
                '_'
            }
        })
        .collect();

    while cleaned.starts_with('.') {
        cleaned.remove(0);
    }
    if cleaned.is_empty() {
        cleaned.push_str("upload");
    }
    if cleaned.len() > MAX_FILENAME_LEN {
        let cut = cleaned.len() - MAX_FILENAME_LEN;
        cleaned.drain(..cut);
    }
    cleaned
}

/// `<prefix>/<owner>/<unix-seconds>-<sanitised filename>`
pub fn object_path(
    prefix: &str,
    owner: impl std::fmt::Display,
    filename: &str,
    now: DateTime<Utc>,
) -> String {
    format!(
        "{}/{}/{}-{}",
        prefix.trim_matches('/'),
        owner,
        now.timestamp(),
        sanitize_filename(filename)
    )
}
