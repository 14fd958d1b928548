//! Value previews

/// Characters kept before truncating.
pub const PREVIEW_LIMIT: usize = 50;

/// Appended to truncated previews.
pub const ELLIPSIS: &str = "...";

/// Truncate `text` to [`PREVIEW_LIMIT`] characters, appending [`ELLIPSIS`]
/// only when something was cut.
pub fn preview(text: &str) -> String {
    match text.char_indices().nth(PREVIEW_LIMIT) {
        Some((cut, _)) => format!("{}{}", &text[..cut], ELLIPSIS),
        None => text.to_string(),
    }
}
