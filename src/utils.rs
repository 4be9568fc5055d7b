/// Extension given to every saved page, whatever format it was stored in
pub const PAGE_EXTENSION: &str = "webp";

/// Number of payload characters that may appear in a log line
pub const PREVIEW_CHARS: usize = 50;

/// Filename for the page with the given 1-based ordinal, e.g. `page_0007.webp`
pub fn page_filename(ordinal: usize) -> String {
    format!("page_{:04}.{}", ordinal, PAGE_EXTENSION)
}

/// First `PREVIEW_CHARS` characters of a payload, for diagnostics
pub fn preview(payload: &str) -> String {
    payload.chars().take(PREVIEW_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_filename_is_zero_padded() {
        assert_eq!(page_filename(1), "page_0001.webp");
        assert_eq!(page_filename(42), "page_0042.webp");
        assert_eq!(page_filename(12345), "page_12345.webp");
    }

    #[test]
    fn test_preview_truncates_on_char_boundary() {
        let long = "é".repeat(80);
        assert_eq!(preview(&long).chars().count(), PREVIEW_CHARS);
        assert_eq!(preview("short"), "short");
    }
}
