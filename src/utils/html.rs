// src/utils/html.rs

/// Sanitizes tutor-supplied rich text (course descriptions, lesson content)
/// with ammonia's whitelist strategy: safe formatting tags survive,
/// <script>/<iframe> and event-handler attributes are stripped.
///
/// This is the fail-safe against stored XSS reaching the student client;
/// the frontend still escapes wherever it renders plain text.
pub fn sanitize_rich_text(input: &str) -> String {
    ammonia::clean(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_script_tags() {
        let cleaned = sanitize_rich_text("<p>Welcome</p><script>alert(1)</script>");
        assert_eq!(cleaned, "<p>Welcome</p>");
    }

    #[test]
    fn test_keeps_formatting() {
        let cleaned = sanitize_rich_text("<b>Lesson 1</b>: variables");
        assert_eq!(cleaned, "<b>Lesson 1</b>: variables");
    }
}
