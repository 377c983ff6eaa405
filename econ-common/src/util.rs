//! Small string helpers.

/// Truncate a string to at most `max_chars` characters, appending "..." if truncated.
///
/// Works on character boundaries, so emoji and CJK text are safe.
pub fn truncate_with_ellipsis(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", s[..idx].trim_end()),
        None => s.to_string(),
    }
}

/// Redact credentials from URLs and messages before logging.
pub fn sanitize_for_log(s: &str) -> String {
    let patterns: &[(&str, &str)] = &[
        (r"(?i)(api[_-]?key)=[^&\s]+", "$1=***REDACTED***"),
        (r"(?i)(token|secret)\s*[=:]\s*[^&\s]{6,}", "$1=***REDACTED***"),
        (r"/bot\d+:[A-Za-z0-9_-]+", "/bot***REDACTED***"),
    ];

    let mut result = s.to_string();
    for (pattern, replacement) in patterns {
        if let Ok(re) = regex::Regex::new(pattern) {
            result = re.replace_all(&result, *replacement).to_string();
        }
    }
    result
}

/// Escape the characters Telegram's HTML parse mode treats as markup.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// Format an integer with thousands separators: 1234567 -> "1,234,567".
pub fn group_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        grouped.push('-');
    }
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_truncate_with_ellipsis() {
        assert_eq!(truncate_with_ellipsis("hello", 10), "hello");
        assert_eq!(truncate_with_ellipsis("hello world", 5), "hello...");
        assert_eq!(truncate_with_ellipsis("📈📈📈📈", 2), "📈📈...");
        assert_eq!(truncate_with_ellipsis("", 10), "");
    }

    #[test]
    fn test_sanitize_fred_url() {
        let url = "https://api.stlouisfed.org/fred/series/observations?series_id=UNRATE&api_key=abcdef0123456789&file_type=json";
        let output = sanitize_for_log(url);
        assert!(!output.contains("abcdef0123456789"));
        assert!(output.contains("api_key=***REDACTED***&file_type=json"));
        assert!(output.contains("series_id=UNRATE"));
    }

    #[test]
    fn test_sanitize_telegram_url() {
        let url = "https://api.telegram.org/bot123456:AAH-secret_part/sendMessage";
        let output = sanitize_for_log(url);
        assert_eq!(output, "https://api.telegram.org/bot***REDACTED***/sendMessage");
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("a < b && c > d"), "a &lt; b &amp;&amp; c &gt; d");
        assert_eq!(escape_html("plain"), "plain");
    }

    #[test_case(0, "0")]
    #[test_case(999, "999")]
    #[test_case(1000, "1,000")]
    #[test_case(231000, "231,000")]
    #[test_case(1234567, "1,234,567")]
    #[test_case(-45000, "-45,000")]
    fn test_group_thousands(value: i64, expected: &str) {
        assert_eq!(group_thousands(value), expected);
    }
}
