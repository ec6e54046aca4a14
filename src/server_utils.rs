pub fn sanitize_name(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return "Player".to_string();
    }
    trimmed.chars().take(16).collect()
}

pub fn parse_score_limit(raw: Option<&str>) -> Option<usize> {
    raw.and_then(|value| value.parse::<usize>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_name_applies_trim_empty_and_max_len() {
        assert_eq!(sanitize_name(""), "Player");
        assert_eq!(sanitize_name("   "), "Player");
        assert_eq!(sanitize_name(" Alice "), "Alice");
        assert_eq!(sanitize_name("12345678901234567890"), "1234567890123456");
    }

    #[test]
    fn score_limit_parsing_is_lenient_for_invalid_values() {
        assert_eq!(parse_score_limit(Some("8")), Some(8));
        assert_eq!(parse_score_limit(Some("0")), Some(0));
        assert_eq!(parse_score_limit(Some("abc")), None);
        assert_eq!(parse_score_limit(Some("-1")), None);
        assert_eq!(parse_score_limit(None), None);
    }
}
