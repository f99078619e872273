use serde_json::Value;

use crate::error::{FlashError, Result};

/// Maximum number of characters of a commit message shown on the dashboard.
pub const MESSAGE_MAX_LEN: usize = 20;

const ELLIPSIS: &str = "...";

const MINUTE: i64 = 60;
const HOUR: i64 = 60 * MINUTE;
const DAY: i64 = 24 * HOUR;
const MONTH: i64 = 30 * DAY;
const YEAR: i64 = 365 * DAY;

/// Describe a number of seconds as a single-unit phrase, e.g. "2 minutes".
pub fn naturaldelta(seconds: i64) -> Result<String> {
    if seconds < 0 {
        return Err(FlashError::malformed(
            "duration",
            format!("negative duration: {seconds}"),
        ));
    }

    let phrase = match seconds {
        0 => "a moment".to_string(),
        1 => "a second".to_string(),
        s if s < MINUTE => format!("{s} seconds"),
        s if s < 2 * MINUTE => "a minute".to_string(),
        s if s < HOUR => format!("{} minutes", s / MINUTE),
        s if s < 2 * HOUR => "an hour".to_string(),
        s if s < DAY => format!("{} hours", s / HOUR),
        s if s < 2 * DAY => "a day".to_string(),
        s if s < MONTH => format!("{} days", s / DAY),
        s if s < 2 * MONTH => "a month".to_string(),
        s if s < YEAR => format!("{} months", s / MONTH),
        s if s < 2 * YEAR => "a year".to_string(),
        s => format!("{} years", s / YEAR),
    };

    Ok(phrase)
}

/// Read a build duration in whole seconds from an upstream JSON value.
pub fn parse_duration(value: &Value) -> Result<i64> {
    match value {
        Value::Number(number) => number.as_i64().ok_or_else(|| {
            FlashError::malformed("duration", format!("not an integer: {number}"))
        }),
        Value::String(text) => text
            .trim()
            .parse::<i64>()
            .map_err(|e| FlashError::malformed("duration", format!("{text:?}: {e}"))),
        Value::Null => Err(FlashError::malformed("duration", "missing")),
        other => Err(FlashError::malformed(
            "duration",
            format!("unexpected value: {other}"),
        )),
    }
}

/// Shorten `text` to [`MESSAGE_MAX_LEN`] characters, ending in an ellipsis.
pub fn truncate(text: &str) -> String {
    truncate_to(text, MESSAGE_MAX_LEN)
}

fn truncate_to(text: &str, max_len: usize) -> String {
    let Some((cut, _)) = text.char_indices().nth(max_len) else {
        return text.to_string();
    };

    let head = &text[..cut];
    let head = match head.rfind(char::is_whitespace) {
        Some(space) if !head[..space].trim_end().is_empty() => head[..space].trim_end(),
        _ => head,
    };

    format!("{head}{ELLIPSIS}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_naturaldelta_minutes() {
        assert_eq!(naturaldelta(125).unwrap(), "2 minutes");
    }

    #[test]
    fn test_naturaldelta_single_units() {
        assert_eq!(naturaldelta(0).unwrap(), "a moment");
        assert_eq!(naturaldelta(1).unwrap(), "a second");
        assert_eq!(naturaldelta(59).unwrap(), "59 seconds");
        assert_eq!(naturaldelta(60).unwrap(), "a minute");
        assert_eq!(naturaldelta(3_600).unwrap(), "an hour");
        assert_eq!(naturaldelta(3 * 3_600 + 1_500).unwrap(), "3 hours");
        assert_eq!(naturaldelta(86_400).unwrap(), "a day");
        assert_eq!(naturaldelta(5 * 86_400).unwrap(), "5 days");
        assert_eq!(naturaldelta(45 * 86_400).unwrap(), "a month");
        assert_eq!(naturaldelta(400 * 86_400).unwrap(), "a year");
        assert_eq!(naturaldelta(3 * 365 * 86_400).unwrap(), "3 years");
    }

    #[test]
    fn test_naturaldelta_never_composes_units() {
        let phrase = naturaldelta(3_900).unwrap();

        assert_eq!(phrase, "an hour");
    }

    #[test]
    fn test_naturaldelta_rejects_negative() {
        let err = naturaldelta(-5).unwrap_err();

        assert!(matches!(
            err,
            FlashError::MalformedField {
                field: "duration",
                ..
            }
        ));
    }

    #[test]
    fn test_parse_duration_accepts_integers_and_integer_strings() {
        assert_eq!(parse_duration(&json!(125)).unwrap(), 125);
        assert_eq!(parse_duration(&json!("42")).unwrap(), 42);
    }

    #[test]
    fn test_parse_duration_rejects_non_integer_values() {
        assert!(parse_duration(&json!("not-a-number")).is_err());
        assert!(parse_duration(&json!(12.5)).is_err());
        assert!(parse_duration(&json!("12.5")).is_err());
        assert!(parse_duration(&Value::Null).is_err());
        assert!(parse_duration(&json!([1])).is_err());
    }

    #[test]
    fn test_truncate_keeps_text_at_limit() {
        let text = "a".repeat(MESSAGE_MAX_LEN);

        assert_eq!(truncate(&text), text);
    }

    #[test]
    fn test_truncate_shortens_text_over_limit() {
        let text = "a".repeat(MESSAGE_MAX_LEN + 1);

        let truncated = truncate(&text);

        assert!(truncated.ends_with(ELLIPSIS));
        assert_eq!(
            truncated,
            format!("{}{ELLIPSIS}", "a".repeat(MESSAGE_MAX_LEN))
        );
    }

    #[test]
    fn test_truncate_breaks_on_word_boundary() {
        assert_eq!(truncate("Fix the flaky build on main"), "Fix the flaky build...");
    }

    #[test]
    fn test_truncate_does_not_split_multibyte_characters() {
        let text = "é".repeat(MESSAGE_MAX_LEN + 5);

        let truncated = truncate(&text);

        assert_eq!(
            truncated,
            format!("{}{ELLIPSIS}", "é".repeat(MESSAGE_MAX_LEN))
        );
    }

    #[test]
    fn test_truncate_ignores_leading_whitespace_as_break_point() {
        let text = format!("   {}", "x".repeat(25));

        let truncated = truncate(&text);

        assert_eq!(truncated, format!("   {}{ELLIPSIS}", "x".repeat(17)));
    }

    #[test]
    fn test_truncate_empty_string() {
        assert_eq!(truncate(""), "");
    }
}
