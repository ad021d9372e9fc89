// src/util.rs — Shared utility functions

/// Truncate a string for display/logging (UTF-8 safe).
///
/// Returns a substring of at most `max_len` bytes, ensuring the cut
/// point falls on a valid UTF-8 character boundary.
pub fn truncate_str(s: &str, max_len: usize) -> &str {
    if s.len() <= max_len {
        s
    } else {
        let mut end = max_len;
        while end > 0 && !s.is_char_boundary(end) {
            end -= 1;
        }
        &s[..end]
    }
}

/// Strip a surrounding markdown code fence (```` ```python ```` or bare ```` ``` ````).
///
/// Models often wrap code in a fence even when told not to. Text without a
/// leading fence is returned trimmed and otherwise untouched.
pub fn strip_code_fences(text: &str) -> String {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed.to_string();
    };
    // Drop the info string ("python", "py", ...) on the opening line
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => "",
    };
    let body = match body.rfind("```") {
        Some(idx) => &body[..idx],
        None => body,
    };
    body.trim().to_string()
}

/// Derive a skill name from a goal: lowercase, spaces to `_`, at most 30
/// characters, only `[a-z0-9_]` kept.
pub fn skill_name_from_goal(goal: &str) -> String {
    let name: String = goal
        .trim()
        .to_lowercase()
        .replace(' ', "_")
        .chars()
        .take(30)
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '_')
        .collect();
    if name.is_empty() {
        "skill".into()
    } else {
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short() {
        assert_eq!(truncate_str("hello", 10), "hello");
    }

    #[test]
    fn test_truncate_long() {
        assert_eq!(truncate_str("hello world", 5), "hello");
    }

    #[test]
    fn test_truncate_multibyte() {
        // "café" is 5 bytes (é = 2 bytes), truncating at 4 should not split é
        assert_eq!(truncate_str("café", 4), "caf");
    }

    #[test]
    fn test_truncate_zero_max() {
        assert_eq!(truncate_str("hello", 0), "");
    }

    #[test]
    fn test_strip_python_fence() {
        let text = "```python\nprint('hi')\n```";
        assert_eq!(strip_code_fences(text), "print('hi')");
    }

    #[test]
    fn test_strip_bare_fence() {
        let text = "  ```\nx = 1\ny = 2\n```  ";
        assert_eq!(strip_code_fences(text), "x = 1\ny = 2");
    }

    #[test]
    fn test_strip_no_fence() {
        assert_eq!(strip_code_fences("\nprint(42)\n"), "print(42)");
    }

    #[test]
    fn test_strip_unclosed_fence() {
        assert_eq!(strip_code_fences("```py\nprint(1)"), "print(1)");
    }

    #[test]
    fn test_skill_name_from_goal() {
        assert_eq!(
            skill_name_from_goal("Create a function that reverses a string"),
            "create_a_function_that_reverse"
        );
        assert_eq!(skill_name_from_goal("Parse CSV!"), "parse_csv");
        assert_eq!(skill_name_from_goal("???"), "skill");
    }
}
