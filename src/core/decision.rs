// src/core/decision.rs — Strict parsing of dynamic-mode oracle decisions

use serde::Deserialize;

use crate::infra::errors::SkillforgeError;
use crate::tools::{Params, ToolName};
use crate::util::truncate_str;

/// Raw reply text kept on a MalformedDecision error.
const RAW_PREVIEW: usize = 300;

/// One step chosen by the oracle.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Decision {
    Tool {
        tool: ToolName,
        #[serde(default)]
        params: Params,
    },
    Complete,
    Failed {
        reason: String,
    },
    DirectAnswer {
        response: String,
    },
}

/// Parse the first balanced JSON object in `reply` into a `Decision`.
///
/// Code fences and surrounding prose are tolerated. An unknown action or
/// tool, a missing field or invalid JSON is a `MalformedDecision`.
pub fn parse_decision(reply: &str) -> Result<Decision, SkillforgeError> {
    let malformed = |reason: String| SkillforgeError::MalformedDecision {
        raw: truncate_str(reply.trim(), RAW_PREVIEW).to_string(),
        reason,
    };

    let object = first_json_object(reply).ok_or_else(|| malformed("no JSON object found".into()))?;
    serde_json::from_str(object).map_err(|e| malformed(e.to_string()))
}

/// The first `{...}` with balanced braces, ignoring braces inside strings.
pub fn first_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_parse_tool_decision() {
        let d = parse_decision(r#"{"action":"tool","tool":"generate","params":{"attempt":2}}"#).unwrap();
        let Decision::Tool { tool, params } = d else {
            panic!("expected tool decision");
        };
        assert_eq!(tool, ToolName::Generate);
        assert_eq!(params.get("attempt"), Some(&json!(2)));
    }

    #[test]
    fn test_tool_params_default_empty() {
        let d = parse_decision(r#"{"action":"tool","tool":"execute"}"#).unwrap();
        assert_eq!(
            d,
            Decision::Tool {
                tool: ToolName::Execute,
                params: Params::new()
            }
        );
    }

    #[test]
    fn test_parse_terminal_decisions() {
        assert_eq!(parse_decision(r#"{"action":"complete"}"#).unwrap(), Decision::Complete);
        assert_eq!(
            parse_decision(r#"{"action":"failed","reason":"cannot do it"}"#).unwrap(),
            Decision::Failed {
                reason: "cannot do it".into()
            }
        );
        assert_eq!(
            parse_decision(r#"{"action":"direct_answer","response":"Paris"}"#).unwrap(),
            Decision::DirectAnswer {
                response: "Paris".into()
            }
        );
    }

    #[test]
    fn test_fenced_and_prose_wrapped() {
        let reply = "Sure, here you go:\n```json\n{\"action\": \"complete\"}\n```\nGood luck {not json}";
        assert_eq!(parse_decision(reply).unwrap(), Decision::Complete);
    }

    #[test]
    fn test_braces_inside_strings() {
        let reply = r#"{"action":"direct_answer","response":"use {} and \"}\" freely"}"#;
        assert_eq!(
            parse_decision(reply).unwrap(),
            Decision::DirectAnswer {
                response: r#"use {} and "}" freely"#.into()
            }
        );
    }

    #[test]
    fn test_malformed_inputs() {
        let cases = [
            "no json at all",
            r#"{"action":"tool","tool":"shell"}"#,
            r#"{"action":"tool"}"#,
            r#"{"action":"failed"}"#,
            r#"{"action":"dance"}"#,
            r#"{"action":"complete""#,
        ];
        for reply in cases {
            let err = parse_decision(reply).unwrap_err();
            assert!(
                matches!(err, SkillforgeError::MalformedDecision { .. }),
                "expected malformed for {reply}"
            );
        }
    }

    #[test]
    fn test_first_json_object_nested() {
        let text = r#"x {"a":{"b":1}} {"c":2}"#;
        assert_eq!(first_json_object(text), Some(r#"{"a":{"b":1}}"#));
        assert_eq!(first_json_object("{ unbalanced"), None);
    }
}
