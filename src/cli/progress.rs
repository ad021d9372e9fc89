// src/cli/progress.rs — Terminal progress renderer for real-time run feedback

use crate::core::types::ProgressEvent;

/// Build a progress callback that writes formatted output to stderr.
///
/// All progress output goes to stderr so stdout remains clean for the report.
/// Returns a closure suitable for `Orchestrator::with_progress()`.
pub fn terminal_progress() -> impl Fn(ProgressEvent) + Send + 'static {
    move |event| {
        if let Some(line) = format_event(&event) {
            eprintln!("{}", line);
        }
    }
}

/// Render one event. Tool calls are implied by their results and print nothing.
pub fn format_event(event: &ProgressEvent) -> Option<String> {
    let line = match event {
        ProgressEvent::RunStart {
            goal,
            skill,
            mode,
            max_iterations,
        } => format!(
            "[start] {} (skill={}, mode={}, max {} iteration(s))",
            goal, skill, mode, max_iterations
        ),
        ProgressEvent::IterationStart {
            iteration,
            max_iterations,
        } => format!("[iter {}/{}]", iteration, max_iterations),
        ProgressEvent::StateChange { iteration, state } => {
            format!("[iter {}] {}", iteration, state)
        }
        ProgressEvent::ToolCall { .. } => return None,
        ProgressEvent::ToolResult {
            iteration,
            tool,
            success,
            message,
        } => format!(
            "[iter {}]   {} {}: {}",
            iteration,
            tool,
            if *success { "ok" } else { "FAILED" },
            crate::util::truncate_str(message, 160)
        ),
        ProgressEvent::DecisionRejected { iteration, reason } => format!(
            "[iter {}]   rejected decision: {}",
            iteration,
            crate::util::truncate_str(reason, 160)
        ),
        ProgressEvent::Complete {
            outcome,
            iterations,
            skill_status,
        } => match skill_status {
            Some(status) => format!(
                "[done] {} after {} iteration(s), skill {}",
                outcome, iterations, status
            ),
            None => format!("[done] {} after {} iteration(s)", outcome, iterations),
        },
    };
    Some(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{ControlMode, Outcome, PipelineState};
    use crate::memory::SkillStatus;
    use crate::tools::ToolName;

    #[test]
    fn test_run_start_format() {
        let line = format_event(&ProgressEvent::RunStart {
            goal: "print 42".into(),
            skill: "print_42".into(),
            mode: ControlMode::Fixed,
            max_iterations: 3,
        });
        assert_eq!(
            line.as_deref(),
            Some("[start] print 42 (skill=print_42, mode=fixed, max 3 iteration(s))")
        );
    }

    #[test]
    fn test_state_change_format() {
        let line = format_event(&ProgressEvent::StateChange {
            iteration: 2,
            state: PipelineState::GiveUp,
        });
        assert_eq!(line.as_deref(), Some("[iter 2] GIVE_UP"));
    }

    #[test]
    fn test_tool_call_is_silent() {
        assert!(format_event(&ProgressEvent::ToolCall {
            iteration: 1,
            tool: ToolName::Execute,
        })
        .is_none());
    }

    #[test]
    fn test_tool_result_format() {
        let line = format_event(&ProgressEvent::ToolResult {
            iteration: 1,
            tool: ToolName::Execute,
            success: false,
            message: "Execution timed out".into(),
        });
        assert_eq!(line.as_deref(), Some("[iter 1]   execute FAILED: Execution timed out"));
    }

    #[test]
    fn test_complete_format() {
        let with_skill = format_event(&ProgressEvent::Complete {
            outcome: Outcome::Success,
            iterations: 1,
            skill_status: Some(SkillStatus::Working),
        });
        assert_eq!(
            with_skill.as_deref(),
            Some("[done] success after 1 iteration(s), skill working")
        );
        let answer = format_event(&ProgressEvent::Complete {
            outcome: Outcome::DirectAnswer,
            iterations: 1,
            skill_status: None,
        });
        assert_eq!(answer.as_deref(), Some("[done] direct answer after 1 iteration(s)"));
    }
}
