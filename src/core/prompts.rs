// src/core/prompts.rs — Oracle prompt templates

use crate::memory::Failure;
use crate::tools::ToolDescriptor;
use crate::util::truncate_str;

/// Characters of each past failure's code shown back to the generator.
const FAILURE_CODE_PREVIEW: usize = 100;

/// Test output shown to the evaluator is capped at this many bytes.
const EVALUATION_OUTPUT_MAX: usize = 4_000;

pub struct GenerationPrompt<'a> {
    pub goal: &'a str,
    pub skill: &'a str,
    pub attempt: u32,
    pub max_attempts: u32,
    pub failures: &'a [Failure],
}

impl GenerationPrompt<'_> {
    pub fn system(&self) -> String {
        let mut prompt = String::from(
            "You are an autonomous Python skill developer. Create a complete, working Python skill.\n\n",
        );
        prompt.push_str(&format!("GOAL: {}\n", self.goal));
        prompt.push_str(&format!("SKILL NAME: {}\n", self.skill));
        prompt.push_str(&format!(
            "ITERATION: {}/{}\n",
            self.attempt, self.max_attempts
        ));

        if !self.failures.is_empty() {
            prompt.push_str("\nPREVIOUS FAILURES TO AVOID:\n");
            for f in self.failures {
                prompt.push_str(&format!(
                    "- {}\n  Code: {}...\n",
                    f.error.trim(),
                    truncate_str(&f.code_snippet, FAILURE_CODE_PREVIEW)
                ));
            }
        }

        prompt.push_str(
            "\nREQUIREMENTS:\n\
             1. Write complete, self-contained Python code\n\
             2. Include proper error handling\n\
             3. Add a test harness at the bottom (if __name__ == \"__main__\":)\n\
             4. Do not call eval, exec, compile, os.system, subprocess or __import__, \
             and do not open files for writing\n\
             5. Avoid patterns from previous failures\n\n\
             OUTPUT ONLY THE PYTHON CODE, nothing else. No markdown, no explanations.",
        );
        prompt
    }
}

pub fn evaluation_system(goal: &str, skill: &str, output: &str) -> String {
    format!(
        "Analyze this test result and determine if the skill is working correctly.\n\n\
         SKILL: {skill}\n\
         GOAL: {goal}\n\n\
         TEST RESULT:\n{}\n\n\
         Is the skill working correctly? Respond with:\n\
         - \"SUCCESS: <brief reason>\" if working\n\
         - \"FAILURE: <specific error to fix>\" if not working\n\n\
         Be strict: only mark as SUCCESS if output shows clear success.",
        truncate_str(output, EVALUATION_OUTPUT_MAX)
    )
}

/// Format a sandbox result for the evaluator the way a human would read it.
pub fn test_output(success: bool, stdout: &str, stderr: &str) -> String {
    if success {
        stdout.to_string()
    } else {
        format!("ERROR:\n{stderr}\n\nOUTPUT:\n{stdout}")
    }
}

pub struct DecisionPrompt<'a> {
    pub goal: &'a str,
    pub state_summary: &'a str,
    pub tools: &'a [ToolDescriptor],
    pub history: &'a [String],
    pub iteration: u32,
    pub max_iterations: u32,
}

impl DecisionPrompt<'_> {
    pub fn system(&self) -> String {
        let mut prompt = String::from(
            "You control a loop that builds and verifies Python skills. \
             At each step choose exactly one action.\n\nAVAILABLE TOOLS:\n",
        );
        for tool in self.tools {
            prompt.push_str(&format!(
                "- {} ({}): {}\n  params: {}\n",
                tool.name, tool.category, tool.description, tool.parameters
            ));
        }
        prompt.push_str(
            "\nRespond with ONE JSON object and nothing else:\n\
             {\"action\":\"tool\",\"tool\":\"<name>\",\"params\":{...}}\n\
             {\"action\":\"complete\"}   when the skill is generated, persisted, executed and evaluated as working\n\
             {\"action\":\"failed\",\"reason\":\"...\"}   when the goal cannot be achieved\n\
             {\"action\":\"direct_answer\",\"response\":\"...\"}   when the goal needs no code at all",
        );
        prompt
    }

    pub fn user(&self) -> String {
        let mut msg = format!(
            "GOAL: {}\nSTEP: {}/{}\n\nSTATE:\n{}\n",
            self.goal,
            self.iteration + 1,
            self.max_iterations,
            self.state_summary
        );
        if self.history.is_empty() {
            msg.push_str("\nHISTORY: (none)\n");
        } else {
            msg.push_str("\nHISTORY:\n");
            for entry in self.history {
                msg.push_str(&format!("- {entry}\n"));
            }
        }
        msg
    }
}
