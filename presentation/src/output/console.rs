//! Console output formatter for threads

use crate::output::formatter::OutputFormatter;
use colored::{ColoredString, Colorize};
use triad_domain::core::string::{truncate, value_to_text};
use triad_domain::{
    Interaction, InteractionPayload, InteractionStatus, InteractionType, Thread, ThreadStatus,
};

/// Formats threads for console display
#[derive(Debug, Clone, Copy)]
pub struct ThreadFormatter {
    color: bool,
}

impl Default for ThreadFormatter {
    fn default() -> Self {
        Self { color: true }
    }
}

impl ThreadFormatter {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    fn paint(&self, text: &str, style: fn(&str) -> ColoredString) -> String {
        if self.color {
            style(text).to_string()
        } else {
            text.to_string()
        }
    }

    /// Last message an agent sent to the user, if any
    pub fn final_answer(thread: &Thread) -> Option<&str> {
        thread
            .interactions()
            .iter()
            .rev()
            .filter(|i| i.target.is_user() && !i.source.is_user())
            .find_map(|i| i.as_message())
            .map(|m| m.content.as_str())
    }

    fn header(&self, thread: &Thread) -> String {
        let line = "=".repeat(60);
        let status = match thread.status {
            ThreadStatus::Completed => self.paint(thread.status.as_str(), |s| s.green().bold()),
            ThreadStatus::Failed => self.paint(thread.status.as_str(), |s| s.red().bold()),
            _ => self.paint(thread.status.as_str(), |s| s.yellow().bold()),
        };
        format!(
            "{}\nThread {} [{}]\n{}\n",
            self.paint(&line, |s| s.cyan()),
            thread.id,
            status,
            self.paint(&line, |s| s.cyan())
        )
    }

    fn status(&self, status: InteractionStatus) -> String {
        match status {
            InteractionStatus::Success => self.paint(status.as_str(), |s| s.green()),
            InteractionStatus::Failed => self.paint(status.as_str(), |s| s.red()),
            _ => self.paint(status.as_str(), |s| s.yellow()),
        }
    }

    fn interaction(&self, index: usize, interaction: &Interaction) -> String {
        let mut out = format!(
            "[{}] {} -> {}  {}  {}\n",
            index + 1,
            interaction.source,
            interaction.target,
            self.paint(interaction.interaction_type().as_str(), |s| s.bold()),
            self.status(interaction.status)
        );
        out.push_str(&Self::indent(&self.body(interaction), "    "));
        out.push('\n');
        if let Some(error) = &interaction.error {
            out.push_str(&format!(
                "    {} {}: {}\n",
                self.paint("error", |s| s.red().bold()),
                error.code,
                error.message
            ));
        }
        out
    }

    fn body(&self, interaction: &Interaction) -> String {
        match &interaction.payload {
            InteractionPayload::Message(message) => message.content.clone(),
            InteractionPayload::Task(task) => {
                let mut out = format!("step {} on {}: {}", task.step, task.target_agent, task.instruction);
                if let Some(result) = &task.result {
                    out.push_str(&format!("\n=> {}", truncate(&value_to_text(result), 200)));
                }
                out
            }
            InteractionPayload::Plan(plan) => {
                let mut out = format!("Goal: {}", plan.goal);
                for task in &plan.tasks {
                    let after = if task.dependencies.is_empty() {
                        String::new()
                    } else {
                        let deps: Vec<String> = task
                            .dependencies
                            .iter()
                            .filter_map(|dep| plan.task(dep))
                            .map(|dep| dep.step.to_string())
                            .collect();
                        format!(" (after {})", deps.join(", "))
                    };
                    out.push_str(&format!(
                        "\n  {}. {} [{}]{}",
                        task.step, task.instruction, task.target_agent, after
                    ));
                }
                out
            }
            InteractionPayload::ToolCall(call) => {
                let mut out = format!("{}.{}({})", call.tool, call.function, call.parameters);
                if let Some(result) = &call.result {
                    out.push_str(&format!("\n=> {}", truncate(&value_to_text(result), 200)));
                }
                out
            }
            InteractionPayload::Judgement(judgement) => {
                let verdict = if judgement.satisfied {
                    self.paint("satisfied", |s| s.green())
                } else {
                    self.paint("not satisfied", |s| s.red())
                };
                let mut out = format!("{} (score {}): {}", verdict, judgement.score, judgement.feedback);
                if !judgement.analysis.missing.is_empty() {
                    out.push_str(&format!("\nmissing: {}", judgement.analysis.missing.join(", ")));
                }
                out
            }
        }
    }

    /// Indent a multi-line string
    pub fn indent(text: &str, prefix: &str) -> String {
        text.lines()
            .map(|line| format!("{}{}", prefix, line))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl OutputFormatter for ThreadFormatter {
    fn format(&self, thread: &Thread) -> String {
        let mut output = self.header(thread);

        for (index, interaction) in thread.interactions().iter().enumerate() {
            output.push_str(&self.interaction(index, interaction));
        }

        let plans = thread.of_type(InteractionType::Plan).count();
        let tasks = thread.of_type(InteractionType::Task).count();
        output.push_str(&format!(
            "\n{} interactions, {} plans, {} task attempts\n",
            thread.len(),
            plans,
            tasks
        ));

        if let Some(error) = &thread.error {
            output.push_str(&format!("{} {}\n", self.paint("Error:", |s| s.red().bold()), error));
        }
        if let Some(answer) = Self::final_answer(thread) {
            output.push_str(&format!("\n{}\n{}\n", self.paint("Answer:", |s| s.cyan().bold()), answer));
        }
        output
    }

    fn format_json(&self, thread: &Thread) -> String {
        serde_json::to_string_pretty(thread).unwrap_or_else(|_| "{}".to_string())
    }

    fn format_answer(&self, thread: &Thread) -> String {
        match (Self::final_answer(thread), &thread.error) {
            (_, Some(error)) => format!("{} {}", self.paint("Error:", |s| s.red().bold()), error),
            (Some(answer), None) => answer.to_string(),
            (None, None) => String::new(),
        }
    }
}
