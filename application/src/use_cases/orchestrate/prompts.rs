//! Input composition for executor, summarizer and validator chains.

use serde_json::{Value, json};
use triad_domain::core::string::{single_line, value_to_text};
use triad_domain::{Agent, ChainInput, ChainType, PlanReport, PreviousTask, Task};

/// JSON document handed to a task's executor chain.
///
/// Carries the plan goal, the task instruction, key-input hints, the points
/// a previous verdict reported as missing and the outputs of the tasks this
/// one depends on.
pub fn task_input(goal: &str, task: &Task, missing: &[String], previous: &[PreviousTask]) -> String {
    let previous_tasks: Vec<Value> = previous
        .iter()
        .map(|p| {
            json!({
                "step": p.step,
                "instruction": p.instruction,
                "output": p.output,
            })
        })
        .collect();

    json!({
        "goal": goal,
        "instruction": task.instruction,
        "key_inputs": task.key_inputs,
        "missing": missing,
        "previous_tasks": previous_tasks,
    })
    .to_string()
}

/// Prompt asking the summarizer to condense one executor output.
pub fn task_summary_prompt(instruction: &str, output: &Value, missing: &[String]) -> String {
    let mut prompt = format!(
        "Summarize the result below so that it directly answers the instruction.\n\n\
         Instruction: {}\n\nResult:\n{}\n",
        single_line(instruction),
        value_to_text(output)
    );
    if !missing.is_empty() {
        prompt.push_str("\nMake sure the summary covers these previously missing points:\n");
        for point in missing {
            prompt.push_str(&format!("- {}\n", point));
        }
    }
    prompt
}

/// Prompt asking the summarizer to answer a plan goal from its task report.
pub fn plan_summary_prompt(report: &PlanReport) -> String {
    let tasks = serde_json::to_string_pretty(&report.tasks).unwrap_or_default();
    format!(
        "Goal: {}\n\nUsing the task results below, answer the goal directly, \
         then recap what each step produced.\n\n{}\n",
        single_line(&report.goal),
        tasks
    )
}

/// Plain recap used when no summarizer answer could be obtained.
pub fn fallback_plan_summary(report: &PlanReport) -> String {
    let mut out = format!("Goal: {}\n", report.goal);
    for task in &report.tasks {
        let result = task
            .result
            .as_ref()
            .map(value_to_text)
            .unwrap_or_else(|| "(no result)".to_string());
        out.push_str(&format!(
            "{}. [{}] {}: {}\n",
            task.step,
            task.status.as_str(),
            single_line(&task.instruction),
            single_line(&result)
        ));
    }
    out
}

/// Validator input for a judgement on `summary` against `instruction`.
pub fn validation_input(validator: &Agent, instruction: &str, summary: &str) -> ChainInput {
    let requirement = format!(
        "Does this result sufficiently fulfill the instruction: {}?",
        single_line(instruction).trim_end_matches('?')
    );
    match validator.chain_type {
        ChainType::Judgement => ChainInput::judgement(requirement, summary),
        other => ChainInput::for_chain(other, &format!("{}\n{}", requirement, summary)),
    }
}
