//! Shared CLI helpers: task execution with a progress marker, report printing, banner.

use colored::Colorize;
use tokio_util::sync::CancellationToken;

use webpilot_agent::{AgentLoop, Environment, TaskOutcome, TaskReport};

/// Run one task while showing a "working" marker.
pub async fn run_with_progress(
    agent: &AgentLoop,
    task: &str,
    env: &dyn Environment,
    cancel: &CancellationToken,
) -> TaskReport {
    print_working();
    let report = agent.run_task(task, env, cancel).await;
    clear_working();
    report
}

/// Print the outcome of a task to stdout.
pub fn print_report(report: &TaskReport) {
    println!();
    println!("{}", "🧭 Webpilot".cyan().bold());
    println!("{}", report_text(report));
    println!(
        "{}",
        format!(
            "{} iterations · {} LLM calls · {} actions",
            report.iterations, report.decision_attempts, report.tool_invocations
        )
        .dimmed()
    );
    println!();
}

/// User-facing text for a finished task.
pub fn report_text(report: &TaskReport) -> String {
    match &report.outcome {
        TaskOutcome::Done => match report.final_answer.as_deref() {
            Some(answer) if !answer.is_empty() => answer.to_string(),
            _ => "(no answer)".dimmed().to_string(),
        },
        TaskOutcome::StoppedOnLimit => format!(
            "{} the task did not finish within {} iterations.",
            "Stopped:".yellow().bold(),
            report.iterations
        ),
        TaskOutcome::StoppedOnFatalError(e) => {
            format!("{} {e}.", "Error:".red().bold())
        }
        TaskOutcome::Interrupted => format!("{}", "Interrupted.".yellow()),
    }
}

/// Print the banner shown at REPL start.
pub fn print_banner() {
    let version = env!("CARGO_PKG_VERSION");
    println!();
    println!("{}  v{}", "🧭 Webpilot".cyan().bold(), version.dimmed());
    println!(
        "{}",
        "Describe a task for the browser, or \"exit\" to quit.".dimmed()
    );
    println!();
}

fn print_working() {
    eprint!("{}", "⠿ working...".dimmed());
}

fn clear_working() {
    eprint!("\r{}\r", " ".repeat(40));
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use webpilot_agent::FatalError;

    fn report(outcome: TaskOutcome, answer: Option<&str>) -> TaskReport {
        TaskReport {
            outcome,
            iterations: 50,
            decision_attempts: 50,
            tool_invocations: 49,
            final_answer: answer.map(str::to_string),
            transcript: Vec::new(),
        }
    }

    #[test]
    fn done_shows_answer() {
        colored::control::set_override(false);
        let text = report_text(&report(TaskOutcome::Done, Some("The title is Example Domain")));
        assert_eq!(text, "The title is Example Domain");
    }

    #[test]
    fn limit_is_not_an_error() {
        colored::control::set_override(false);
        let text = report_text(&report(TaskOutcome::StoppedOnLimit, None));
        assert_eq!(text, "Stopped: the task did not finish within 50 iterations.");
    }

    #[test]
    fn fatal_error_carries_remediation() {
        colored::control::set_override(false);
        let text = report_text(&report(
            TaskOutcome::StoppedOnFatalError(FatalError::Authentication("invalid key".into())),
            None,
        ));
        assert!(text.starts_with("Error: "));
        assert!(text.contains("API key"));
    }
}
