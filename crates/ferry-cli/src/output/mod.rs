//! Output formatting utilities for the CLI
//!
//! Coloured status lines for stage progress, the final report and errors.

use ferry_deploy::{DeployReport, Stage, StageEvent};

/// Human-readable description of a stage
fn describe(stage: Stage) -> &'static str {
    match stage {
        Stage::Connect => "Connecting",
        Stage::Transfer => "Transferring image",
        Stage::Discover => "Looking for the current container",
        Stage::Stop => "Stopping the current container",
        Stage::Start => "Starting the new container",
    }
}

/// Format a progress event as a single line
pub fn format_stage(event: &StageEvent) -> String {
    match event {
        StageEvent::Started(stage) => format!("{}...", describe(*stage)),
        StageEvent::Completed(stage) => format!("{} done", stage),
        StageEvent::Skipped(stage) => format!("{} skipped", stage),
    }
}

/// Print a progress event
pub fn print_stage(event: &StageEvent) {
    match event {
        StageEvent::Started(_) => print_info(&format_stage(event)),
        StageEvent::Completed(_) => print_success(&format_stage(event)),
        StageEvent::Skipped(_) => print_warning(&format_stage(event)),
    }
}

/// Format a deployment report
pub fn format_report(report: &DeployReport) -> String {
    let mut output = format!(
        "Deployed {} to {} as container {}",
        report.image,
        report.remote_url,
        truncate(&report.container_id, 12)
    );
    if let Some(replaced) = &report.replaced {
        output.push_str(&format!(" (replaced {})", truncate(replaced, 12)));
    }
    output
}

/// Truncate a string if too long
fn truncate(s: &str, max_len: usize) -> &str {
    match s.char_indices().nth(max_len) {
        Some((end, _)) => &s[..end],
        None => s,
    }
}

/// Print a success message in green with a checkmark prefix
pub fn print_success(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stdout = std::io::stdout();
    let _ = crossterm::execute!(
        stdout,
        SetForegroundColor(Color::Green),
        Print("✓ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

/// Print an error message in red with an X prefix
///
/// Outputs to stderr.
pub fn print_error(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stderr = std::io::stderr();
    let _ = crossterm::execute!(
        stderr,
        SetForegroundColor(Color::Red),
        Print("✗ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

/// Print a warning message in yellow
pub fn print_warning(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stderr = std::io::stderr();
    let _ = crossterm::execute!(
        stderr,
        SetForegroundColor(Color::Yellow),
        Print("⚠ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

/// Print an informational message in cyan
pub fn print_info(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stdout = std::io::stdout();
    let _ = crossterm::execute!(
        stdout,
        SetForegroundColor(Color::Cyan),
        Print("ℹ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}
