//! Terminal output: the live event feed and the score summary.

use vibeaudit_contracts::session::LogKind;
use vibeaudit_core::SessionView;
use vibeaudit_report::{Report, ScoreCategory};

/// Print the rendered events after the first `printed`, each with the
/// current completion estimate. Returns the new count.
pub fn print_events(view: &SessionView, printed: usize) -> usize {
    for event in view.events.iter().skip(printed) {
        let line = format!("{:>3.0}% [{:<8}] {}", view.percent, event.kind.as_str(), event.message);
        match event.kind {
            LogKind::Error | LogKind::Stopped => eprintln!("{line}"),
            _ => println!("{line}"),
        }
    }
    view.events.len().max(printed)
}

fn score_line(score: &ScoreCategory) -> String {
    format!(
        "  {:<12} {:>5.1}  {:<2}  {:<10}  ({} issue{})",
        score.label,
        score.average,
        score.grade.as_str(),
        score.summary.as_str(),
        score.issue_count,
        if score.issue_count == 1 { "" } else { "s" }
    )
}

pub fn print_summary(report: &Report) {
    println!();
    println!("{}", if report.site.is_empty() { "(unknown site)" } else { &report.site });
    println!("  {}", report.config_tags().join(" | "));
    println!("{}", score_line(&report.overall));
    println!("{}", score_line(&report.cta));
    println!("{}", score_line(&report.theme));
    for omission in &report.omissions {
        println!("  omitted {}: {}", omission.url, omission.reason);
    }
    println!();
}
