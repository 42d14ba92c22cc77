//! Completion estimate for a running session.

use crate::timeline::Timeline;

/// Steps the agent typically takes on one page.
pub const EXPECTED_STEPS_PER_PAGE: f64 = 8.0;

/// Largest share of its own page a page in progress may claim before the
/// worker reports it complete.
pub const CURRENT_PAGE_CAP: f64 = 0.9;

/// Estimate completion as a percentage in `[0, 100]`.
///
/// Completed pages count in full. While a page is in progress (more pages
/// started than completed) it contributes `min(steps / 8, 0.9)` of one
/// page's share. Not guaranteed monotonic.
pub fn estimate(timeline: &Timeline, max_pages: u32) -> f64 {
    if max_pages == 0 {
        return 0.0;
    }
    let max_pages = f64::from(max_pages);
    let completed = timeline.pages_completed();
    let started = timeline.pages_started();

    let current_page = if started > completed {
        let steps = timeline.steps_since_last_progress() as f64;
        (steps / EXPECTED_STEPS_PER_PAGE).min(CURRENT_PAGE_CAP) / max_pages * 100.0
    } else {
        0.0
    };

    let total = completed as f64 / max_pages * 100.0 + current_page;
    total.clamp(0.0, 100.0)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use vibeaudit_contracts::session::{LogEvent, LogKind};

    use super::estimate;
    use crate::timeline::Timeline;

    fn push(timeline: &mut Timeline, kind: LogKind, message: &str) {
        timeline.append(LogEvent::new(kind, message));
    }

    #[test]
    fn empty_timeline_is_zero() {
        assert_eq!(estimate(&Timeline::new(), 3), 0.0);
    }

    #[test]
    fn zero_page_budget_is_zero() {
        let mut timeline = Timeline::new();
        push(&mut timeline, LogKind::Progress, "Analyzing Page 1/1");
        assert_eq!(estimate(&timeline, 0), 0.0);
    }

    /// progress, progress, "Page 1 analysis complete" with a budget of 3:
    /// page 1 counts in full and page 2 can add at most 30%.
    #[test]
    fn second_page_in_flight() {
        let mut timeline = Timeline::new();
        push(&mut timeline, LogKind::Progress, "Analyzing Page 1/3");
        push(&mut timeline, LogKind::Progress, "Analyzing Page 2/3");
        push(&mut timeline, LogKind::Success, "Page 1 analysis complete");

        assert_eq!(timeline.pages_started(), 2);
        assert_eq!(timeline.pages_completed(), 1);

        let page_one = 100.0 / 3.0;
        let pct = estimate(&timeline, 3);
        assert!((pct - page_one).abs() < 1e-9, "got {pct}");

        for i in 0..4 {
            push(&mut timeline, LogKind::Step, &format!("Step {}", i + 1));
        }
        let pct = estimate(&timeline, 3);
        assert!(pct > page_one, "steps must add progress, got {pct}");
        assert!(pct < page_one + 30.0, "page 2 must stay below its cap, got {pct}");
    }

    #[test]
    fn current_page_contribution_is_capped() {
        let mut timeline = Timeline::new();
        push(&mut timeline, LogKind::Progress, "Analyzing Page 1/1");
        for i in 0..50 {
            push(&mut timeline, LogKind::Step, &format!("Step {i}"));
        }
        let pct = estimate(&timeline, 1);
        assert!((pct - 90.0).abs() < 1e-9, "got {pct}");
    }

    #[test]
    fn all_pages_complete_is_hundred() {
        let mut timeline = Timeline::new();
        for page in 1..=2 {
            push(&mut timeline, LogKind::Progress, &format!("Analyzing Page {page}/2"));
            push(&mut timeline, LogKind::Success, &format!("Page {page} analysis complete"));
        }
        assert_eq!(estimate(&timeline, 2), 100.0);
    }

    /// More completion markers than the budget still reports at most 100.
    #[test]
    fn bounded_for_adversarial_timelines() {
        let mut timeline = Timeline::new();
        for _ in 0..10 {
            push(&mut timeline, LogKind::Info, "Page analysis complete");
        }
        for budget in 1..=5 {
            let pct = estimate(&timeline, budget);
            assert!((0.0..=100.0).contains(&pct), "budget {budget}: {pct}");
        }

        let mut timeline = Timeline::new();
        for _ in 0..10 {
            push(&mut timeline, LogKind::Progress, "Analyzing");
            push(&mut timeline, LogKind::Step, "Step");
        }
        for budget in 1..=5 {
            let pct = estimate(&timeline, budget);
            assert!((0.0..=100.0).contains(&pct), "budget {budget}: {pct}");
        }
    }
}
