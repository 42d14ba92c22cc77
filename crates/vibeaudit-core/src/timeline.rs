//! Event classification and the append-only session timeline.
//!
//! Classification is a total function from the worker's wire tag to a
//! `LogKind`. The timeline keeps every event in arrival order: nothing is
//! reordered, deduplicated, or removed. Dividers stay in the timeline and are
//! filtered only when rendering.

use vibeaudit_contracts::{
    session::{LogEvent, LogKind},
    wire::RawLog,
};

/// Phrase the worker puts in a log line when it finishes one page.
///
/// Matched case-sensitively, so the worker's closing
/// "Analysis complete. Analyzed N pages." summary is not counted as a page.
// TODO: switch to a structured page-complete field once the worker emits one.
pub const PAGE_COMPLETE_MARKER: &str = "analysis complete";

/// Map one raw wire log to a timeline event.
pub fn classify(raw: &RawLog) -> LogEvent {
    LogEvent {
        kind: LogKind::from_tag(raw.kind.as_deref()),
        message: raw.message.clone(),
        viewport: raw.viewport,
    }
}

/// The ordered record of everything a session has reported.
#[derive(Debug, Clone, Default)]
pub struct Timeline {
    events: Vec<LogEvent>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one event at the end.
    pub fn append(&mut self, event: LogEvent) {
        self.events.push(event);
    }

    /// Every event, in arrival order, dividers included.
    pub fn events(&self) -> &[LogEvent] {
        &self.events
    }

    /// The events the presentation layer should display.
    pub fn rendered(&self) -> impl Iterator<Item = &LogEvent> {
        self.events.iter().filter(|e| e.kind.is_rendered())
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn last(&self) -> Option<&LogEvent> {
        self.events.last()
    }

    /// Number of `progress` events: one per page the worker has begun.
    pub fn pages_started(&self) -> usize {
        self.count_kind(LogKind::Progress)
    }

    /// Number of events whose message carries the page-complete phrase.
    pub fn pages_completed(&self) -> usize {
        self.events
            .iter()
            .filter(|e| e.message.contains(PAGE_COMPLETE_MARKER))
            .count()
    }

    /// Number of `step` events after the most recent `progress` event.
    pub fn steps_since_last_progress(&self) -> usize {
        self.events
            .iter()
            .rev()
            .take_while(|e| e.kind != LogKind::Progress)
            .filter(|e| e.kind == LogKind::Step)
            .count()
    }

    fn count_kind(&self, kind: LogKind) -> usize {
        self.events.iter().filter(|e| e.kind == kind).count()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use vibeaudit_contracts::{
        session::{LogEvent, LogKind},
        wire::RawLog,
    };

    use super::{classify, Timeline};

    fn raw(message: &str, kind: Option<&str>) -> RawLog {
        RawLog {
            message: message.to_string(),
            kind: kind.map(str::to_string),
            viewport: None,
        }
    }

    fn timeline_of(items: &[(&str, Option<&str>)]) -> Timeline {
        let mut timeline = Timeline::new();
        for (message, kind) in items {
            timeline.append(classify(&raw(message, *kind)));
        }
        timeline
    }

    #[test]
    fn classify_uses_wire_tag() {
        let event = classify(&raw("Analyzing Page 1/3", Some("progress")));
        assert_eq!(event.kind, LogKind::Progress);
        assert_eq!(event.message, "Analyzing Page 1/3");
    }

    #[test]
    fn classify_defaults_to_info() {
        assert_eq!(classify(&raw("hello", None)).kind, LogKind::Info);
        assert_eq!(classify(&raw("careful", Some("warning"))).kind, LogKind::Info);
    }

    #[test]
    fn classify_keeps_viewport() {
        let mut r = raw("Analyzing hero", Some("step"));
        r.viewport = Some(2);
        assert_eq!(classify(&r).viewport, Some(2));
    }

    /// Repeated events are kept, in the order received.
    #[test]
    fn append_preserves_order_and_duplicates() {
        let timeline = timeline_of(&[
            ("a", Some("info")),
            ("a", Some("info")),
            ("b", Some("step")),
            ("a", Some("info")),
        ]);
        let messages: Vec<&str> = timeline.events().iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, vec!["a", "a", "b", "a"]);
    }

    #[test]
    fn dividers_are_kept_but_not_rendered() {
        let timeline = timeline_of(&[
            ("start", Some("info")),
            ("----", Some("divider")),
            ("next", Some("success")),
        ]);
        assert_eq!(timeline.len(), 3);
        let rendered: Vec<&LogEvent> = timeline.rendered().collect();
        assert_eq!(rendered.len(), 2);
        assert!(rendered.iter().all(|e| e.kind != LogKind::Divider));
    }

    #[test]
    fn page_counters() {
        let timeline = timeline_of(&[
            ("Analyzing Page 1/3", Some("progress")),
            ("Page 1 analysis complete", Some("success")),
            ("Analyzing Page 2/3", Some("progress")),
        ]);
        assert_eq!(timeline.pages_started(), 2);
        assert_eq!(timeline.pages_completed(), 1);
    }

    /// The worker's closing summary starts with a capital letter and is not
    /// a page completion.
    #[test]
    fn closing_summary_is_not_a_page() {
        let timeline = timeline_of(&[
            ("Page 1 analysis complete", Some("success")),
            ("Analysis complete. Analyzed 1 pages.", Some("success")),
        ]);
        assert_eq!(timeline.pages_completed(), 1);
    }

    #[test]
    fn steps_counted_only_after_last_progress() {
        let timeline = timeline_of(&[
            ("Analyzing Page 1/2", Some("progress")),
            ("Step 1", Some("step")),
            ("Step 2", Some("step")),
            ("Analyzing Page 2/2", Some("progress")),
            ("Step 1", Some("step")),
            ("thinking", Some("thought")),
        ]);
        assert_eq!(timeline.steps_since_last_progress(), 1);
    }

    #[test]
    fn steps_without_any_progress_count_all() {
        let timeline = timeline_of(&[("Step 1", Some("step")), ("Step 2", Some("step"))]);
        assert_eq!(timeline.steps_since_last_progress(), 2);
    }
}
