//! # vibeaudit-report
//!
//! Turns the worker's final payload into a [`Report`]: category averages with
//! letter grades and summary bands, the page-by-page table, and the flattened
//! CTA and theme findings.
//!
//! ```rust,ignore
//! use vibeaudit_report::aggregate;
//!
//! let report = aggregate(&payload);
//! println!("{} overall: {:.1} ({})", report.site, report.overall.average, report.overall.grade);
//! ```

pub mod aggregate;
pub mod grade;

pub use aggregate::{
    aggregate, decode_screenshot, Category, Finding, Omission, OmissionReason, PageRow,
    PageStatus, Report, ScoreCategory, ScreenshotRef,
};
pub use grade::{Grade, Summary};

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};
    use vibeaudit_contracts::payload::{FinalPayload, Screenshot};

    use super::*;

    fn payload(value: Value) -> FinalPayload {
        serde_json::from_value(value).unwrap()
    }

    fn thought(name: &str, viewport: u32) -> Value {
        json!({
            "element_name": name,
            "issues": format!("{name} is hard to find"),
            "recommendations": format!("make {name} stand out"),
            "viewport_number": viewport,
        })
    }

    /// Two pages, three records, mixed finding counts.
    fn two_page_payload() -> FinalPayload {
        payload(json!({
            "audit_config": {
                "website_type": "SaaS",
                "target_audience": "Developers",
                "primary_goal": "Sign-ups",
                "inferred_tone": null
            },
            "base_domain": "example.com",
            "total_pages_analyzed": 2,
            "results": [
                {
                    "url": "https://example.com/",
                    "validation": { "values": [
                        {
                            "ctas_found": 3, "cta_score": 80, "theme_score": 60,
                            "cta_thoughts": [thought("Hero button", 1), thought("Footer link", 2)],
                            "theme_thoughts": [thought("Palette", 1)]
                        },
                        {
                            "ctas_found": 1, "cta_score": 40, "theme_score": 90,
                            "cta_thoughts": [thought("Nav CTA", 1)],
                            "theme_thoughts": []
                        }
                    ]},
                    "screenshots": { "1": "aGVsbG8=" }
                },
                {
                    "url": "https://example.com/pricing",
                    "validation": { "values": [
                        {
                            "ctas_found": 2, "cta_score": 60, "theme_score": 30,
                            "cta_thoughts": [],
                            "theme_thoughts": [thought("Typography", 3), thought("Contrast", 1)]
                        }
                    ]},
                    "screenshots": { "3": "d29ybGQ=" }
                }
            ]
        }))
    }

    // ── Scores ────────────────────────────────────────────────────────────────

    #[test]
    fn empty_results_yield_zero_and_f() {
        let report = aggregate(&payload(json!({ "base_domain": "empty.io", "results": [] })));
        assert_eq!(report.cta.average, 0.0);
        assert_eq!(report.theme.average, 0.0);
        assert_eq!(report.overall.average, 0.0);
        assert_eq!(report.overall.grade, Grade::F);
        assert_eq!(report.overall.summary, Summary::Critical);
        assert!(report.cta_findings.is_empty());
        assert!(report.page_rows.is_empty());
    }

    #[test]
    fn single_page_overall_is_mean_of_categories() {
        let report = aggregate(&payload(json!({
            "base_domain": "shop.dev",
            "total_pages_analyzed": 1,
            "results": [{
                "url": "https://shop.dev/",
                "validation": { "values": [{ "ctas_found": 2, "cta_score": 45, "theme_score": 72 }] },
                "screenshots": {}
            }]
        })));

        assert_eq!(report.cta.grade, Grade::D);
        assert_eq!(report.theme.grade, Grade::B);
        assert!((report.overall.average - 58.5).abs() < 1e-9);
        assert_eq!(report.overall.grade, Grade::C);
        assert_eq!(report.overall.summary, Summary::NeedsWork);
        assert_eq!(report.overall.summary.to_string(), "Needs Work");
    }

    #[test]
    fn averages_span_every_record() {
        let report = aggregate(&two_page_payload());
        assert!((report.cta.average - 60.0).abs() < 1e-9);
        assert!((report.theme.average - 60.0).abs() < 1e-9);
        assert_eq!(report.cta.grade, Grade::CPlus);
        assert_eq!(report.overall.issue_count, 6);
    }

    #[test]
    fn out_of_range_scores_are_clamped() {
        let report = aggregate(&payload(json!({
            "results": [{
                "url": "https://a.io/",
                "validation": { "values": [{ "cta_score": 150, "theme_score": -20 }] }
            }]
        })));
        assert_eq!(report.cta.average, 100.0);
        assert_eq!(report.theme.average, 0.0);
        assert_eq!(
            report.page_rows[0].status,
            PageStatus::Scored { cta_score: 100.0, theme_score: 0.0, ctas_found: 0 }
        );
    }

    // ── Findings ──────────────────────────────────────────────────────────────

    #[test]
    fn flattened_counts_match_per_record_lists() {
        let source = two_page_payload();
        let report = aggregate(&source);

        let records = source.results.iter().filter_map(|p| p.values()).flatten();
        let cta: usize = records.clone().map(|r| r.cta_thoughts.len()).sum();
        let theme: usize = records.map(|r| r.theme_thoughts.len()).sum();

        assert_eq!(report.cta_findings.len(), cta);
        assert_eq!(report.theme_findings.len(), theme);
        assert_eq!(report.cta.issue_count, 3);
        assert_eq!(report.theme.issue_count, 3);
    }

    #[test]
    fn findings_follow_page_then_record_order() {
        let report = aggregate(&two_page_payload());
        let names: Vec<&str> = report
            .cta_findings
            .iter()
            .map(|f| f.element_name.as_str())
            .collect();
        assert_eq!(names, ["Hero button", "Footer link", "Nav CTA"]);

        let theme: Vec<(usize, &str)> = report
            .theme_findings
            .iter()
            .map(|f| (f.page_index, f.element_name.as_str()))
            .collect();
        assert_eq!(theme, [(0, "Palette"), (1, "Typography"), (1, "Contrast")]);
    }

    #[test]
    fn missing_viewport_screenshot_is_none() {
        let report = aggregate(&payload(json!({
            "results": [{
                "url": "https://a.io/",
                "validation": { "values": [{
                    "cta_score": 50, "theme_score": 50,
                    "cta_thoughts": [thought("Signup", 2)]
                }]},
                "screenshots": { "1": "aGVsbG8=" }
            }]
        })));

        let finding = &report.cta_findings[0];
        assert_eq!(finding.viewport, Some(2));
        assert_eq!(finding.screenshot, None);
        assert_eq!(report.screenshot(finding), None);
    }

    #[test]
    fn screenshot_reference_resolves_per_page() {
        let report = aggregate(&two_page_payload());

        let typography = &report.theme_findings[1];
        assert_eq!(typography.screenshot, Some(ScreenshotRef { page: 1, viewport: 3 }));
        let shot = report.screenshot(typography).unwrap();
        assert_eq!(decode_screenshot(shot).unwrap(), b"world");

        // Viewport 1 exists on page 0 but not on page 1.
        let contrast = &report.theme_findings[2];
        assert_eq!(contrast.screenshot, None);
    }

    #[test]
    fn decode_accepts_data_url_and_rejects_garbage() {
        let shot = Screenshot("data:image/jpeg;base64,aGVsbG8=".to_string());
        assert_eq!(decode_screenshot(&shot).unwrap(), b"hello");

        let bad = Screenshot("not base64 at all!".to_string());
        assert!(decode_screenshot(&bad).is_err());
    }

    // ── Partial payloads ──────────────────────────────────────────────────────

    #[test]
    fn partial_pages_are_omitted_not_fatal() {
        let report = aggregate(&payload(json!({
            "base_domain": "partial.io",
            "results": [
                { "url": "https://partial.io/a", "validation": null },
                { "url": "https://partial.io/b", "validation": { "values": null } },
                { "url": "https://partial.io/c", "error": "timeout loading page" },
                {
                    "url": "https://partial.io/d",
                    "validation": { "values": [{ "cta_score": 70, "theme_score": 70 }] }
                }
            ]
        })));

        assert_eq!(report.cta.average, 70.0);
        assert_eq!(report.omissions.len(), 3);
        assert_eq!(report.omissions[0].reason, OmissionReason::MissingValidation);
        assert_eq!(
            report.omissions[2].reason,
            OmissionReason::PageFailed("timeout loading page".to_string())
        );

        // Failed pages stay in the table; pages without records do not.
        assert_eq!(report.page_rows.len(), 2);
        assert!(matches!(report.page_rows[0].status, PageStatus::Failed { .. }));
        assert_eq!(report.page_rows[1].url, "https://partial.io/d");
    }

    #[test]
    fn page_table_uses_first_record() {
        let report = aggregate(&two_page_payload());
        assert_eq!(
            report.page_rows[0].status,
            PageStatus::Scored { cta_score: 80.0, theme_score: 60.0, ctas_found: 3 }
        );
    }

    // ── Header ────────────────────────────────────────────────────────────────

    #[test]
    fn config_tags_skip_absent_values() {
        let report = aggregate(&two_page_payload());
        assert_eq!(
            report.config_tags(),
            ["SaaS", "Developers", "Sign-ups", "2 pages analyzed"]
        );

        let single = aggregate(&payload(json!({ "total_pages_analyzed": 1 })));
        assert_eq!(single.config_tags(), ["1 page analyzed"]);
    }
}
