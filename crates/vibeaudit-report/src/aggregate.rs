//! Builds a [`Report`] from the worker's final payload.
//!
//! Aggregation never fails. Pages the worker could not analyze, or that
//! arrive without validation records, contribute nothing to the scores and
//! are listed in [`Report::omissions`] instead.

use std::fmt;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::{debug, warn};

use vibeaudit_contracts::{
    error::{AuditError, AuditResult},
    payload::{AuditConfig, FinalPayload, PageRecord, Screenshot, Thought},
};

use crate::grade::{clamp_score, Grade, Summary};

// ── Report model ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Cta,
    Theme,
}

impl Category {
    pub fn label(&self) -> &'static str {
        match self {
            Category::Cta => "CTA Score",
            Category::Theme => "Theme Score",
        }
    }

    pub fn issues_title(&self) -> &'static str {
        match self {
            Category::Cta => "CTA Issues",
            Category::Theme => "Theme Issues",
        }
    }
}

/// A derived score with its grade and summary band.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreCategory {
    pub label: String,
    pub average: f64,
    pub grade: Grade,
    pub issue_count: usize,
    pub summary: Summary,
}

impl ScoreCategory {
    pub fn new(label: impl Into<String>, average: f64, issue_count: usize) -> Self {
        let average = clamp_score(average);
        Self {
            label: label.into(),
            average,
            grade: Grade::from_score(average),
            issue_count,
            summary: Summary::from_score(average),
        }
    }
}

/// Weak reference to a screenshot: the page it belongs to and the viewport
/// key in that page's screenshot map. Resolve it with
/// [`Report::screenshot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScreenshotRef {
    pub page: usize,
    pub viewport: u32,
}

/// One flattened finding.
#[derive(Debug, Clone, PartialEq)]
pub struct Finding {
    pub category: Category,
    /// Index into [`Report::pages`].
    pub page_index: usize,
    pub page_url: String,
    pub element_name: String,
    pub issue: String,
    pub recommendation: String,
    pub viewport: Option<u32>,
    /// `None` when the page has no screenshot for the declared viewport.
    pub screenshot: Option<ScreenshotRef>,
}

/// One line of the page-by-page table.
#[derive(Debug, Clone, PartialEq)]
pub struct PageRow {
    pub page_index: usize,
    pub url: String,
    pub status: PageStatus,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PageStatus {
    /// Scores of the page's first validation record.
    Scored {
        cta_score: f64,
        theme_score: f64,
        ctas_found: u32,
    },
    Failed { reason: String },
}

/// A page that contributed nothing to the scores, and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Omission {
    pub page_index: usize,
    pub url: String,
    pub reason: OmissionReason,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OmissionReason {
    /// The worker reported an error for this page.
    PageFailed(String),
    /// No `validation.values` on the page record.
    MissingValidation,
}

impl fmt::Display for OmissionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OmissionReason::PageFailed(reason) => write!(f, "page failed: {reason}"),
            OmissionReason::MissingValidation => f.write_str("no validation records"),
        }
    }
}

/// The aggregated, read-only view of one completed audit.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    /// Site identifier, the payload's `base_domain`.
    pub site: String,
    pub config: AuditConfig,
    pub total_pages_analyzed: u32,
    /// Page records in payload order. Owns the screenshot maps.
    pub pages: Vec<PageRecord>,
    pub cta: ScoreCategory,
    pub theme: ScoreCategory,
    pub overall: ScoreCategory,
    pub page_rows: Vec<PageRow>,
    pub cta_findings: Vec<Finding>,
    pub theme_findings: Vec<Finding>,
    pub omissions: Vec<Omission>,
}

impl Report {
    pub fn findings(&self, category: Category) -> &[Finding] {
        match category {
            Category::Cta => &self.cta_findings,
            Category::Theme => &self.theme_findings,
        }
    }

    pub fn category(&self, category: Category) -> &ScoreCategory {
        match category {
            Category::Cta => &self.cta,
            Category::Theme => &self.theme,
        }
    }

    /// Resolve a finding's screenshot reference against the page map.
    pub fn screenshot(&self, finding: &Finding) -> Option<&Screenshot> {
        let reference = finding.screenshot?;
        self.pages
            .get(reference.page)?
            .screenshots
            .get(&reference.viewport)
    }

    /// Header tags: the echoed audit configuration, then the page count.
    pub fn config_tags(&self) -> Vec<String> {
        let config = &self.config;
        let mut tags: Vec<String> = [
            &config.website_type,
            &config.target_audience,
            &config.primary_goal,
            &config.inferred_tone,
        ]
        .into_iter()
        .flatten()
        .filter(|tag| !tag.trim().is_empty())
        .cloned()
        .collect();

        let n = self.total_pages_analyzed;
        tags.push(format!("{n} page{} analyzed", if n == 1 { "" } else { "s" }));
        tags
    }
}

/// Decode a screenshot's base64 body. A `data:` URL prefix is accepted.
pub fn decode_screenshot(screenshot: &Screenshot) -> AuditResult<Vec<u8>> {
    let raw = screenshot.as_base64().trim();
    let body = match raw.split_once(";base64,") {
        Some((prefix, body)) if prefix.starts_with("data:") => body,
        _ => raw,
    };
    STANDARD
        .decode(body)
        .map_err(|e| AuditError::PayloadDecode {
            reason: format!("screenshot is not valid base64: {e}"),
        })
}

// ── Aggregation ───────────────────────────────────────────────────────────────

/// Aggregate the final payload into a [`Report`].
///
/// Category averages are arithmetic means over every validation record
/// present; with no records they are 0. The overall score is the mean of the
/// two category averages. Findings are flattened in page order, then record
/// order, then list order.
pub fn aggregate(payload: &FinalPayload) -> Report {
    let mut cta_total = 0.0;
    let mut theme_total = 0.0;
    let mut records = 0usize;

    let mut page_rows = Vec::new();
    let mut cta_findings = Vec::new();
    let mut theme_findings = Vec::new();
    let mut omissions = Vec::new();

    for (page_index, page) in payload.results.iter().enumerate() {
        let values = page.values().unwrap_or_default();

        if let Some(reason) = &page.error {
            warn!(page = page_index, url = %page.url, %reason, "page failed during analysis");
            omissions.push(Omission {
                page_index,
                url: page.url.clone(),
                reason: OmissionReason::PageFailed(reason.clone()),
            });
            page_rows.push(PageRow {
                page_index,
                url: page.url.clone(),
                status: PageStatus::Failed {
                    reason: reason.clone(),
                },
            });
        } else if values.is_empty() {
            warn!(page = page_index, url = %page.url, "page has no validation records; omitted");
            omissions.push(Omission {
                page_index,
                url: page.url.clone(),
                reason: OmissionReason::MissingValidation,
            });
        } else {
            let first = &values[0];
            page_rows.push(PageRow {
                page_index,
                url: page.url.clone(),
                status: PageStatus::Scored {
                    cta_score: clamp_score(first.cta_score),
                    theme_score: clamp_score(first.theme_score),
                    ctas_found: first.ctas_found,
                },
            });
        }

        for record in values {
            records += 1;
            cta_total += clamp_score(record.cta_score);
            theme_total += clamp_score(record.theme_score);

            cta_findings.extend(
                record
                    .cta_thoughts
                    .iter()
                    .map(|t| flatten(Category::Cta, page_index, page, t)),
            );
            theme_findings.extend(
                record
                    .theme_thoughts
                    .iter()
                    .map(|t| flatten(Category::Theme, page_index, page, t)),
            );
        }
    }

    let (cta_avg, theme_avg) = if records == 0 {
        (0.0, 0.0)
    } else {
        (cta_total / records as f64, theme_total / records as f64)
    };

    let cta = ScoreCategory::new(Category::Cta.label(), cta_avg, cta_findings.len());
    let theme = ScoreCategory::new(Category::Theme.label(), theme_avg, theme_findings.len());
    let overall = ScoreCategory::new(
        "Overall",
        (cta.average + theme.average) / 2.0,
        cta.issue_count + theme.issue_count,
    );

    debug!(
        site = %payload.base_domain,
        records,
        cta = cta.average,
        theme = theme.average,
        overall = overall.average,
        omitted = omissions.len(),
        "report aggregated"
    );

    Report {
        site: payload.base_domain.clone(),
        config: payload.audit_config.clone(),
        total_pages_analyzed: payload.total_pages_analyzed,
        pages: payload.results.clone(),
        cta,
        theme,
        overall,
        page_rows,
        cta_findings,
        theme_findings,
        omissions,
    }
}

fn flatten(category: Category, page_index: usize, page: &PageRecord, thought: &Thought) -> Finding {
    let screenshot = thought
        .viewport_number
        .filter(|viewport| page.screenshots.contains_key(viewport))
        .map(|viewport| ScreenshotRef {
            page: page_index,
            viewport,
        });

    Finding {
        category,
        page_index,
        page_url: page.url.clone(),
        element_name: thought.element_name.clone(),
        issue: thought.issues.clone(),
        recommendation: thought.recommendations.clone(),
        viewport: thought.viewport_number,
        screenshot,
    }
}
