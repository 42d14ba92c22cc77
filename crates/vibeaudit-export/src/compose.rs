//! Lays a [`Report`] out as blocks, in document order.
//!
//! Text is measured with a fixed average glyph width for Helvetica, which
//! keeps layout independent of font files and fully deterministic.

use vibeaudit_report::{Category, Finding, PageStatus, Report, ScoreCategory, Summary};

use crate::layout::{Block, Color, Font, Item, Row};

/// Average Helvetica advance as a fraction of the font size, rounded up.
const GLYPH_WIDTH_EM: f64 = 0.55;

const SCREENSHOT_W: f64 = 200.0;
const SCREENSHOT_H: f64 = 125.0;

const FOOTER_NOTE: &str = "This report was automatically generated by the VibeAudit Agent. \
Scores and recommendations are based on automated analysis and may require human review.";

// ── Text helpers ──────────────────────────────────────────────────────────────

pub fn text_width(text: &str, size: f64) -> f64 {
    text.chars().count() as f64 * size * GLYPH_WIDTH_EM
}

/// Map text onto the printable ASCII range the base fonts can show.
pub fn printable(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            ' '..='~' => out.push(c),
            '\t' | '\n' | '\r' => out.push(' '),
            '\u{2018}' | '\u{2019}' => out.push('\''),
            '\u{201C}' | '\u{201D}' => out.push('"'),
            '\u{2013}' | '\u{2014}' => out.push('-'),
            '\u{2026}' => out.push_str("..."),
            '\u{00A0}' => out.push(' '),
            _ => out.push('?'),
        }
    }
    out
}

/// Greedy word wrap to `width` points. Words longer than a line are broken.
pub fn wrap(text: &str, size: f64, width: f64) -> Vec<String> {
    let max_chars = ((width / (size * GLYPH_WIDTH_EM)).floor() as usize).max(1);
    let mut lines = Vec::new();
    let mut line = String::new();

    for word in printable(text).split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > max_chars {
            if !line.is_empty() {
                lines.push(std::mem::take(&mut line));
            }
            let rest = word.split_off(max_chars);
            lines.push(word.into_iter().collect());
            word = rest;
        }

        let word: String = word.into_iter().collect();
        let needed = if line.is_empty() {
            word.len()
        } else {
            line.len() + 1 + word.len()
        };
        if needed > max_chars {
            lines.push(std::mem::take(&mut line));
        }
        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(&word);
    }

    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

/// Cut `text` to fit `width`, marking the cut with `...`.
pub fn truncate(text: &str, size: f64, width: f64) -> String {
    let text = printable(text);
    if text_width(&text, size) <= width {
        return text;
    }
    let max_chars = (width / (size * GLYPH_WIDTH_EM)).floor() as usize;
    let keep = max_chars.saturating_sub(3);
    let mut cut: String = text.chars().take(keep).collect();
    cut.push_str("...");
    cut
}

/// Whole numbers print without a fraction; anything else to one place.
pub fn format_score(score: f64) -> String {
    if score.fract() == 0.0 {
        format!("{score:.0}")
    } else {
        format!("{score:.1}")
    }
}

fn text(x: f64, y: f64, size: f64, font: Font, color: Color, s: impl AsRef<str>) -> Item {
    Item::Text {
        x,
        y,
        size,
        font,
        color,
        text: printable(s.as_ref()),
    }
}

fn rule(width: f64, height: f64) -> Row {
    Row::new(height).with(Item::Rect {
        x: 0.0,
        y: height / 2.0,
        w: width,
        h: 0.8,
        fill: Color::TRACK,
    })
}

fn bar(width: f64, row_height: f64, bar_height: f64, score: &ScoreCategory) -> Row {
    let y = (row_height - bar_height) / 2.0;
    let mut row = Row::new(row_height).with(Item::Rect {
        x: 0.0,
        y,
        w: width,
        h: bar_height,
        fill: Color::TRACK,
    });
    if score.average > 0.0 {
        row = row.with(Item::Rect {
            x: 0.0,
            y,
            w: width * score.average / 100.0,
            h: bar_height,
            fill: Color::band(score.summary),
        });
    }
    row
}

fn wrapped(block: &mut Block, s: &str, size: f64, width: f64, line_height: f64, color: Color) {
    for line in wrap(s, size, width) {
        block.push(Row::new(line_height).with(text(
            0.0,
            line_height - 3.0,
            size,
            Font::Regular,
            color,
            line,
        )));
    }
}

fn section_title(label: &str) -> Row {
    Row::new(26.0).with(text(0.0, 18.0, 14.0, Font::Bold, Color::INK, label))
}

// ── Blocks ────────────────────────────────────────────────────────────────────

/// Every block of the report, in document order.
pub fn compose(report: &Report, date: &str, width: f64) -> Vec<Block> {
    let mut blocks = vec![
        header(report, date, width),
        overall(report, width),
        gauge(&report.cta, width, "gauge-cta"),
        gauge(&report.theme, width, "gauge-theme"),
        page_table(report, width),
    ];
    blocks.extend(issues(report, Category::Cta, width));
    blocks.extend(issues(report, Category::Theme, width));
    blocks.push(footer(date, width));
    blocks
}

fn header(report: &Report, date: &str, width: f64) -> Block {
    let mut block = Block::atomic("header");
    let site = if report.site.trim().is_empty() {
        "Unknown site"
    } else {
        report.site.as_str()
    };

    block.push(Row::new(30.0).with(text(
        0.0,
        22.0,
        22.0,
        Font::Bold,
        Color::INK,
        truncate(site, 22.0, width),
    )));
    block.push(Row::new(16.0).with(text(
        0.0,
        11.0,
        10.0,
        Font::Regular,
        Color::MUTED,
        format!("Audit date: {date}"),
    )));
    wrapped(&mut block, &report.config_tags().join("   |   "), 9.0, width, 13.0, Color::ACCENT);
    block.push(rule(width, 10.0));
    block
}

fn overall(report: &Report, width: f64) -> Block {
    let mut block = Block::atomic("overall");
    let score = &report.overall;
    let value = format!("{:.0} / 100", score.average.round());

    block.push(section_title("Overall Scores"));
    block.push(
        Row::new(20.0)
            .with(text(0.0, 14.0, 11.0, Font::Bold, Color::INK, "Overall"))
            .with(text(
                width - text_width(&value, 11.0),
                14.0,
                11.0,
                Font::Bold,
                Color::band(score.summary),
                &value,
            )),
    );
    block.push(bar(width, 16.0, 8.0, score));
    block
}

fn gauge(score: &ScoreCategory, width: f64, name: &str) -> Block {
    let mut block = Block::atomic(name);
    let color = Color::band(score.summary);
    let grade = score.grade.as_str();
    let issues = format!(
        "{} issue{} found",
        score.issue_count,
        if score.issue_count == 1 { "" } else { "s" }
    );
    let value = format!("{:.0}", score.average.round());

    block.push(
        Row::new(22.0)
            .with(text(0.0, 15.0, 12.0, Font::Bold, Color::INK, &score.label))
            .with(text(
                width - text_width(grade, 18.0),
                17.0,
                18.0,
                Font::Bold,
                color,
                grade,
            )),
    );
    block.push(Row::new(14.0).with(text(0.0, 10.0, 9.0, Font::Regular, Color::MUTED, issues)));
    block.push(
        Row::new(30.0)
            .with(text(0.0, 24.0, 24.0, Font::Bold, color, &value))
            .with(text(
                text_width(&value, 24.0) + 4.0,
                24.0,
                10.0,
                Font::Regular,
                Color::MUTED,
                "/ 100",
            )),
    );
    block.push(bar(width, 14.0, 6.0, score));
    block.push(Row::new(16.0).with(text(
        0.0,
        11.0,
        10.0,
        Font::Bold,
        color,
        score.summary.as_str(),
    )));
    block
}

fn page_table(report: &Report, width: f64) -> Block {
    let mut block = Block::flowing("pages");
    let cta_x = width - 210.0;
    let theme_x = width - 140.0;
    let found_x = width - 70.0;

    block.push(section_title("Page-by-Page Breakdown"));
    if report.page_rows.is_empty() {
        block.push(Row::new(16.0).with(text(
            0.0,
            11.0,
            9.0,
            Font::Regular,
            Color::MUTED,
            "No page scores available.",
        )));
        return block;
    }

    block.push(
        Row::new(16.0)
            .with(text(0.0, 11.0, 9.0, Font::Bold, Color::MUTED, "Page"))
            .with(text(cta_x, 11.0, 9.0, Font::Bold, Color::MUTED, "CTA"))
            .with(text(theme_x, 11.0, 9.0, Font::Bold, Color::MUTED, "Theme"))
            .with(text(found_x, 11.0, 9.0, Font::Bold, Color::MUTED, "CTAs Found")),
    );
    block.push(rule(width, 6.0));

    for page in &report.page_rows {
        let url = truncate(&page.url, 9.0, cta_x - 10.0);
        let mut row = Row::new(16.0).with(text(0.0, 11.0, 9.0, Font::Regular, Color::INK, url));
        row = match &page.status {
            PageStatus::Scored {
                cta_score,
                theme_score,
                ctas_found,
            } => row
                .with(text(
                    cta_x,
                    11.0,
                    9.0,
                    Font::Bold,
                    Color::band(Summary::from_score(*cta_score)),
                    format_score(*cta_score),
                ))
                .with(text(
                    theme_x,
                    11.0,
                    9.0,
                    Font::Bold,
                    Color::band(Summary::from_score(*theme_score)),
                    format_score(*theme_score),
                ))
                .with(text(
                    found_x,
                    11.0,
                    9.0,
                    Font::Regular,
                    Color::INK,
                    ctas_found.to_string(),
                )),
            PageStatus::Failed { reason } => row.with(text(
                cta_x,
                11.0,
                9.0,
                Font::Regular,
                Color::WARN,
                truncate(&format!("Failed: {reason}"), 9.0, width - cta_x),
            )),
        };
        block.push(row);
    }
    block
}

/// One atomic card per finding. The section title rides on the first card
/// so it never ends a page alone. No blocks when there are no findings.
fn issues(report: &Report, category: Category, width: f64) -> Vec<Block> {
    let findings = report.findings(category);
    let prefix = match category {
        Category::Cta => "cta-issue",
        Category::Theme => "theme-issue",
    };

    findings
        .iter()
        .enumerate()
        .map(|(i, finding)| {
            let mut block = Block::atomic(format!("{prefix}-{}", i + 1));
            if i == 0 {
                block.push(section_title(&format!(
                    "{} ({})",
                    category.issues_title(),
                    findings.len()
                )));
            }
            card(&mut block, finding, width);
            block
        })
        .collect()
}

fn card(block: &mut Block, finding: &Finding, width: f64) {
    for line in wrap(&finding.element_name, 11.0, width) {
        block.push(Row::new(15.0).with(text(0.0, 12.0, 11.0, Font::Bold, Color::INK, line)));
    }

    block.push(Row::new(14.0).with(text(0.0, 11.0, 9.0, Font::Bold, Color::WARN, "Issue")));
    wrapped(block, &finding.issue, 9.0, width, 12.0, Color::INK);

    block.push(Row::new(14.0).with(text(
        0.0,
        11.0,
        9.0,
        Font::Bold,
        Color::FIX,
        "Recommendation",
    )));
    wrapped(block, &finding.recommendation, 9.0, width, 12.0, Color::INK);

    let picture = match finding.screenshot {
        Some(reference) => Item::Image {
            x: 0.0,
            y: 4.0,
            w: SCREENSHOT_W,
            h: SCREENSHOT_H,
            page: reference.page,
            viewport: reference.viewport,
        },
        None => Item::Placeholder {
            x: 0.0,
            y: 4.0,
            w: SCREENSHOT_W,
            h: SCREENSHOT_H,
            caption: "Screenshot".to_string(),
        },
    };
    block.push(Row::new(SCREENSHOT_H + 8.0).with(picture));
    block.push(rule(width, 10.0));
}

fn footer(date: &str, width: f64) -> Block {
    let mut block = Block::atomic("footer");
    block.push(rule(width, 12.0));
    block.push(
        Row::new(18.0)
            .with(text(0.0, 13.0, 12.0, Font::Bold, Color::ACCENT, "VibeAudit"))
            .with(text(
                text_width("VibeAudit", 12.0) + 8.0,
                13.0,
                10.0,
                Font::Regular,
                Color::MUTED,
                "AI-Powered UX Audit",
            )),
    );
    wrapped(&mut block, FOOTER_NOTE, 8.0, width, 11.0, Color::MUTED);
    block.push(Row::new(14.0).with(text(0.0, 10.0, 9.0, Font::Regular, Color::MUTED, date)));
    block
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_respects_width() {
        let lines = wrap("the quick brown fox jumps over the lazy dog", 10.0, 60.0);
        // 60 / 5.5 = 10 characters per line.
        assert_eq!(lines, ["the quick", "brown fox", "jumps over", "the lazy", "dog"]);
    }

    #[test]
    fn wrap_breaks_long_words() {
        let lines = wrap("abcdefghijklmnop", 10.0, 35.0);
        assert_eq!(lines, ["abcdef", "ghijkl", "mnop"]);
    }

    #[test]
    fn wrap_of_blank_text_is_empty() {
        assert!(wrap("   ", 10.0, 100.0).is_empty());
    }

    #[test]
    fn printable_replaces_non_ascii() {
        assert_eq!(printable("caf\u{e9} \u{2014} \u{201C}hi\u{201D}\u{2026}"), "caf? - \"hi\"...");
    }

    #[test]
    fn truncate_marks_cut() {
        assert_eq!(truncate("short", 10.0, 100.0), "short");
        let cut = truncate("https://example.com/a/very/long/path", 10.0, 57.0);
        assert_eq!(cut, "https:/...");
    }

    #[test]
    fn score_format() {
        assert_eq!(format_score(45.0), "45");
        assert_eq!(format_score(58.5), "58.5");
    }
}
