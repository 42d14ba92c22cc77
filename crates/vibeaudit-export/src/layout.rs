//! Page geometry, the block/row layout model, and the paginator.
//!
//! Coordinates inside a row are measured in points from the row's top-left
//! corner, relative to the left margin. The renderer converts them to PDF
//! user space.

use serde::Serialize;
use sha2::{Digest, Sha256};

use vibeaudit_contracts::error::{AuditError, AuditResult};
use vibeaudit_report::Summary;

pub const A4_WIDTH_PT: f64 = 595.28;
pub const A4_HEIGHT_PT: f64 = 841.89;
pub const PT_PER_MM: f64 = 72.0 / 25.4;

/// Vertical space between consecutive blocks on the same page.
pub const BLOCK_GAP: f64 = 12.0;

const EPSILON: f64 = 1e-6;

// ── Geometry ──────────────────────────────────────────────────────────────────

/// Portrait page with the same margin on all four sides.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PageGeometry {
    pub width: f64,
    pub height: f64,
    pub margin: f64,
}

impl PageGeometry {
    pub fn a4(margin_mm: f64) -> Self {
        Self {
            width: A4_WIDTH_PT,
            height: A4_HEIGHT_PT,
            margin: margin_mm * PT_PER_MM,
        }
    }

    pub fn content_width(&self) -> f64 {
        self.width - 2.0 * self.margin
    }

    pub fn content_height(&self) -> f64 {
        self.height - 2.0 * self.margin
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const INK: Color = Color::rgb(0.102, 0.102, 0.180);
    pub const MUTED: Color = Color::rgb(0.45, 0.45, 0.52);
    pub const TRACK: Color = Color::rgb(0.88, 0.93, 0.95);
    pub const ACCENT: Color = Color::rgb(0.0, 0.706, 0.847);
    pub const WARN: Color = Color::rgb(0.937, 0.267, 0.267);
    pub const FIX: Color = Color::rgb(0.086, 0.639, 0.290);

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    pub fn band(summary: Summary) -> Self {
        let (r, g, b) = summary.rgb();
        Self { r, g, b }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Font {
    Regular,
    Bold,
}

// ── Layout model ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Item {
    /// `y` is the baseline offset from the row top.
    Text {
        x: f64,
        y: f64,
        size: f64,
        font: Font,
        color: Color,
        text: String,
    },
    Rect {
        x: f64,
        y: f64,
        w: f64,
        h: f64,
        fill: Color,
    },
    /// Outlined box with a centered caption; stands in for a missing image.
    Placeholder {
        x: f64,
        y: f64,
        w: f64,
        h: f64,
        caption: String,
    },
    /// A screenshot of report page `page` at viewport `viewport`, fitted
    /// into the box.
    Image {
        x: f64,
        y: f64,
        w: f64,
        h: f64,
        page: usize,
        viewport: u32,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Row {
    pub height: f64,
    pub items: Vec<Item>,
}

impl Row {
    pub fn new(height: f64) -> Self {
        Self {
            height,
            items: Vec::new(),
        }
    }

    pub fn with(mut self, item: Item) -> Self {
        self.items.push(item);
        self
    }
}

/// A run of rows. The paginator keeps an atomic block on one page whenever
/// it fits on one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Block {
    pub name: String,
    pub atomic: bool,
    pub rows: Vec<Row>,
}

impl Block {
    pub fn atomic(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            atomic: true,
            rows: Vec::new(),
        }
    }

    pub fn flowing(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            atomic: false,
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: Row) {
        self.rows.push(row);
    }

    pub fn height(&self) -> f64 {
        self.rows.iter().map(|r| r.height).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacedRow {
    /// Index of the block this row came from.
    pub block: usize,
    /// Offset of the row top from the top margin.
    pub top: f64,
    pub row: Row,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Page {
    pub rows: Vec<PlacedRow>,
}

/// A fully paginated document, ready to render.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Layout {
    pub geometry: PageGeometry,
    pub date: String,
    pub blocks: Vec<BlockInfo>,
    pub pages: Vec<Page>,
}

/// Name and atomicity of each laid-out block, in document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockInfo {
    pub name: String,
    pub atomic: bool,
}

impl Layout {
    pub fn new(geometry: PageGeometry, date: impl Into<String>, blocks: Vec<Block>) -> Self {
        let info = blocks
            .iter()
            .map(|b| BlockInfo {
                name: b.name.clone(),
                atomic: b.atomic,
            })
            .collect();
        let pages = paginate(blocks, geometry.content_height());
        Self {
            geometry,
            date: date.into(),
            blocks: info,
            pages,
        }
    }

    /// SHA-256 of the canonical JSON encoding of the layout, as lowercase hex.
    pub fn fingerprint(&self) -> AuditResult<String> {
        let encoded = serde_json::to_vec(self).map_err(|e| AuditError::ExportFailed {
            reason: format!("failed to encode layout: {e}"),
        })?;
        Ok(hex::encode(Sha256::digest(&encoded)))
    }

    /// Indexes of the pages holding at least one row of `block`.
    pub fn pages_of(&self, block: usize) -> Vec<usize> {
        self.pages
            .iter()
            .enumerate()
            .filter(|(_, page)| page.rows.iter().any(|r| r.block == block))
            .map(|(i, _)| i)
            .collect()
    }
}

// ── Pagination ────────────────────────────────────────────────────────────────

/// Flow `blocks` onto pages of `content_height` points.
///
/// An atomic block that does not fit in the space left on the current page,
/// but fits on an empty page, starts a new page. Everything else breaks
/// between rows. A single row taller than a page gets a page of its own and
/// overflows it. Always returns at least one page.
pub fn paginate(blocks: Vec<Block>, content_height: f64) -> Vec<Page> {
    let mut pages = vec![Page::default()];
    let mut cursor = 0.0;

    for (index, block) in blocks.into_iter().enumerate() {
        let height = block.height();
        let at_top = current(&pages).rows.is_empty();
        if !at_top {
            cursor += BLOCK_GAP;
        }

        let fits_here = cursor + height <= content_height + EPSILON;
        let fits_page = height <= content_height + EPSILON;
        if block.atomic && !at_top && !fits_here && fits_page {
            pages.push(Page::default());
            cursor = 0.0;
        }

        for row in block.rows {
            let page_empty = current(&pages).rows.is_empty();
            if !page_empty && cursor + row.height > content_height + EPSILON {
                pages.push(Page::default());
                cursor = 0.0;
            }
            // A fresh page never starts with a gap.
            if current(&pages).rows.is_empty() {
                cursor = 0.0;
            }
            let height = row.height;
            if let Some(page) = pages.last_mut() {
                page.rows.push(PlacedRow {
                    block: index,
                    top: cursor,
                    row,
                });
            }
            cursor += height;
        }
    }

    pages
}

fn current(pages: &[Page]) -> &Page {
    // `pages` starts non-empty and only grows.
    &pages[pages.len() - 1]
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn block(name: &str, atomic: bool, rows: &[f64]) -> Block {
        Block {
            name: name.to_string(),
            atomic,
            rows: rows.iter().map(|h| Row::new(*h)).collect(),
        }
    }

    fn block_pages(pages: &[Page], block: usize) -> Vec<usize> {
        pages
            .iter()
            .enumerate()
            .filter(|(_, p)| p.rows.iter().any(|r| r.block == block))
            .map(|(i, _)| i)
            .collect()
    }

    #[test]
    fn a4_geometry() {
        let g = PageGeometry::a4(10.0);
        assert!((g.margin - 28.3465).abs() < 1e-3);
        assert!((g.content_width() - (595.28 - 2.0 * g.margin)).abs() < 1e-9);
    }

    #[test]
    fn empty_input_has_one_page() {
        let pages = paginate(Vec::new(), 100.0);
        assert_eq!(pages.len(), 1);
        assert!(pages[0].rows.is_empty());
    }

    #[test]
    fn atomic_block_moves_to_next_page() {
        let pages = paginate(
            vec![block("a", false, &[40.0, 40.0]), block("card", true, &[20.0, 20.0, 20.0])],
            120.0,
        );
        // 80 used + 12 gap leaves 28; the 60pt card moves.
        assert_eq!(pages.len(), 2);
        assert_eq!(block_pages(&pages, 1), [1]);
        assert_eq!(pages[1].rows[0].top, 0.0);
    }

    #[test]
    fn flowing_block_splits_at_row_boundary() {
        let pages = paginate(
            vec![block("a", false, &[40.0, 40.0]), block("table", false, &[20.0, 20.0, 20.0])],
            120.0,
        );
        assert_eq!(block_pages(&pages, 1), [0, 1]);
        // Rows end at 80 + 12 + 20 = 112; the next row starts page 2.
        assert_eq!(pages[0].rows.len(), 3);
        assert_eq!(pages[1].rows[0].top, 0.0);
    }

    #[test]
    fn oversized_atomic_block_may_split() {
        let pages = paginate(vec![block("huge", true, &[50.0, 50.0, 50.0])], 120.0);
        assert_eq!(pages.len(), 2);
        assert_eq!(block_pages(&pages, 0), [0, 1]);
    }

    #[test]
    fn rows_never_cross_the_bottom_margin() {
        let blocks: Vec<Block> = (0..20)
            .map(|i| block(&format!("b{i}"), i % 2 == 0, &[13.0, 27.0, 9.0]))
            .collect();
        let pages = paginate(blocks, 200.0);
        for page in &pages {
            for placed in &page.rows {
                assert!(placed.top + placed.row.height <= 200.0 + EPSILON);
            }
        }
        for b in (0..20).step_by(2) {
            assert_eq!(block_pages(&pages, b).len(), 1, "atomic block {b} split");
        }
    }
}
