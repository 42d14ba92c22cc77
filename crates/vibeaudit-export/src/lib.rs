//! # vibeaudit-export
//!
//! Exports a [`Report`](vibeaudit_report::Report) as a paginated A4 PDF.
//!
//! Export runs in three stages:
//!
//! 1. **Compose**: the report becomes an ordered list of blocks (header,
//!    overall bar, the two gauges, page table, finding cards, footer).
//! 2. **Paginate**: blocks flow onto pages. Gauges, finding cards and the
//!    footer are atomic and never split when they fit on a page.
//! 3. **Render**: the paginated layout is written to PDF with `lopdf`.
//!
//! Stages 1 and 2 are pure: the same report and date always give the same
//! [`Layout`], and [`Layout::fingerprint`] makes that checkable.
//!
//! ```rust,ignore
//! use vibeaudit_export::Exporter;
//!
//! let document = Exporter::new(10.0).export(&report)?;
//! let path = document.write_to(Path::new("reports"))?;
//! ```

pub mod compose;
pub mod layout;
pub mod pdf;

use std::path::{Path, PathBuf};

use tracing::info;

use vibeaudit_contracts::error::{AuditError, AuditResult};
use vibeaudit_report::Report;

pub use layout::{Block, Layout, PageGeometry, Row};

/// Today's date as it appears in the report, e.g. `October 18, 2026`.
pub fn today() -> String {
    chrono::Local::now().format("%B %-d, %Y").to_string()
}

/// Output filename for a site: `{site}-audit-report.pdf`.
///
/// Characters other than ASCII alphanumerics, `.`, `-` and `_` become `-`,
/// so the name can never escape the output directory.
pub fn filename_for(site: &str) -> String {
    let cleaned: String = site
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '-'
            }
        })
        .collect();
    let stem = match cleaned.trim_matches('.') {
        "" => "site",
        s => s,
    };
    format!("{stem}-audit-report.pdf")
}

/// A rendered report.
#[derive(Debug, Clone)]
pub struct ExportedDocument {
    pub filename: String,
    pub bytes: Vec<u8>,
    pub pages: usize,
    /// Fingerprint of the layout the bytes were rendered from.
    pub fingerprint: String,
}

impl ExportedDocument {
    /// Write the document into `dir`, creating it if needed.
    pub fn write_to(&self, dir: &Path) -> AuditResult<PathBuf> {
        std::fs::create_dir_all(dir).map_err(|e| AuditError::ExportFailed {
            reason: format!("failed to create '{}': {e}", dir.display()),
        })?;
        let path = dir.join(&self.filename);
        std::fs::write(&path, &self.bytes).map_err(|e| AuditError::ExportFailed {
            reason: format!("failed to write '{}': {e}", path.display()),
        })?;
        info!(path = %path.display(), pages = self.pages, "report written");
        Ok(path)
    }
}

/// Report → PDF exporter with a fixed page geometry.
#[derive(Debug, Clone, Copy)]
pub struct Exporter {
    geometry: PageGeometry,
}

impl Default for Exporter {
    fn default() -> Self {
        Self::new(10.0)
    }
}

impl Exporter {
    /// A4 portrait with `margin_mm` on all four sides.
    pub fn new(margin_mm: f64) -> Self {
        Self {
            geometry: PageGeometry::a4(margin_mm),
        }
    }

    pub fn geometry(&self) -> PageGeometry {
        self.geometry
    }

    /// Compose and paginate `report`. Pure: no clock, no I/O.
    pub fn layout(&self, report: &Report, date: &str) -> Layout {
        let blocks = compose::compose(report, date, self.geometry.content_width());
        Layout::new(self.geometry, date, blocks)
    }

    /// Export with today's date, computed once for the whole document.
    pub fn export(&self, report: &Report) -> AuditResult<ExportedDocument> {
        self.export_dated(report, &today())
    }

    pub fn export_dated(&self, report: &Report, date: &str) -> AuditResult<ExportedDocument> {
        let layout = self.layout(report, date);
        let fingerprint = layout.fingerprint()?;
        let (bytes, pages) = pdf::render(&layout, report)?;
        Ok(ExportedDocument {
            filename: filename_for(&report.site),
            bytes,
            pages,
            fingerprint,
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
