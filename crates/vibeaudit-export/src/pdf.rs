//! Renders a paginated [`Layout`] to PDF bytes with `lopdf`.
//!
//! Text uses the standard Helvetica base fonts, so no font data is embedded.
//! Each distinct screenshot is embedded once as an image XObject: JPEG data
//! passes through under `DCTDecode`, anything else is decoded to raw RGB.

use std::{collections::BTreeMap, fmt::Write as _};

use image::{ColorType, ImageFormat};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use tracing::{debug, warn};

use vibeaudit_contracts::error::{AuditError, AuditResult};
use vibeaudit_report::{decode_screenshot, Report};

use crate::layout::{Color, Font, Item, Layout};

const PLACEHOLDER_STROKE: Color = Color::rgb(0.75, 0.80, 0.84);

/// Image data ready to embed.
struct ImageData {
    width: u32,
    height: u32,
    color_space: &'static str,
    filter: Option<&'static str>,
    data: Vec<u8>,
}

fn decode_image_bytes(data: &[u8]) -> Option<ImageData> {
    let format = image::guess_format(data).ok();
    let decoded = image::load_from_memory(data).ok()?;
    let (width, height) = (decoded.width(), decoded.height());
    if width == 0 || height == 0 {
        return None;
    }

    if format == Some(ImageFormat::Jpeg) {
        let color_space = match decoded.color() {
            ColorType::L8 | ColorType::La8 => "DeviceGray",
            _ => "DeviceRGB",
        };
        return Some(ImageData {
            width,
            height,
            color_space,
            filter: Some("DCTDecode"),
            data: data.to_vec(),
        });
    }

    Some(ImageData {
        width,
        height,
        color_space: "DeviceRGB",
        filter: None,
        data: decoded.to_rgb8().into_raw(),
    })
}

/// An embedded screenshot: its resource name and pixel size.
#[derive(Clone)]
struct Embedded {
    name: String,
    id: ObjectId,
    width: u32,
    height: u32,
}

/// Load and embed every screenshot the layout references. Screenshots that
/// are missing or cannot be decoded map to `None` and render as
/// placeholders.
fn embed_images(
    doc: &mut Document,
    layout: &Layout,
    report: &Report,
) -> BTreeMap<(usize, u32), Option<Embedded>> {
    let mut images = BTreeMap::new();

    for page in &layout.pages {
        for placed in &page.rows {
            for item in &placed.row.items {
                let Item::Image {
                    page: source, viewport, ..
                } = item
                else {
                    continue;
                };
                let key = (*source, *viewport);
                if images.contains_key(&key) {
                    continue;
                }

                let decoded = report
                    .pages
                    .get(*source)
                    .and_then(|p| p.screenshots.get(viewport))
                    .and_then(|shot| match decode_screenshot(shot) {
                        Ok(bytes) => Some(bytes),
                        Err(e) => {
                            warn!(page = source, viewport, error = %e, "screenshot not decodable");
                            None
                        }
                    })
                    .and_then(|bytes| {
                        let image = decode_image_bytes(&bytes);
                        if image.is_none() {
                            warn!(page = source, viewport, "screenshot is not a supported image");
                        }
                        image
                    });

                let embedded = decoded.map(|image| {
                    let mut dict = dictionary! {
                        "Type" => "XObject",
                        "Subtype" => "Image",
                        "Width" => i64::from(image.width),
                        "Height" => i64::from(image.height),
                        "ColorSpace" => image.color_space,
                        "BitsPerComponent" => 8,
                    };
                    if let Some(filter) = image.filter {
                        dict.set("Filter", filter);
                    }
                    let id = doc.add_object(Stream::new(dict, image.data));
                    Embedded {
                        name: format!("Im{}", images.len() + 1),
                        id,
                        width: image.width,
                        height: image.height,
                    }
                });
                images.insert(key, embedded);
            }
        }
    }

    images
}

/// Escape a string for a PDF literal. Input is already printable ASCII.
fn literal(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('(');
    for c in text.chars() {
        if matches!(c, '(' | ')' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push(')');
    out
}

fn font_name(font: Font) -> &'static str {
    match font {
        Font::Regular => "F1",
        Font::Bold => "F2",
    }
}

/// Render `layout`, resolving screenshots against `report`.
///
/// Returns the PDF bytes and the number of pages written.
pub fn render(layout: &Layout, report: &Report) -> AuditResult<(Vec<u8>, usize)> {
    let geometry = layout.geometry;
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let regular = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let bold = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
        "Encoding" => "WinAnsiEncoding",
    });

    let images = embed_images(&mut doc, layout, report);
    let media_box: Vec<Object> = vec![
        0.into(),
        0.into(),
        Object::Real(geometry.width as f32),
        Object::Real(geometry.height as f32),
    ];
    let mut kids: Vec<Object> = Vec::with_capacity(layout.pages.len());

    for page in &layout.pages {
        let mut content = String::new();
        let mut xobjects = Dictionary::new();

        for placed in &page.rows {
            // Top of the row in PDF user space.
            let row_top = geometry.height - geometry.margin - placed.top;
            let left = geometry.margin;

            for item in &placed.row.items {
                match item {
                    Item::Text {
                        x,
                        y,
                        size,
                        font,
                        color,
                        text,
                    } => {
                        let _ = writeln!(
                            content,
                            "BT /{} {:.2} Tf {:.3} {:.3} {:.3} rg {:.2} {:.2} Td {} Tj ET",
                            font_name(*font),
                            size,
                            color.r,
                            color.g,
                            color.b,
                            left + x,
                            row_top - y,
                            literal(text)
                        );
                    }
                    Item::Rect { x, y, w, h, fill } => {
                        let _ = writeln!(
                            content,
                            "{:.3} {:.3} {:.3} rg {:.2} {:.2} {:.2} {:.2} re f",
                            fill.r,
                            fill.g,
                            fill.b,
                            left + x,
                            row_top - y - h,
                            w,
                            h
                        );
                    }
                    Item::Placeholder { x, y, w, h, caption } => {
                        placeholder(&mut content, left + x, row_top - y - h, *w, *h, caption);
                    }
                    Item::Image {
                        x,
                        y,
                        w,
                        h,
                        page,
                        viewport,
                    } => match images.get(&(*page, *viewport)).cloned().flatten() {
                        Some(image) => {
                            let scale =
                                (w / f64::from(image.width)).min(h / f64::from(image.height));
                            let dw = f64::from(image.width) * scale;
                            let dh = f64::from(image.height) * scale;
                            let _ = writeln!(
                                content,
                                "q {:.2} 0 0 {:.2} {:.2} {:.2} cm /{} Do Q",
                                dw,
                                dh,
                                left + x,
                                row_top - y - dh,
                                image.name
                            );
                            xobjects.set(image.name.as_bytes().to_vec(), Object::Reference(image.id));
                        }
                        None => placeholder(
                            &mut content,
                            left + x,
                            row_top - y - h,
                            *w,
                            *h,
                            "Screenshot unavailable",
                        ),
                    },
                }
            }
        }

        let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
        let mut resources = dictionary! {
            "Font" => dictionary! {
                "F1" => regular,
                "F2" => bold,
            },
        };
        if !xobjects.is_empty() {
            resources.set("XObject", Object::Dictionary(xobjects));
        }
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources,
            "MediaBox" => media_box.clone(),
        });
        kids.push(page_id.into());
    }

    let count = kids.len();
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => count as i64,
        "MediaBox" => media_box,
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let info_id = doc.add_object(dictionary! {
        "Title" => Object::string_literal(format!("{} audit report", report.site)),
        "Producer" => Object::string_literal("VibeAudit"),
    });
    doc.trailer.set("Info", info_id);

    doc.compress();

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).map_err(|e| AuditError::ExportFailed {
        reason: format!("failed to serialize pdf: {e}"),
    })?;

    debug!(pages = count, bytes = bytes.len(), images = images.len(), "pdf rendered");
    Ok((bytes, count))
}

fn placeholder(content: &mut String, x: f64, y: f64, w: f64, h: f64, caption: &str) {
    let size = 9.0;
    let caption_width = caption.chars().count() as f64 * size * 0.5;
    let _ = writeln!(
        content,
        "{:.3} {:.3} {:.3} RG 0.8 w {:.2} {:.2} {:.2} {:.2} re S",
        PLACEHOLDER_STROKE.r, PLACEHOLDER_STROKE.g, PLACEHOLDER_STROKE.b, x, y, w, h
    );
    let _ = writeln!(
        content,
        "BT /F1 {:.2} Tf {:.3} {:.3} {:.3} rg {:.2} {:.2} Td {} Tj ET",
        size,
        Color::MUTED.r,
        Color::MUTED.g,
        Color::MUTED.b,
        x + (w - caption_width).max(0.0) / 2.0,
        y + h / 2.0 - size / 3.0,
        literal(caption)
    );
}

#[cfg(test)]
mod tests {
    use vibeaudit_contracts::payload::FinalPayload;
    use vibeaudit_report::aggregate;

    use super::*;
    use crate::{compose::compose, layout::PageGeometry};

    fn number(value: &Object) -> f32 {
        value
            .as_float()
            .or_else(|_| value.as_i64().map(|v| v as f32))
            .unwrap()
    }

    #[test]
    fn literal_escapes_delimiters() {
        assert_eq!(literal("a (b) \\ c"), "(a \\(b\\) \\\\ c)");
    }

    #[test]
    fn garbage_is_not_an_image() {
        assert!(decode_image_bytes(b"hello").is_none());
    }

    #[test]
    fn media_box_follows_geometry() {
        let report = aggregate(&FinalPayload::default());
        let geometry = PageGeometry {
            width: 420.0,
            height: 600.0,
            ..PageGeometry::a4(10.0)
        };
        let layout = Layout::new(
            geometry,
            "October 18, 2026",
            compose(&report, "October 18, 2026", geometry.content_width()),
        );
        let (bytes, pages) = render(&layout, &report).unwrap();

        let parsed = Document::load_mem(&bytes).unwrap();
        assert_eq!(parsed.get_pages().len(), pages);
        for page_id in parsed.get_pages().into_values() {
            let page = parsed.get_dictionary(page_id).unwrap();
            let media_box = page.get(b"MediaBox").and_then(Object::as_array).unwrap();
            let size: Vec<f32> = media_box.iter().map(number).collect();
            assert_eq!(size, [0.0, 0.0, 420.0, 600.0]);
        }
    }
}
