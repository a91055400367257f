use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use image::{DynamicImage, GenericImageView, ImageFormat};
use resvg::render;
use tiny_skia::Pixmap;
use usvg::{Options, Tree, fontdb};

use crate::error::AnnotateError;

/// Maximum characters per line when wrapping the place description.
pub const PLACE_WRAP_WIDTH: usize = 50;

#[derive(Debug, Clone)]
pub struct OverlayStyle {
    pub text_color: String,
    pub font_size: f32,
    pub font_family: String,
    pub font_path: Option<PathBuf>,
}

/// Start coordinate for the overlay text block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub x: f32,
    pub y: f32,
}

/// Rotates the pixel buffer so the image displays upright. EXIF orientation
/// 3 is upside down, 6 needs a quarter turn clockwise, 8 a quarter turn
/// counter-clockwise; every other tag value is left untouched.
pub fn fix_orientation(image: DynamicImage, orientation: u32) -> DynamicImage {
    match orientation {
        3 => image.rotate180(),
        6 => image.rotate90(),
        8 => image.rotate270(),
        _ => image,
    }
}

/// Computes the overlay anchor from the EXIF-reported dimensions and
/// orientation so the block lands near the top-right corner of the displayed
/// image. The swap rule is empirical, tuned against real camera output;
/// its three conditions compensate for EXIF dimensions not reflecting the
/// rotation applied at display time. Do not simplify the boundary logic.
pub fn text_anchor(height: u32, width: u32, orientation: u32) -> Placement {
    let h = height as f32;
    let w = width as f32;
    let mut x = w * 0.88;
    let mut y = h * 0.02;

    // switch position when the image displays as landscape
    if height > width || orientation == 1 || (width > height && orientation == 3) {
        x = h * 0.83;
        y = w * 0.02;
    }

    Placement { x, y }
}

/// Greedy word wrap by character count. Suited to a monospace overlay font;
/// a word longer than `max_chars` is split into budget-sized pieces so no
/// line ever exceeds the width.
pub fn wrap_words(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let word_len = word.chars().count();
        if !current.is_empty() {
            if current.chars().count() + 1 + word_len <= max_chars {
                current.push(' ');
                current.push_str(word);
                continue;
            }
            lines.push(std::mem::take(&mut current));
        }
        let mut rest = word;
        while rest.chars().count() > max_chars {
            let split = rest
                .char_indices()
                .nth(max_chars)
                .map(|(index, _)| index)
                .unwrap_or(rest.len());
            lines.push(rest[..split].to_string());
            rest = &rest[split..];
        }
        current.push_str(rest);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Renders ordered (label, value) pairs as a two-column block: labels
/// right-aligned, values left-aligned, one space between the columns.
/// Multi-line values continue in the value column.
pub fn format_rows(rows: &[(&str, String)]) -> String {
    let label_width = rows
        .iter()
        .map(|(label, _)| label.chars().count())
        .max()
        .unwrap_or(0);

    let mut out = Vec::new();
    for (label, value) in rows {
        let mut value_lines = value.lines();
        let first = value_lines.next().unwrap_or("");
        out.push(format!("{label:>label_width$} {first}"));
        for continuation in value_lines {
            out.push(format!("{:label_width$} {continuation}", ""));
        }
    }
    out.join("\n")
}

/// Draws the text block onto the image at the given anchor and re-encodes
/// the result in `format`. The image is embedded into an SVG as a data URI
/// and the composite is rasterized with resvg, so the overlay font is
/// resolved through fontdb (optionally from an explicit font file).
pub fn draw_overlay(
    image: &DynamicImage,
    block: &str,
    placement: Placement,
    style: &OverlayStyle,
    format: ImageFormat,
) -> Result<Vec<u8>, AnnotateError> {
    let mut png = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .map_err(|err| AnnotateError::Render(format!("failed to encode canvas: {err}")))?;

    let (width, height) = image.dimensions();
    let svg = build_overlay_svg(&png, width, height, block, placement, style);

    let font_data = match &style.font_path {
        Some(path) => Some(std::fs::read(path).map_err(|err| {
            AnnotateError::Render(format!("failed to read font {}: {err}", path.display()))
        })?),
        None => None,
    };
    rasterize(&svg, format, font_data)
}

fn build_overlay_svg(
    png_bytes: &[u8],
    width: u32,
    height: u32,
    block: &str,
    placement: Placement,
    style: &OverlayStyle,
) -> String {
    let data_uri = format!("data:image/png;base64,{}", BASE64.encode(png_bytes));
    let line_height = style.font_size * 1.1;

    let mut svg = String::new();
    svg.push_str(&format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
        w = width,
        h = height
    ));
    svg.push_str(&format!(
        r#"<image href="{uri}" xlink:href="{uri}" x="0" y="0" width="{w}" height="{h}" preserveAspectRatio="none"/>"#,
        uri = data_uri,
        w = width,
        h = height
    ));

    // First baseline sits one font size below the anchor.
    let mut baseline = placement.y + style.font_size;
    for line in block.lines() {
        svg.push_str(&format!(
            r#"<text x="{x}" y="{y}" font-family="{family}, monospace" font-weight="bold" font-size="{size}" fill="{color}" xml:space="preserve">{text}</text>"#,
            x = placement.x,
            y = baseline,
            family = escape_attr(&style.font_family),
            size = style.font_size,
            color = escape_attr(&style.text_color),
            text = escape_text(line)
        ));
        baseline += line_height;
    }

    svg.push_str("</svg>");
    svg
}

fn rasterize(
    svg: &str,
    format: ImageFormat,
    font_data: Option<Vec<u8>>,
) -> Result<Vec<u8>, AnnotateError> {
    let mut db = fontdb::Database::new();
    db.load_system_fonts();
    if let Some(data) = font_data {
        db.load_font_data(data);
    }
    let options = Options {
        fontdb: Arc::new(db),
        ..Options::default()
    };
    let tree = Tree::from_str(svg, &options)
        .map_err(|err| AnnotateError::Render(format!("failed to parse overlay SVG: {err}")))?;
    let size = tree.size().to_int_size();
    let mut pixmap = Pixmap::new(size.width(), size.height())
        .ok_or_else(|| AnnotateError::Render("empty overlay canvas".into()))?;
    render(&tree, tiny_skia::Transform::identity(), &mut pixmap.as_mut());

    let rgba = image::RgbaImage::from_raw(size.width(), size.height(), pixmap.data().to_vec())
        .ok_or_else(|| AnnotateError::Render("pixmap does not fit image buffer".into()))?;
    let composed = if format == ImageFormat::Jpeg {
        // JPEG has no alpha channel.
        DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(rgba).to_rgb8())
    } else {
        DynamicImage::ImageRgba8(rgba)
    };

    let mut bytes = Vec::new();
    composed
        .write_to(&mut Cursor::new(&mut bytes), format)
        .map_err(|err| AnnotateError::Render(format!("failed to encode output: {err}")))?;
    Ok(bytes)
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attr(value: &str) -> String {
    escape_text(value)
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
