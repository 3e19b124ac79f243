use std::io::Write as _;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

pub const FALLBACK_WIDTH: f32 = 800.0;
pub const FALLBACK_HEIGHT: f32 = 600.0;
pub const DEFAULT_PNG_SCALE: f32 = 2.0;

// Leading whitespace keeps these from matching stroke-width and friends.
static WIDTH_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"\swidth\s*=\s*"([^"]*)""#).unwrap());
static HEIGHT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"\sheight\s*=\s*"([^"]*)""#).unwrap());
static VIEWBOX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"viewBox\s*=\s*"\s*([-\d.]+)[\s,]+([-\d.]+)[\s,]+([-\d.]+)[\s,]+([-\d.]+)\s*""#)
        .unwrap()
});

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("no rendered diagram to export")]
    NothingRendered,
    #[error("svg parse failed: {0}")]
    InvalidSvg(String),
    #[error("png encode failed: {0}")]
    Raster(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// The opening `<svg ...>` tag, where sizing attributes live.
fn opening_tag(markup: &str) -> &str {
    match markup.find('>') {
        Some(end) => &markup[..=end],
        None => markup,
    }
}

fn parse_px(value: &str) -> Option<f32> {
    let trimmed = value.trim();
    if trimmed.ends_with('%') {
        return None;
    }
    let number = trimmed.strip_suffix("px").unwrap_or(trimmed);
    let parsed: f32 = number.trim().parse().ok()?;
    (parsed.is_finite() && parsed > 0.0).then_some(parsed)
}

fn attr_px(markup: &str, re: &Regex) -> Option<f32> {
    re.captures(opening_tag(markup))
        .and_then(|caps| parse_px(&caps[1]))
}

fn viewbox_size(markup: &str) -> Option<(f32, f32)> {
    let caps = VIEWBOX_RE.captures(opening_tag(markup))?;
    let width: f32 = caps[3].parse().ok()?;
    let height: f32 = caps[4].parse().ok()?;
    (width > 0.0 && height > 0.0).then_some((width, height))
}

/// Deterministic pixel dimensions for rasterization: explicit pixel
/// width/height, else the viewBox extent, else the fixed fallback.
/// Percentage sizing counts as absent.
pub fn resolve_dimensions(markup: &str, fallback: (f32, f32)) -> (f32, f32) {
    if let (Some(width), Some(height)) = (attr_px(markup, &WIDTH_RE), attr_px(markup, &HEIGHT_RE))
    {
        return (width, height);
    }
    if let Some(size) = viewbox_size(markup) {
        return size;
    }
    tracing::debug!("svg carries no usable dimensions, using fallback");
    fallback
}

/// Export-ready standalone SVG document: guarantees an xmlns declaration
/// and explicit pixel width/height on the root element.
pub fn prepare_svg(markup: &str, fallback: (f32, f32)) -> String {
    let mut svg = markup.to_string();

    if !opening_tag(&svg).contains("xmlns") {
        svg = svg.replacen("<svg", "<svg xmlns=\"http://www.w3.org/2000/svg\"", 1);
    }

    let (width, height) = resolve_dimensions(&svg, fallback);
    let explicit = attr_px(&svg, &WIDTH_RE).is_some() && attr_px(&svg, &HEIGHT_RE).is_some();
    if !explicit {
        let head = opening_tag(&svg).to_string();
        let mut fixed = WIDTH_RE.replace(&head, "").into_owned();
        fixed = HEIGHT_RE.replace(&fixed, "").into_owned();
        fixed = fixed.replacen("<svg", &format!("<svg width=\"{width}\" height=\"{height}\""), 1);
        svg = format!("{}{}", fixed, &svg[head.len()..]);
    }

    svg
}

/// Write the markup verbatim (UTF-8) to the given path, or stdout when no
/// path is given.
pub fn write_output_svg(markup: &str, output: Option<&Path>) -> Result<(), ExportError> {
    if markup.trim().is_empty() {
        return Err(ExportError::NothingRendered);
    }
    match output {
        Some(path) => std::fs::write(path, markup)?,
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(markup.as_bytes())?;
        }
    }
    Ok(())
}

/// Rasterize the markup at `scale`x the resolved dimensions onto an opaque
/// white backing and return the encoded PNG bytes.
#[cfg(feature = "png")]
pub fn export_png(markup: &str, scale: f32, fallback: (f32, f32)) -> Result<Vec<u8>, ExportError> {
    if markup.trim().is_empty() {
        return Err(ExportError::NothingRendered);
    }

    let (width, height) = resolve_dimensions(markup, fallback);
    let svg = prepare_svg(markup, fallback);

    let mut opt = usvg::Options::default();
    opt.fontdb = fontdb();
    opt.default_size = usvg::Size::from_wh(width, height)
        .unwrap_or(usvg::Size::from_wh(FALLBACK_WIDTH, FALLBACK_HEIGHT).unwrap());

    let tree = usvg::Tree::from_str(&svg, &opt)
        .map_err(|err| ExportError::InvalidSvg(err.to_string()))?;

    let scale = if scale.is_finite() && scale > 0.0 {
        scale
    } else {
        DEFAULT_PNG_SCALE
    };
    let px_width = ((width * scale).round() as u32).max(1);
    let px_height = ((height * scale).round() as u32).max(1);

    let mut pixmap = resvg::tiny_skia::Pixmap::new(px_width, px_height)
        .ok_or_else(|| ExportError::Raster("failed to allocate pixmap".to_string()))?;
    pixmap.fill(resvg::tiny_skia::Color::WHITE);

    let transform = resvg::tiny_skia::Transform::from_scale(
        px_width as f32 / tree.size().width(),
        px_height as f32 / tree.size().height(),
    );
    let mut pixmap_mut = pixmap.as_mut();
    resvg::render(&tree, transform, &mut pixmap_mut);

    pixmap
        .encode_png()
        .map_err(|err| ExportError::Raster(err.to_string()))
}

#[cfg(feature = "png")]
pub fn write_output_png(
    markup: &str,
    output: &Path,
    scale: f32,
    fallback: (f32, f32),
) -> Result<(), ExportError> {
    let bytes = export_png(markup, scale, fallback)?;
    std::fs::write(output, bytes)?;
    Ok(())
}

#[cfg(feature = "png")]
fn fontdb() -> std::sync::Arc<usvg::fontdb::Database> {
    static FONTDB: Lazy<std::sync::Arc<usvg::fontdb::Database>> = Lazy::new(|| {
        let mut db = usvg::fontdb::Database::new();
        db.load_system_fonts();
        std::sync::Arc::new(db)
    });
    FONTDB.clone()
}
