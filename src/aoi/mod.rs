//! Areas of interest found by projection scanning a rendered code image.
//!
//! Pass one slides a full-width probe `margin_height` rows tall down the image
//! to find text lines. Pass two slides a probe `margin_width` columns wide
//! across each line band to find tokens. Both passes share
//! [`projection::scan_spans`].

pub mod binarize;
pub use binarize::{BinarizeConfig, BinaryImage, Threshold};
pub mod projection;
pub mod tokens;
pub use tokens::{TokenError, attach_srcml_tags, attach_tokens, emip_code_file, emip_srcml_table};

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use kornia::image::ImageError;
use serde::{Deserialize, Serialize};

use projection::{Span, scan_spans};

const MARGIN_HEIGHT: u32 = 4;
const MARGIN_WIDTH: u32 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AoiLevel {
    #[serde(rename = "line")]
    Line,
    #[default]
    #[serde(rename = "sub-line")]
    SubLine,
}

impl fmt::Display for AoiLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AoiLevel::Line => f.write_str("line"),
            AoiLevel::SubLine => f.write_str("sub-line"),
        }
    }
}

impl FromStr for AoiLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "line" => Ok(AoiLevel::Line),
            "sub-line" | "subline" | "token" => Ok(AoiLevel::SubLine),
            other => Err(format!("unknown AOI level '{other}' (expected line or sub-line)")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AoiConfig {
    pub level: AoiLevel,
    /// Probe height for the line pass, in pixels.
    pub margin_height: u32,
    /// Probe width for the token pass, in pixels.
    pub margin_width: u32,
}

impl Default for AoiConfig {
    fn default() -> Self {
        Self {
            level: AoiLevel::default(),
            margin_height: MARGIN_HEIGHT,
            margin_width: MARGIN_WIDTH,
        }
    }
}

impl AoiConfig {
    pub fn validate(&self) -> Result<(), AoiError> {
        if self.margin_height == 0 {
            return Err(AoiError::InvalidMargin {
                field: "margin_height",
            });
        }
        if self.margin_width == 0 {
            return Err(AoiError::InvalidMargin {
                field: "margin_width",
            });
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AoiError {
    #[error("{field} must be at least one pixel")]
    InvalidMargin { field: &'static str },

    #[error("mask of {len} pixels does not match {width}x{height}")]
    DimensionMismatch {
        width: usize,
        height: usize,
        len: usize,
    },

    #[error("kornia image error: {0}")]
    Kornia(#[from] ImageError),

    #[error("failed to open {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: image::ImageError,
    },
}

/// A line or token rectangle on a code image.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AoiRect {
    pub kind: AoiLevel,
    /// `line N` or `line N part P`, both 1-based.
    pub name: String,
    pub line: usize,
    pub part: Option<usize>,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub token: Option<String>,
    pub srcml_tag: Option<String>,
    pub image: String,
}

impl AoiRect {
    fn new(kind: AoiLevel, line: usize, part: Option<usize>, bounds: Bounds, image: &str) -> Self {
        let name = match part {
            Some(p) => format!("line {line} part {p}"),
            None => format!("line {line}"),
        };
        Self {
            kind,
            name,
            line,
            part,
            x: bounds.x,
            y: bounds.y,
            width: bounds.width,
            height: bounds.height,
            token: None,
            srcml_tag: None,
            image: image.to_string(),
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }
}

#[derive(Debug, Clone, Copy)]
struct Bounds {
    x: f64,
    y: f64,
    width: f64,
    height: f64,
}

impl Bounds {
    /// Undoes the token probe's horizontal dilation, keeping the box centred.
    fn from_spans(columns: (usize, usize), rows: Span, margin_width: u32) -> Self {
        let mw = f64::from(margin_width);
        Self {
            x: columns.0 as f64 + mw / 2.0,
            y: rows.start as f64,
            width: (columns.1 - columns.0) as f64 - mw,
            height: (rows.end - rows.start) as f64,
        }
    }

    fn is_degenerate(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// Ink per row across the full image width.
fn row_profile(image: &BinaryImage) -> Vec<u32> {
    (0..image.height())
        .map(|y| image.row(y).map_or(0, |row| row.iter().filter(|&&px| px).count()) as u32)
        .collect()
}

/// Ink per column within a line band.
fn column_profile(image: &BinaryImage, band: Span) -> Vec<u32> {
    let mut profile = vec![0u32; image.width()];
    for row in (band.start..band.end).map_while(|y| image.row(y)) {
        for (count, &px) in profile.iter_mut().zip(row) {
            *count += u32::from(px);
        }
    }
    profile
}

/// Extracts line or token AOIs in top-to-bottom, left-to-right order.
///
/// Lines are numbered by band, so a blank band still consumes a line number
/// even though it yields no token AOIs. Rectangles with no area after the
/// margin correction are dropped.
pub fn extract_aois(
    image: &BinaryImage,
    config: &AoiConfig,
    image_name: &str,
) -> Result<Vec<AoiRect>, AoiError> {
    config.validate()?;

    let bands = scan_spans(&row_profile(image), config.margin_height as usize);
    let mut out = Vec::new();
    let mut dropped = 0usize;

    for (index, band) in bands.iter().enumerate() {
        let line = index + 1;
        let tokens = scan_spans(&column_profile(image, *band), config.margin_width as usize);

        match config.level {
            AoiLevel::SubLine => {
                for (p, token) in tokens.iter().enumerate() {
                    let bounds =
                        Bounds::from_spans((token.start, token.end), *band, config.margin_width);
                    if bounds.is_degenerate() {
                        dropped += 1;
                        continue;
                    }
                    out.push(AoiRect::new(AoiLevel::SubLine, line, Some(p + 1), bounds, image_name));
                }
            }
            AoiLevel::Line => {
                let (Some(first), Some(last)) = (tokens.first(), tokens.last()) else {
                    continue;
                };
                let bounds = Bounds::from_spans((first.start, last.end), *band, config.margin_width);
                if bounds.is_degenerate() {
                    dropped += 1;
                    continue;
                }
                out.push(AoiRect::new(AoiLevel::Line, line, None, bounds, image_name));
            }
        }
    }

    log::debug!(
        "{image_name}: {} line bands -> {} {} AOIs ({dropped} degenerate dropped)",
        bands.len(),
        out.len(),
        config.level
    );

    Ok(out)
}

/// Opens, binarizes and scans an image file.
pub fn extract_aois_from_path(
    path: &Path,
    config: &AoiConfig,
    binarize: &BinarizeConfig,
) -> Result<Vec<AoiRect>, AoiError> {
    let source = image::open(path).map_err(|source| AoiError::Open {
        path: path.display().to_string(),
        source,
    })?;
    let mask = BinaryImage::from_image(&source, binarize)?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    extract_aois(&mask, config, &name)
}
