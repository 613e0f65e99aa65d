use image::RgbImage;
use plotters::prelude::*;

use crate::aoi::AoiRect;
use crate::gaze::{Fixation, Saccade};

const MIN_FIXATION_RADIUS: f64 = 3.0;

#[derive(Debug, Clone)]
pub struct OverlayStyle {
    pub aoi_color: RGBColor,
    pub fixation_fill: RGBColor,
    pub fixation_outline: RGBColor,
    pub saccade_color: RGBColor,
    /// Scale fixation discs with duration instead of a fixed size.
    pub size_by_duration: bool,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            aoi_color: RGBColor(0, 0, 0),
            fixation_fill: RGBColor(121, 128, 0),
            fixation_outline: RGBColor(255, 255, 0),
            saccade_color: RGBColor(122, 122, 0),
            size_by_duration: true,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum OverlayError {
    #[error("drawing failed: {0}")]
    Draw(String),

    #[error("{width}x{height} overlay does not fit in memory")]
    TooLarge { width: u32, height: u32 },
}

fn draw_err<E: std::error::Error + Send + Sync>(e: DrawingAreaErrorKind<E>) -> OverlayError {
    OverlayError::Draw(e.to_string())
}

/// Disc radius for a fixation: 5 px per 100 time units, at least 3 px.
pub fn fixation_radius(duration: u64) -> f64 {
    (5.0 * duration as f64 / 100.0).max(MIN_FIXATION_RADIUS)
}

/// Draws AOI outlines, saccade segments and fixation discs over the stimulus.
pub fn render_overlay(
    base: &RgbImage,
    aois: &[AoiRect],
    fixations: &[Fixation],
    saccades: &[Saccade],
    style: &OverlayStyle,
) -> Result<RgbImage, OverlayError> {
    let (width, height) = base.dimensions();
    if width == 0 || height == 0 {
        return Ok(base.clone());
    }
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(3))
        .ok_or(OverlayError::TooLarge { width, height })?;

    let mut rgb = base.as_raw().clone();
    {
        let root = BitMapBackend::with_buffer(&mut rgb, (width, height)).into_drawing_area();
        for aoi in aois {
            // inclusive far corner, matching a width x height pixel box
            let x0 = aoi.x.round() as i32;
            let y0 = aoi.y.round() as i32;
            let x1 = (aoi.x + aoi.width).round() as i32 - 1;
            let y1 = (aoi.y + aoi.height).round() as i32 - 1;
            root.draw(&Rectangle::new([(x0, y0), (x1, y1)], style.aoi_color))
                .map_err(draw_err)?;
        }

        for s in saccades {
            let from = (s.start.0.round() as i32, s.start.1.round() as i32);
            let to = (s.end.0.round() as i32, s.end.1.round() as i32);
            root.draw(&PathElement::new(
                [from, to],
                style.saccade_color.stroke_width(2),
            ))
            .map_err(draw_err)?;
        }

        for f in fixations {
            let center = (f.x.round() as i32, f.y.round() as i32);
            let r = if style.size_by_duration {
                fixation_radius(f.duration)
            } else {
                MIN_FIXATION_RADIUS
            }
            .round() as i32;
            root.draw(&Circle::new(center, r, style.fixation_fill.filled()))
                .map_err(draw_err)?;
            root.draw(&Circle::new(center, r, style.fixation_outline))
                .map_err(draw_err)?;
        }

        root.present().map_err(draw_err)?;
    }

    RgbImage::from_raw(width, height, rgb).ok_or(OverlayError::TooLarge { width, height })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aoi::AoiLevel;
    use crate::gaze::DeviceAttr;
    use image::Rgb;

    #[test]
    fn radius_grows_with_duration() {
        assert_eq!(fixation_radius(20), 3.0);
        assert_eq!(fixation_radius(400), 20.0);
    }

    #[test]
    fn draws_discs_and_outlines() {
        let base = RgbImage::from_pixel(100, 100, Rgb([255, 255, 255]));
        let aoi = AoiRect {
            kind: AoiLevel::Line,
            name: "line 1".into(),
            line: 1,
            part: None,
            x: 10.0,
            y: 10.0,
            width: 30.0,
            height: 12.0,
            token: None,
            srcml_tag: None,
            image: "blank.png".into(),
        };
        let fix = Fixation {
            trial_id: 0,
            participant: "p".into(),
            timestamp: 0,
            duration: 100,
            x: 70.0,
            y: 70.0,
            token: None,
            device: DeviceAttr::None,
        };

        let out = render_overlay(&base, &[aoi], &[fix], &[], &OverlayStyle::default()).unwrap();
        assert_eq!(out.dimensions(), (100, 100));
        assert_eq!(out.get_pixel(10, 10), &Rgb([0, 0, 0]));
        assert_eq!(out.get_pixel(70, 70), &Rgb([121, 128, 0]));
        assert_eq!(out.get_pixel(95, 5), &Rgb([255, 255, 255]));
    }
}
