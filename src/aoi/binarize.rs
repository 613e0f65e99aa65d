//! Turns a rendered stimulus into a foreground/background mask.

use image::DynamicImage;
use kornia::{
    image::{Image, ImageSize, allocator::CpuAllocator},
    imgproc,
};

use super::AoiError;

type CpuImage<T, const C: usize> = Image<T, C, CpuAllocator>;

const FIXED_THRESHOLD: u8 = 128;

/// Grey level above which a pixel counts as background.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Threshold {
    Fixed(u8),
    Otsu,
}

impl Default for Threshold {
    fn default() -> Self {
        Threshold::Fixed(FIXED_THRESHOLD)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(default)]
pub struct BinarizeConfig {
    pub threshold: Threshold,
    /// Swap foreground and background when "ink" covers more than half the
    /// image, so light-on-dark themes scan like dark-on-light ones.
    pub auto_invert: bool,
}

impl Default for BinarizeConfig {
    fn default() -> Self {
        Self {
            threshold: Threshold::default(),
            auto_invert: true,
        }
    }
}

/// Row-major mask where `true` marks a foreground (ink) pixel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryImage {
    width: usize,
    height: usize,
    foreground: Vec<bool>,
}

impl BinaryImage {
    pub fn from_mask(width: usize, height: usize, foreground: Vec<bool>) -> Result<Self, AoiError> {
        if width.checked_mul(height) != Some(foreground.len()) {
            return Err(AoiError::DimensionMismatch {
                width,
                height,
                len: foreground.len(),
            });
        }
        Ok(Self {
            width,
            height,
            foreground,
        })
    }

    /// Greyscale conversion and thresholding through kornia.
    pub fn from_image(source: &DynamicImage, config: &BinarizeConfig) -> Result<Self, AoiError> {
        let rgb = source.to_rgb8();
        let (width, height) = rgb.dimensions();
        let (width, height) = (width as usize, height as usize);
        if width == 0 || height == 0 {
            return Self::from_mask(width, height, Vec::new());
        }

        let image = CpuImage::<u8, 3>::new(ImageSize { width, height }, rgb.into_raw(), CpuAllocator)?;
        let mut gray = CpuImage::<u8, 1>::from_size_val(image.size(), 0u8, CpuAllocator)?;
        imgproc::color::gray_from_rgb_u8(&image, &mut gray)?;

        let threshold = match config.threshold {
            Threshold::Fixed(t) => t,
            Threshold::Otsu => otsu_threshold(gray.as_slice()),
        };
        let mut binary = CpuImage::<u8, 1>::from_size_val(gray.size(), 0u8, CpuAllocator)?;
        imgproc::threshold::threshold_binary(&gray, &mut binary, threshold, 255)?;

        // threshold_binary leaves ink at 0.
        let mut foreground: Vec<bool> = binary.as_slice().iter().map(|&px| px == 0).collect();
        if config.auto_invert {
            ensure_foreground_convention(&mut foreground);
        }
        log::debug!("binarized {width}x{height} stimulus at threshold {threshold}");

        Self::from_mask(width, height, foreground)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn is_foreground(&self, x: usize, y: usize) -> bool {
        x < self.width && y < self.height && self.foreground[y * self.width + x]
    }

    /// Pixels of row `y`, or `None` past the bottom edge.
    pub fn row(&self, y: usize) -> Option<&[bool]> {
        if y >= self.height {
            return None;
        }
        self.foreground.get(y * self.width..(y + 1) * self.width)
    }

    pub fn foreground_count(&self) -> usize {
        self.foreground.iter().filter(|&&f| f).count()
    }
}

fn ensure_foreground_convention(mask: &mut [bool]) {
    let foreground = mask.iter().filter(|&&px| px).count();
    if foreground * 2 <= mask.len() {
        return;
    }
    for px in mask.iter_mut() {
        *px = !*px;
    }
}

/// Grey level that best separates ink from paper (Otsu).
///
/// Levels at or below the returned value end up as ink after
/// `threshold_binary`. The first level with the largest between-class spread
/// wins, so a two-tone render splits right at its dark tone.
fn otsu_threshold(pixels: &[u8]) -> u8 {
    let mut histogram = [0u64; 256];
    for &level in pixels {
        histogram[usize::from(level)] += 1;
    }
    let total = pixels.len() as u64;
    let weighted_total: u64 = (0u64..).zip(histogram).map(|(level, n)| level * n).sum();

    let mut split = 0u8;
    let mut best_spread = 0f64;
    let (mut dark, mut weighted_dark) = (0u64, 0u64);
    for (level, count) in (0u8..=255).zip(histogram) {
        dark += count;
        weighted_dark += u64::from(level) * count;
        let light = total - dark;
        if dark == 0 || light == 0 {
            continue;
        }
        let gap = weighted_dark as f64 / dark as f64
            - (weighted_total - weighted_dark) as f64 / light as f64;
        let spread = dark as f64 * light as f64 * gap * gap;
        if spread > best_spread {
            best_spread = spread;
            split = level;
        }
    }

    split
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn otsu_splits_two_levels() {
        let mut pixels = vec![20u8; 50];
        pixels.extend(std::iter::repeat_n(230u8, 150));
        let t = otsu_threshold(&pixels);
        assert!((20..230).contains(&t), "threshold {t} outside the gap");
    }

    #[test]
    fn majority_ink_is_inverted() {
        let mut mask = vec![true, true, true, false];
        ensure_foreground_convention(&mut mask);
        assert_eq!(mask, vec![false, false, false, true]);
    }

    #[test]
    fn otsu_puts_pure_black_on_the_ink_side() {
        let mut pixels = vec![0u8; 30];
        pixels.extend(std::iter::repeat_n(255u8, 70));
        assert_eq!(otsu_threshold(&pixels), 0);
        assert_eq!(otsu_threshold(&[200u8; 16]), 0);
    }

    #[test]
    fn rows_past_the_edge_are_none() {
        let mask = BinaryImage::from_mask(2, 2, vec![true, false, false, true]).unwrap();
        assert_eq!(mask.row(1), Some(&[false, true][..]));
        assert_eq!(mask.row(2), None);
    }

    #[test]
    fn mask_length_must_match() {
        assert!(BinaryImage::from_mask(3, 2, vec![false; 5]).is_err());
    }
}
