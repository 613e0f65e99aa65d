use image::{GrayImage, Luma};

const INK: Luma<u8> = Luma([0]);
const PAPER: Luma<u8> = Luma([255]);

/// Geometry of a block-glyph code rendering, in pixels.
///
/// Every non-space character becomes a solid `char_width` x `glyph_height`
/// block, so a word renders as one bar and the projection scan sees exactly
/// the token layout of the source text.
#[derive(Debug, Clone)]
pub struct StimulusLayout {
    pub left: u32,
    pub top: u32,
    pub glyph_height: u32,
    pub line_spacing: u32,
    pub char_width: u32,
    pub space_width: u32,
}

impl Default for StimulusLayout {
    fn default() -> Self {
        Self {
            left: 20,
            top: 20,
            glyph_height: 12,
            line_spacing: 24,
            char_width: 8,
            space_width: 12,
        }
    }
}

impl StimulusLayout {
    /// Horizontal advance of one character; tabs count as a space.
    fn advance(&self, ch: char) -> u32 {
        if is_blank(ch) { self.space_width } else { self.char_width }
    }

    fn line_width(&self, line: &str) -> u32 {
        line.chars().map(|c| self.advance(c)).sum()
    }
}

fn is_blank(ch: char) -> bool {
    ch == ' ' || ch == '\t'
}

/// Renders `lines` as black blocks on white, one text row per line.
///
/// Blank lines keep their vertical slot but leave no ink.
pub fn render_code_stimulus(lines: &[&str], layout: &StimulusLayout) -> GrayImage {
    let text_width = lines.iter().map(|l| layout.line_width(l)).max().unwrap_or(0);
    let width = (layout.left * 2 + text_width).max(1);
    let height = (layout.top * 2 + layout.line_spacing * lines.len() as u32).max(1);

    let mut img = GrayImage::from_pixel(width, height, PAPER);

    for (row, line) in lines.iter().enumerate() {
        let y0 = layout.top + row as u32 * layout.line_spacing;
        let mut x = layout.left;
        for ch in line.chars() {
            if !is_blank(ch) {
                fill_block(&mut img, x, y0, layout.char_width, layout.glyph_height);
            }
            x += layout.advance(ch);
        }
    }

    img
}

/// Paints an axis-aligned ink block, clipped to the image.
pub fn fill_block(img: &mut GrayImage, x0: u32, y0: u32, w: u32, h: u32) {
    let (width, height) = img.dimensions();
    for y in y0..(y0 + h).min(height) {
        for x in x0..(x0 + w).min(width) {
            img.put_pixel(x, y, INK);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn words_become_separate_bars() {
        let layout = StimulusLayout::default();
        let img = render_code_stimulus(&["ab c"], &layout);
        // "ab" spans 20..36, space 36..48, "c" 48..56
        assert_eq!(img.dimensions(), (76, 64));
        assert_eq!(img.get_pixel(20, 20), &INK);
        assert_eq!(img.get_pixel(35, 31), &INK);
        assert_eq!(img.get_pixel(40, 25), &PAPER);
        assert_eq!(img.get_pixel(48, 25), &INK);
        assert_eq!(img.get_pixel(20, 32), &PAPER);
    }

    #[test]
    fn tabs_leave_no_ink() {
        let layout = StimulusLayout::default();
        let img = render_code_stimulus(&["\tab"], &layout);
        // tab 20..32, "ab" 32..48
        assert_eq!(img.dimensions(), (68, 64));
        assert_eq!(img.get_pixel(25, 25), &PAPER);
        assert_eq!(img.get_pixel(32, 25), &INK);
    }
}
