use codegaze::aoi::{
    AoiConfig, AoiError, AoiLevel, AoiRect, BinarizeConfig, BinaryImage, Threshold, extract_aois,
};
use codegaze::stimulus::{StimulusLayout, fill_block, render_code_stimulus};
use image::{DynamicImage, GrayImage};

fn mask(img: GrayImage, binarize: &BinarizeConfig) -> BinaryImage {
    BinaryImage::from_image(&DynamicImage::ImageLuma8(img), binarize).expect("binarize")
}

fn stimulus(lines: &[&str]) -> BinaryImage {
    mask(
        render_code_stimulus(lines, &StimulusLayout::default()),
        &BinarizeConfig::default(),
    )
}

fn config(level: AoiLevel) -> AoiConfig {
    AoiConfig {
        level,
        ..AoiConfig::default()
    }
}

fn geometry(aoi: &AoiRect) -> (f64, f64, f64, f64) {
    (aoi.x, aoi.y, aoi.width, aoi.height)
}

#[test]
fn two_lines_give_two_line_aois() {
    let image = stimulus(&["aaaa bb", "ccc"]);
    let aois = extract_aois(&image, &config(AoiLevel::Line), "two_lines.png").unwrap();

    assert_eq!(aois.len(), 2);
    assert_eq!(aois[0].name, "line 1");
    assert_eq!(aois[1].name, "line 2");
    assert!(aois.iter().all(|a| a.kind == AoiLevel::Line && a.part.is_none()));

    // glyph rows 20..32 widened by the 4-row probe
    assert_eq!(geometry(&aois[0]), (17.5, 17.0, 66.0, 19.0));
    assert_eq!(geometry(&aois[1]), (17.5, 41.0, 30.0, 19.0));
    assert!(aois[0].bottom() <= aois[1].y);
    assert_eq!(aois[1].image, "two_lines.png");
}

#[test]
fn tokens_are_split_on_spaces() {
    let image = stimulus(&["int x = 1;"]);
    let aois = extract_aois(&image, &config(AoiLevel::SubLine), "decl.png").unwrap();

    let names: Vec<&str> = aois.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(
        names,
        ["line 1 part 1", "line 1 part 2", "line 1 part 3", "line 1 part 4"]
    );
    assert_eq!(geometry(&aois[0]), (17.5, 17.0, 30.0, 19.0));
    assert_eq!(geometry(&aois[1]), (53.5, 17.0, 14.0, 19.0));
    assert_eq!(geometry(&aois[2]), (73.5, 17.0, 14.0, 19.0));
    assert_eq!(geometry(&aois[3]), (93.5, 17.0, 22.0, 19.0));

    for pair in aois.windows(2) {
        assert!(pair[0].right() < pair[1].x);
    }
}

#[test]
fn band_without_token_gaps_keeps_its_line_number() {
    let layout = StimulusLayout::default();
    let mut img = render_code_stimulus(&["ab", "", "ef"], &layout);
    let width = img.width();
    // a solid rule in the empty second slot has no probe transitions
    fill_block(&mut img, 0, 44, width, 12);
    let image = mask(img, &BinarizeConfig::default());

    let tokens = extract_aois(&image, &config(AoiLevel::SubLine), "rule.png").unwrap();
    let names: Vec<&str> = tokens.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, ["line 1 part 1", "line 3 part 1"]);

    let lines = extract_aois(&image, &config(AoiLevel::Line), "rule.png").unwrap();
    let lines: Vec<usize> = lines.iter().map(|a| a.line).collect();
    assert_eq!(lines, [1, 3]);
}

#[test]
fn blank_image_has_no_aois() {
    let img = GrayImage::from_pixel(120, 80, image::Luma([255]));
    let image = mask(img, &BinarizeConfig::default());
    assert_eq!(image.foreground_count(), 0);
    assert!(
        extract_aois(&image, &AoiConfig::default(), "blank.png")
            .unwrap()
            .is_empty()
    );
}

#[test]
fn extraction_is_deterministic() {
    let image = stimulus(&["fn main() {", "    let a = 1;", "}"]);
    let first = extract_aois(&image, &AoiConfig::default(), "main.png").unwrap();
    let second = extract_aois(&image, &AoiConfig::default(), "main.png").unwrap();
    assert!(!first.is_empty());
    assert_eq!(first, second);
}

#[test]
fn zero_margins_are_rejected() {
    let image = stimulus(&["x"]);
    let bad = AoiConfig {
        margin_width: 0,
        ..AoiConfig::default()
    };
    assert!(matches!(
        extract_aois(&image, &bad, "x.png"),
        Err(AoiError::InvalidMargin {
            field: "margin_width"
        })
    ));
}

#[test]
fn otsu_threshold_matches_fixed_on_clean_render() {
    let lines = ["while (i < n) {", "i++;", "}"];
    let render = render_code_stimulus(&lines, &StimulusLayout::default());
    let otsu = BinarizeConfig {
        threshold: Threshold::Otsu,
        ..BinarizeConfig::default()
    };

    let fixed = extract_aois(&mask(render.clone(), &BinarizeConfig::default()), &AoiConfig::default(), "w.png").unwrap();
    let auto = extract_aois(&mask(render, &otsu), &AoiConfig::default(), "w.png").unwrap();
    assert_eq!(fixed, auto);
}

#[test]
fn dark_theme_is_inverted() {
    let mut render = render_code_stimulus(&["aaaa bb"], &StimulusLayout::default());
    for px in render.pixels_mut() {
        px.0[0] = 255 - px.0[0];
    }
    let image = mask(render, &BinarizeConfig::default());
    let aois = extract_aois(&image, &config(AoiLevel::Line), "dark.png").unwrap();
    assert_eq!(aois.len(), 1);
    assert_eq!(geometry(&aois[0]), (17.5, 17.0, 66.0, 19.0));
}

#[test]
fn mask_dimensions_are_checked() {
    assert!(matches!(
        BinaryImage::from_mask(4, 4, vec![false; 15]),
        Err(AoiError::DimensionMismatch { len: 15, .. })
    ));
}

#[test]
fn tab_indentation_does_not_widen_tokens() {
    let image = stimulus(&["if (a) {", "\tint x;"]);
    let aois = extract_aois(&image, &config(AoiLevel::SubLine), "indent.png").unwrap();

    let second: Vec<&AoiRect> = aois.iter().filter(|a| a.line == 2).collect();
    assert_eq!(second.len(), 2);
    // "int" is a 24 px glyph run starting after the 12 px tab
    assert_eq!((second[0].x, second[0].width), (29.5, 30.0));
}
