//! Source-code text and srcML tags for extracted AOIs.

use super::{AoiLevel, AoiRect};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("srcML table has no header row")]
    EmptyTable,

    #[error("srcML table is missing the '{0}' column")]
    MissingColumn(&'static str),
}

/// Splits code into the word grid the stimulus renderer laid out: indentation
/// and blank lines removed, words separated by single spaces.
pub fn code_words(code: &str) -> Vec<Vec<String>> {
    code.replace('\t', "")
        .replace("        ", "")
        .replace("    ", "")
        .split('\n')
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.is_empty())
        .map(|line| line.split(' ').map(str::to_string).collect())
        .collect()
}

/// Fills `token` on each AOI from the code's word grid.
///
/// Token AOIs take word `part` of line `line`; line AOIs take the whole line.
/// Positions the code does not have are left unset and counted in the result.
pub fn attach_tokens(aois: &mut [AoiRect], code: &str) -> usize {
    let words = code_words(code);
    let mut missing = 0usize;

    for aoi in aois.iter_mut() {
        let line = aoi.line.checked_sub(1).and_then(|l| words.get(l));
        aoi.token = match (aoi.kind, line) {
            (AoiLevel::SubLine, Some(words)) => aoi
                .part
                .and_then(|p| p.checked_sub(1))
                .and_then(|p| words.get(p))
                .cloned(),
            (AoiLevel::Line, Some(words)) => Some(words.join(" ")),
            (_, None) => None,
        };
        if aoi.token.as_deref().is_none_or(str::is_empty) {
            missing += 1;
        }
    }

    if missing > 0 {
        log::warn!("{missing} of {} AOIs have no matching token in the code file", aois.len());
    }
    missing
}

/// Fills `srcml_tag` from a tab-separated table with `AOI` and
/// `syntactic_context` columns. The first row naming an AOI wins.
pub fn attach_srcml_tags(aois: &mut [AoiRect], table: &str) -> Result<usize, TokenError> {
    let mut rows = table.lines().filter(|l| !l.trim().is_empty());
    let header: Vec<&str> = rows.next().ok_or(TokenError::EmptyTable)?.split('\t').collect();
    let column = |name: &'static str| {
        header
            .iter()
            .position(|h| h.trim() == name)
            .ok_or(TokenError::MissingColumn(name))
    };
    let aoi_col = column("AOI")?;
    let tag_col = column("syntactic_context")?;

    let entries: Vec<(&str, &str)> = rows
        .filter_map(|row| {
            let fields: Vec<&str> = row.split('\t').collect();
            Some((*fields.get(aoi_col)?, *fields.get(tag_col)?))
        })
        .collect();

    let mut tagged = 0usize;
    for aoi in aois.iter_mut() {
        aoi.srcml_tag = entries
            .iter()
            .find(|(name, _)| name.trim() == aoi.name)
            .map(|(_, tag)| tag.trim().to_string());
        if aoi.srcml_tag.is_some() {
            tagged += 1;
        }
    }
    Ok(tagged)
}

/// Code file behind an EMIP stimulus image.
pub fn emip_code_file(image: &str) -> Option<&'static str> {
    match image {
        "rectangle_java.jpg" | "rectangle_java2.jpg" => Some("Rectangle.java"),
        "rectangle_python.jpg" => Some("Rectangle.py"),
        "rectangle_scala.jpg" => Some("Rectangle.scala"),
        "vehicle_java.jpg" | "vehicle_java2.jpg" => Some("Vehicle.java"),
        "vehicle_python.jpg" => Some("vehicle.py"),
        "vehicle_scala.jpg" => Some("Vehicle.scala"),
        _ => None,
    }
}

/// srcML table for an EMIP stimulus; only the Java stimuli have one.
pub fn emip_srcml_table(image: &str) -> Option<&'static str> {
    match image {
        "rectangle_java.jpg" | "rectangle_java2.jpg" => Some("rectangle.tsv"),
        "vehicle_java.jpg" | "vehicle_java2.jpg" => Some("vehicle.tsv"),
        _ => None,
    }
}
