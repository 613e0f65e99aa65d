//! Tabular and JSON output for gaze records, AOIs and fixations.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use serde::Serialize;

use crate::hit_test::GazeRecord;

const RECORD_COLUMNS: [&str; 15] = [
    "trial",
    "participant",
    "code_file",
    "code_language",
    "timestamp",
    "duration",
    "x_cord",
    "y_cord",
    "aoi_x",
    "aoi_y",
    "aoi_width",
    "aoi_height",
    "token",
    "length",
    "srcML",
];

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Tabs and newlines inside a field would break the row structure.
fn clean(field: &str) -> String {
    field.replace(['\t', '\n', '\r'], " ")
}

/// Writes gaze records as a tab-separated table with a header row.
pub fn write_records_tsv<W: Write>(records: &[GazeRecord], mut out: W) -> Result<(), ExportError> {
    writeln!(out, "{}", RECORD_COLUMNS.join("\t"))?;
    for r in records {
        writeln!(
            out,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            r.trial,
            clean(&r.participant),
            clean(&r.code_file),
            clean(&r.code_language),
            r.timestamp,
            r.duration,
            r.x,
            r.y,
            r.aoi_x,
            r.aoi_y,
            r.aoi_width,
            r.aoi_height,
            clean(&r.token),
            r.length,
            clean(&r.srcml_tag),
        )?;
    }
    Ok(())
}

pub fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, ExportError> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Writes `contents` to `path`, creating parent directories as needed.
pub fn write_text_file(path: &Path, contents: &str) -> Result<(), ExportError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, contents)?;
    Ok(())
}

pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), ExportError> {
    write_text_file(path, &to_json(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tsv_has_header_and_one_row_per_record() {
        let record = GazeRecord {
            trial: 2,
            participant: "p01".into(),
            code_file: "vehicle_java.jpg".into(),
            code_language: "java".into(),
            timestamp: 100,
            duration: 60,
            x: 10.5,
            y: 20.0,
            aoi_x: 8.0,
            aoi_y: 15.0,
            aoi_width: 30.0,
            aoi_height: 12.0,
            token: "int\tx".into(),
            length: 5,
            srcml_tag: "na".into(),
        };
        let mut buf = Vec::new();
        write_records_tsv(&[record], &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("trial\tparticipant"));
        assert_eq!(lines[1].split('\t').count(), RECORD_COLUMNS.len());
        assert!(lines[1].contains("int x"));
    }
}
