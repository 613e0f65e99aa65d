//! EyeLink 1000 ASC event files.
//!
//! Only the end-of-event lines are read; they carry the complete record:
//!
//! ```text
//! EFIX R   start end duration x y pupil
//! ESACC R  start end duration x y x1 y1 amplitude peak_velocity
//! EBLINK R start end duration
//! ```

use std::fs;
use std::path::Path;

use super::IngestError;
use crate::gaze::{Blink, DeviceAttr, EyeEvent, Fixation, Saccade, Trial};

const TRIAL_MARKER: &str = "TRIALID";
/// Missing coordinate in a saccade record.
const MISSING: &str = ".";

/// Splits an ASC file into trials at each `TRIALID` message.
///
/// Events seen before the first `TRIALID` are not attributed to any trial.
pub fn parse_eyelink_asc(text: &str, participant: &str) -> Result<Vec<Trial>, IngestError> {
    let mut trials = Vec::new();
    let mut current: Option<u32> = None;
    let mut events = Vec::new();
    let mut orphaned = 0usize;

    for (index, line) in text.lines().enumerate() {
        let line_no = index + 1;
        let fields: Vec<&str> = line.split_whitespace().collect();
        let Some(&kind) = fields.first() else {
            continue;
        };

        if fields.contains(&TRIAL_MARKER) {
            let id = parse_field::<u32>(&fields, fields.len() - 1, line_no)?;
            if let Some(prev) = current.replace(id) {
                trials.push(Trial::from_events(
                    prev,
                    participant,
                    None,
                    std::mem::take(&mut events),
                ));
            }
            continue;
        }

        let Some(trial_id) = current else {
            if matches!(kind, "EFIX" | "ESACC" | "EBLINK") {
                orphaned += 1;
            }
            continue;
        };

        let event = match kind {
            "EFIX" => EyeEvent::Fixation(Fixation {
                trial_id,
                participant: participant.to_string(),
                timestamp: parse_field(&fields, 2, line_no)?,
                duration: parse_field(&fields, 4, line_no)?,
                x: parse_field(&fields, 5, line_no)?,
                y: parse_field(&fields, 6, line_no)?,
                token: None,
                device: DeviceAttr::EyeLink {
                    pupil: parse_field(&fields, 7, line_no)?,
                },
            }),
            "ESACC" => EyeEvent::Saccade(Saccade {
                trial_id,
                participant: participant.to_string(),
                timestamp: parse_field(&fields, 2, line_no)?,
                duration: parse_field(&fields, 4, line_no)?,
                start: (
                    parse_coord(&fields, 5, line_no)?,
                    parse_coord(&fields, 6, line_no)?,
                ),
                end: (
                    parse_coord(&fields, 7, line_no)?,
                    parse_coord(&fields, 8, line_no)?,
                ),
                amplitude: parse_field(&fields, 9, line_no)?,
                peak_velocity: parse_field(&fields, 10, line_no)?,
            }),
            "EBLINK" => EyeEvent::Blink(Blink {
                trial_id,
                participant: participant.to_string(),
                timestamp: parse_field(&fields, 2, line_no)?,
                duration: parse_field(&fields, 4, line_no)?,
            }),
            _ => continue,
        };
        events.push(event);
    }

    if let Some(id) = current {
        trials.push(Trial::from_events(id, participant, None, events));
    }
    if orphaned > 0 {
        log::warn!("{participant}: {orphaned} events before the first {TRIAL_MARKER} were ignored");
    }
    Ok(trials)
}

fn parse_field<T: std::str::FromStr>(
    fields: &[&str],
    index: usize,
    line: usize,
) -> Result<T, IngestError> {
    let raw = fields.get(index).ok_or_else(|| IngestError::Parse {
        line,
        reason: format!("missing field {index}"),
    })?;
    raw.parse::<T>().map_err(|_| IngestError::Parse {
        line,
        reason: format!("field {index} '{raw}' is not a number"),
    })
}

fn parse_coord(fields: &[&str], index: usize, line: usize) -> Result<f64, IngestError> {
    if fields.get(index) == Some(&MISSING) {
        return Ok(0.0);
    }
    parse_field(fields, index, line)
}

/// Stimulus image recorded by Data Viewer for a trial.
///
/// Reads `<root>/runtime/dataviewer/<participant>/graphics/VC_<trial + 1>.vcl`;
/// the image path is the third field from the end of its second line.
pub fn resolve_trial_image(root: &Path, participant: &str, trial_id: u32) -> Option<String> {
    let vcl = root
        .join("runtime/dataviewer")
        .join(participant)
        .join("graphics")
        .join(format!("VC_{}.vcl", trial_id + 1));
    let text = fs::read_to_string(&vcl).ok()?;
    let fields: Vec<&str> = text.lines().nth(1)?.split_whitespace().collect();
    let path = fields.len().checked_sub(3).and_then(|i| fields.get(i))?;
    path.rsplit('/').next().map(str::to_string)
}
