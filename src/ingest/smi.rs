//! SMI RED250 tab-separated sample exports.

use crate::gaze::{Sample, Trial};

/// Right-eye point of regard, x then y, in pixels.
const R_POR_X: usize = 23;
const R_POR_Y: usize = 24;
/// Right-eye validity; `-1` marks a lost sample.
const R_VALIDITY: usize = 27;

const STIMULUS_SUFFIX: &str = ".jpg";

/// Splits an SMI export into trials, one per stimulus message.
///
/// Rows before the first stimulus message are file metadata. Malformed sample
/// rows are skipped.
pub fn parse_smi_tsv(text: &str, participant: &str) -> Vec<Trial> {
    let mut trials = Vec::new();
    let mut current: Option<(String, Vec<Sample>)> = None;
    let mut skipped = 0usize;

    for (line_no, line) in text.lines().enumerate() {
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 3 {
            continue;
        }

        match fields[1] {
            "MSG" => {
                let Some(image) = stimulus_from_message(&fields) else {
                    continue;
                };
                if let Some((image, samples)) = current.take() {
                    trials.push(Trial::from_samples(
                        trials.len() as u32,
                        participant,
                        Some(image),
                        samples,
                    ));
                }
                current = Some((image, Vec::new()));
            }
            "SMP" => {
                let Some((_, samples)) = current.as_mut() else {
                    continue;
                };
                match parse_sample(&fields) {
                    Some(sample) => samples.push(sample),
                    None => {
                        skipped += 1;
                        log::trace!("skipping malformed sample on line {}", line_no + 1);
                    }
                }
            }
            _ => {}
        }
    }

    if let Some((image, samples)) = current {
        trials.push(Trial::from_samples(
            trials.len() as u32,
            participant,
            Some(image),
            samples,
        ));
    }

    if skipped > 0 {
        log::warn!("{participant}: skipped {skipped} malformed SMI sample rows");
    }
    trials
}

/// `Message: vehicle_java2.jpg` -> `vehicle_java2.jpg`.
fn stimulus_from_message(fields: &[&str]) -> Option<String> {
    let message = fields.get(3)?;
    if !message.contains(STIMULUS_SUFFIX) {
        return None;
    }
    message.split(' ').next_back().map(|s| s.trim().to_string())
}

fn parse_sample(fields: &[&str]) -> Option<Sample> {
    let timestamp = fields.first()?.trim().parse::<u64>().ok()?;
    if fields.get(R_VALIDITY)?.trim() == "-1" {
        return Some(Sample::invalid(timestamp));
    }
    let x = fields.get(R_POR_X)?.trim().parse::<f64>().ok()?;
    let y = fields.get(R_POR_Y)?.trim().parse::<f64>().ok()?;
    if !(x.is_finite() && y.is_finite()) {
        return None;
    }
    Some(Sample::new(timestamp, x, y))
}
