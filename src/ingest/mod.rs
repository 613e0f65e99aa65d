//! Vendor export readers. They hand the core plain samples or events and never
//! run any gaze analysis themselves.

pub mod eyelink;
pub use eyelink::{parse_eyelink_asc, resolve_trial_image};
pub mod smi;
pub use smi::parse_smi_tsv;

use std::ffi::OsStr;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::gaze::Experiment;

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("line {line}: {reason}")]
    Parse { line: usize, reason: String },

    #[error("{0} contains no trials")]
    NoTrials(PathBuf),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tracker {
    /// SMI RED250, raw samples in `.tsv`.
    SmiRed250,
    /// EyeLink 1000, segmented events in `.asc`.
    EyeLink1000,
}

impl Tracker {
    pub fn extension(&self) -> &'static str {
        match self {
            Tracker::SmiRed250 => "tsv",
            Tracker::EyeLink1000 => "asc",
        }
    }

    /// Participant id encoded in a recording's file name.
    pub fn participant_from_path(&self, path: &Path) -> String {
        let name = path.file_name().and_then(OsStr::to_str).unwrap_or_default();
        let id = match self {
            Tracker::SmiRed250 => name.split('_').next(),
            Tracker::EyeLink1000 => name.split('.').next(),
        };
        id.unwrap_or(name).to_string()
    }
}

impl fmt::Display for Tracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tracker::SmiRed250 => f.write_str("smi"),
            Tracker::EyeLink1000 => f.write_str("eyelink"),
        }
    }
}

impl FromStr for Tracker {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "smi" | "smired250" | "smi_red250" => Ok(Tracker::SmiRed250),
            "eyelink" | "eyelink1000" | "eye_link1000" => Ok(Tracker::EyeLink1000),
            other => Err(format!("unknown tracker '{other}' (expected smi or eyelink)")),
        }
    }
}

/// Reads one recording into an [`Experiment`].
///
/// For EyeLink files, trial images are looked up in Data Viewer's `runtime/`
/// tree next to the recording when it exists.
pub fn load_experiment(path: &Path, tracker: Tracker) -> Result<Experiment, IngestError> {
    let text = fs::read_to_string(path).map_err(|source| IngestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let participant = tracker.participant_from_path(path);
    log::info!("parsing {} ({tracker})", path.display());

    let mut trials = match tracker {
        Tracker::SmiRed250 => parse_smi_tsv(&text, &participant),
        Tracker::EyeLink1000 => parse_eyelink_asc(&text, &participant)?,
    };
    if trials.is_empty() {
        return Err(IngestError::NoTrials(path.to_path_buf()));
    }

    if tracker == Tracker::EyeLink1000 {
        let root = path.parent().unwrap_or(Path::new("."));
        for trial in trials.iter_mut() {
            trial.image = resolve_trial_image(root, &participant, trial.trial_id);
        }
    }

    Ok(Experiment {
        participant,
        trials,
    })
}

/// Loads every recording of `tracker`'s kind under `dir`, at most `limit` files.
///
/// A participant seen twice keeps its first recording.
pub fn load_dataset(
    dir: &Path,
    tracker: Tracker,
    limit: Option<usize>,
) -> Result<Vec<Experiment>, IngestError> {
    let mut files = Vec::new();
    collect_files(dir, tracker.extension(), &mut files)?;
    files.sort();

    let mut experiments: Vec<Experiment> = Vec::new();
    for path in files.into_iter().take(limit.unwrap_or(usize::MAX)) {
        let participant = tracker.participant_from_path(&path);
        if experiments.iter().any(|e| e.participant == participant) {
            log::warn!("participant {participant} already loaded, skipping {}", path.display());
            continue;
        }
        match load_experiment(&path, tracker) {
            Ok(experiment) => experiments.push(experiment),
            Err(e) => log::warn!("skipping {}: {e}", path.display()),
        }
    }

    log::info!("loaded {} experiments from {}", experiments.len(), dir.display());
    Ok(experiments)
}

fn collect_files(dir: &Path, extension: &str, out: &mut Vec<PathBuf>) -> Result<(), IngestError> {
    let entries = fs::read_dir(dir).map_err(|source| IngestError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    for entry in entries.filter_map(Result::ok) {
        let path = entry.path();
        if path.is_dir() {
            collect_files(&path, extension, out)?;
        } else if path
            .extension()
            .and_then(OsStr::to_str)
            .is_some_and(|e| e.eq_ignore_ascii_case(extension))
        {
            out.push(path);
        }
    }
    Ok(())
}
