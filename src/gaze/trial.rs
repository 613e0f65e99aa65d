//! Per-trial containers.
//!
//! Stored samples and events are never edited. Manual drift correction is kept
//! as an ordered log of offsets; the corrected views are computed on demand.

use super::events::{Blink, EyeEvent, Fixation, Sample, Saccade};
use super::fixation::{FixationConfig, FixationError, detect_fixations};

/// One manual drift correction, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct Offset {
    pub dx: f64,
    pub dy: f64,
}

/// One stimulus presentation to one participant.
#[derive(Debug, Clone)]
pub struct Trial {
    pub trial_id: u32,
    pub participant: String,
    /// Stimulus image file name, when known.
    pub image: Option<String>,
    samples: Vec<Sample>,
    events: Vec<EyeEvent>,
    offsets: Vec<Offset>,
    /// Total offset the stored detector fixations were computed under.
    filtered_at: (f64, f64),
}

impl Trial {
    /// Trial built from raw samples; fixations come from [`Trial::filter_fixations`].
    pub fn from_samples(
        trial_id: u32,
        participant: impl Into<String>,
        image: Option<String>,
        samples: Vec<Sample>,
    ) -> Self {
        Self {
            trial_id,
            participant: participant.into(),
            image,
            samples,
            events: Vec::new(),
            offsets: Vec::new(),
            filtered_at: (0.0, 0.0),
        }
    }

    /// Trial built from events the tracker already segmented.
    pub fn from_events(
        trial_id: u32,
        participant: impl Into<String>,
        image: Option<String>,
        events: Vec<EyeEvent>,
    ) -> Self {
        Self {
            trial_id,
            participant: participant.into(),
            image,
            samples: Vec::new(),
            events,
            offsets: Vec::new(),
            filtered_at: (0.0, 0.0),
        }
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn events(&self) -> &[EyeEvent] {
        &self.events
    }

    /// Raw samples, or events when the tracker reported no samples.
    pub fn sample_count(&self) -> usize {
        if self.samples.is_empty() {
            self.events.len()
        } else {
            self.samples.len()
        }
    }

    pub fn fixations(&self) -> impl Iterator<Item = &Fixation> {
        self.events.iter().filter_map(EyeEvent::as_fixation)
    }

    pub fn saccades(&self) -> impl Iterator<Item = &Saccade> {
        self.events.iter().filter_map(EyeEvent::as_saccade)
    }

    pub fn blinks(&self) -> impl Iterator<Item = &Blink> {
        self.events.iter().filter_map(EyeEvent::as_blink)
    }

    pub fn fixation_count(&self) -> usize {
        self.fixations().count()
    }

    /// Runs the dispersion filter over the offset-corrected samples and replaces
    /// the trial's fixations with the result. Saccades and blinks are kept.
    ///
    /// Trials without samples keep their tracker-reported fixations untouched;
    /// the existing fixation count is returned.
    pub fn filter_fixations(&mut self, config: &FixationConfig) -> Result<usize, FixationError> {
        if self.samples.is_empty() {
            log::debug!(
                "trial {} has no samples, keeping {} reported fixations",
                self.trial_id,
                self.fixation_count()
            );
            return Ok(self.fixation_count());
        }
        let fixations = detect_fixations(
            &self.corrected_samples(),
            config,
            self.trial_id,
            &self.participant,
        )?;
        let count = fixations.len();
        self.filtered_at = self.total_offset();

        self.events.retain(|e| e.as_fixation().is_none());
        self.events
            .extend(fixations.into_iter().map(EyeEvent::Fixation));
        self.events.sort_by_key(EyeEvent::timestamp);
        Ok(count)
    }

    pub fn apply_offset(&mut self, dx: f64, dy: f64) {
        self.offsets.push(Offset { dx, dy });
    }

    /// Drops the most recent correction.
    pub fn undo_offset(&mut self) -> Option<Offset> {
        self.offsets.pop()
    }

    pub fn reset_offset(&mut self) {
        self.offsets.clear();
    }

    pub fn offset_history(&self) -> &[Offset] {
        &self.offsets
    }

    pub fn total_offset(&self) -> (f64, f64) {
        self.offsets
            .iter()
            .fold((0.0, 0.0), |(x, y), o| (x + o.dx, y + o.dy))
    }

    pub fn corrected_samples(&self) -> Vec<Sample> {
        let (dx, dy) = self.total_offset();
        self.samples
            .iter()
            .map(|s| if s.valid { s.shifted(dx, dy) } else { *s })
            .collect()
    }

    /// Fixations with the accumulated offset applied.
    ///
    /// Detector fixations already carry the offset in force when they were
    /// filtered, so only the change since then is applied to them.
    pub fn corrected_fixations(&self) -> Vec<Fixation> {
        let (total_x, total_y) = self.total_offset();
        let (dx, dy) = (total_x - self.filtered_at.0, total_y - self.filtered_at.1);
        self.fixations().map(|f| f.shifted(dx, dy)).collect()
    }
}

/// All trials recorded for one participant.
#[derive(Debug, Clone)]
pub struct Experiment {
    pub participant: String,
    pub trials: Vec<Trial>,
}

impl Experiment {
    pub fn trial_count(&self) -> usize {
        self.trials.len()
    }

    pub fn trial(&self, trial_id: u32) -> Option<&Trial> {
        self.trials.iter().find(|t| t.trial_id == trial_id)
    }
}
