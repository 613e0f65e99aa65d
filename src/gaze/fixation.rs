//! Dispersion-threshold (I-DT style) fixation filter.
//!
//! Samples are accumulated into a window that grows to the right for as long as
//! `(max x - min x) + (max y - min y)` stays within `max_dispersion`. The sample
//! that breaks the threshold closes the window and is dropped; the closed window
//! becomes a fixation when it holds more than `ceil(min_duration / sample_interval)`
//! samples.
//!
//! The window never loses samples from the front, so its extrema are kept as
//! running scalars and each sample costs O(1).

use super::events::{DeviceAttr, Fixation, Sample};

const MIN_DURATION: u64 = 50;
const SAMPLE_INTERVAL: u64 = 4;
const MAX_DISPERSION: f64 = 25.0;
const SCREEN_WIDTH: f64 = 1920.0;
const SCREEN_HEIGHT: f64 = 1080.0;

/// Inclusive screen bounds; samples outside never reach the window.
#[derive(Debug, Clone, Copy, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn contains(&self, x: f64, y: f64) -> bool {
        (0.0..=self.width).contains(&x) && (0.0..=self.height).contains(&y)
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: SCREEN_WIDTH,
            height: SCREEN_HEIGHT,
        }
    }
}

/// Tuning for the dispersion filter. Durations share the sample clock's unit.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(default)]
pub struct FixationConfig {
    pub min_duration: u64,
    pub sample_interval: u64,
    pub max_dispersion: f64,
    pub viewport: Option<Viewport>,
    /// Emit the window still open at the end of the stream if it is long enough.
    pub flush_trailing: bool,
}

impl Default for FixationConfig {
    fn default() -> Self {
        Self {
            min_duration: MIN_DURATION,
            sample_interval: SAMPLE_INTERVAL,
            max_dispersion: MAX_DISPERSION,
            viewport: Some(Viewport::default()),
            flush_trailing: true,
        }
    }
}

impl FixationConfig {
    pub fn validate(&self) -> Result<(), FixationError> {
        if self.min_duration == 0 {
            return Err(FixationError::InvalidConfig {
                field: "min_duration",
                value: 0.0,
            });
        }
        if self.sample_interval == 0 {
            return Err(FixationError::InvalidConfig {
                field: "sample_interval",
                value: 0.0,
            });
        }
        if !(self.max_dispersion.is_finite() && self.max_dispersion > 0.0) {
            return Err(FixationError::InvalidConfig {
                field: "max_dispersion",
                value: self.max_dispersion,
            });
        }
        if let Some(vp) = self.viewport {
            if !(vp.width.is_finite() && vp.width > 0.0) {
                return Err(FixationError::InvalidConfig {
                    field: "viewport.width",
                    value: vp.width,
                });
            }
            if !(vp.height.is_finite() && vp.height > 0.0) {
                return Err(FixationError::InvalidConfig {
                    field: "viewport.height",
                    value: vp.height,
                });
            }
        }
        Ok(())
    }

    /// Minimum number of samples a window must exceed to count as a fixation.
    pub fn window_size(&self) -> usize {
        self.min_duration.div_ceil(self.sample_interval) as usize
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FixationError {
    #[error("invalid fixation config: {field} must be positive, got {value}")]
    InvalidConfig { field: &'static str, value: f64 },

    #[error("sample at t={timestamp} has non-finite coordinates")]
    NonFiniteSample { timestamp: u64 },

    #[error("sample timestamps go backwards: {timestamp} after {previous}")]
    OutOfOrder { previous: u64, timestamp: u64 },
}

/// Candidate window with running extrema and sums.
#[derive(Debug, Default)]
struct DispersionWindow {
    first_timestamp: u64,
    len: usize,
    sum_x: f64,
    sum_y: f64,
    min_x: f64,
    max_x: f64,
    min_y: f64,
    max_y: f64,
}

impl DispersionWindow {
    /// Dispersion the window would have after taking `(x, y)`.
    fn dispersion_with(&self, x: f64, y: f64) -> f64 {
        if self.len == 0 {
            return 0.0;
        }
        (self.max_x.max(x) - self.min_x.min(x)) + (self.max_y.max(y) - self.min_y.min(y))
    }

    fn push(&mut self, sample: &Sample) {
        if self.len == 0 {
            self.first_timestamp = sample.timestamp;
            self.min_x = sample.x;
            self.max_x = sample.x;
            self.min_y = sample.y;
            self.max_y = sample.y;
        } else {
            self.min_x = self.min_x.min(sample.x);
            self.max_x = self.max_x.max(sample.x);
            self.min_y = self.min_y.min(sample.y);
            self.max_y = self.max_y.max(sample.y);
        }
        self.sum_x += sample.x;
        self.sum_y += sample.y;
        self.len += 1;
    }

    fn centroid(&self) -> (f64, f64) {
        let n = self.len as f64;
        (self.sum_x / n, self.sum_y / n)
    }

    fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Groups a trial's samples into fixations.
///
/// Invalid samples and samples outside the viewport are skipped before they
/// can open or extend a window. Output is ordered by timestamp.
pub fn detect_fixations(
    samples: &[Sample],
    config: &FixationConfig,
    trial_id: u32,
    participant: &str,
) -> Result<Vec<Fixation>, FixationError> {
    config.validate()?;

    let window_size = config.window_size();
    let mut window = DispersionWindow::default();
    let mut out = Vec::new();
    let mut previous: Option<u64> = None;

    let emit = |window: &DispersionWindow, out: &mut Vec<Fixation>| {
        if window.len <= window_size {
            return;
        }
        let (x, y) = window.centroid();
        out.push(Fixation {
            trial_id,
            participant: participant.to_string(),
            timestamp: window.first_timestamp,
            duration: window.len as u64 * config.sample_interval,
            x,
            y,
            token: None,
            device: DeviceAttr::None,
        });
    };

    for sample in samples {
        if let Some(prev) = previous
            && sample.timestamp < prev
        {
            return Err(FixationError::OutOfOrder {
                previous: prev,
                timestamp: sample.timestamp,
            });
        }
        previous = Some(sample.timestamp);

        if !sample.valid {
            continue;
        }
        if !(sample.x.is_finite() && sample.y.is_finite()) {
            return Err(FixationError::NonFiniteSample {
                timestamp: sample.timestamp,
            });
        }
        if let Some(vp) = config.viewport
            && !vp.contains(sample.x, sample.y)
        {
            continue;
        }

        if window.dispersion_with(sample.x, sample.y) > config.max_dispersion {
            // The breaching sample is discarded, not used to seed the next window.
            emit(&window, &mut out);
            window.clear();
            continue;
        }
        window.push(sample);
    }

    if config.flush_trailing {
        emit(&window, &mut out);
    }

    log::debug!(
        "trial {trial_id} ({participant}): {} samples -> {} fixations (window > {window_size})",
        samples.len(),
        out.len()
    );

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_size_rounds_up() {
        let config = FixationConfig::default();
        assert_eq!(config.window_size(), 13);

        let exact = FixationConfig {
            min_duration: 40,
            ..FixationConfig::default()
        };
        assert_eq!(exact.window_size(), 10);
    }

    #[test]
    fn dispersion_is_sum_of_ranges() {
        let mut w = DispersionWindow::default();
        w.push(&Sample::new(0, 10.0, 10.0));
        w.push(&Sample::new(4, 13.0, 8.0));
        assert_eq!(w.dispersion_with(12.0, 9.0), 5.0);
        assert_eq!(w.dispersion_with(20.0, 8.0), 12.0);
    }

    #[test]
    fn rejects_zero_interval() {
        let config = FixationConfig {
            sample_interval: 0,
            ..FixationConfig::default()
        };
        assert!(matches!(
            detect_fixations(&[], &config, 0, "p"),
            Err(FixationError::InvalidConfig {
                field: "sample_interval",
                ..
            })
        ));
    }
}
