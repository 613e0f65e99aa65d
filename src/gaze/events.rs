//! Event records shared by the detector, the trial container and the join.

use serde::Serialize;

/// One raw gaze reading as handed over by an ingestion front-end.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub timestamp: u64,
    pub x: f64,
    pub y: f64,
    pub valid: bool,
}

impl Sample {
    pub fn new(timestamp: u64, x: f64, y: f64) -> Self {
        Self {
            timestamp,
            x,
            y,
            valid: true,
        }
    }

    pub fn invalid(timestamp: u64) -> Self {
        Self {
            timestamp,
            x: 0.0,
            y: 0.0,
            valid: false,
        }
    }

    /// Same sample moved by `(dx, dy)`.
    pub fn shifted(&self, dx: f64, dy: f64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            ..*self
        }
    }
}

/// Device-specific extras attached to an event.
///
/// Only EyeLink reports pupil size with its native fixations; everything else
/// (SMI samples, fixations produced by the dispersion filter) carries `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "device", rename_all = "snake_case")]
pub enum DeviceAttr {
    #[default]
    None,
    EyeLink {
        pupil: u32,
    },
}

impl DeviceAttr {
    pub fn pupil(&self) -> Option<u32> {
        match self {
            DeviceAttr::EyeLink { pupil } => Some(*pupil),
            DeviceAttr::None => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fixation {
    pub trial_id: u32,
    pub participant: String,
    pub timestamp: u64,
    pub duration: u64,
    pub x: f64,
    pub y: f64,
    /// Filled in by hit-testing; `None` until then.
    pub token: Option<String>,
    #[serde(flatten)]
    pub device: DeviceAttr,
}

impl Fixation {
    pub fn shifted(&self, dx: f64, dy: f64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Saccade {
    pub trial_id: u32,
    pub participant: String,
    pub timestamp: u64,
    pub duration: u64,
    pub start: (f64, f64),
    pub end: (f64, f64),
    pub amplitude: f64,
    pub peak_velocity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Blink {
    pub trial_id: u32,
    pub participant: String,
    pub timestamp: u64,
    pub duration: u64,
}

/// Any event a tracker can report inside a trial, in recording order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EyeEvent {
    Fixation(Fixation),
    Saccade(Saccade),
    Blink(Blink),
}

impl EyeEvent {
    pub fn timestamp(&self) -> u64 {
        match self {
            EyeEvent::Fixation(f) => f.timestamp,
            EyeEvent::Saccade(s) => s.timestamp,
            EyeEvent::Blink(b) => b.timestamp,
        }
    }

    pub fn as_fixation(&self) -> Option<&Fixation> {
        match self {
            EyeEvent::Fixation(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_saccade(&self) -> Option<&Saccade> {
        match self {
            EyeEvent::Saccade(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_blink(&self) -> Option<&Blink> {
        match self {
            EyeEvent::Blink(b) => Some(b),
            _ => None,
        }
    }
}
