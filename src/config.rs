//! Every tunable of the pipeline in one place, loadable from JSON.
//!
//! Missing keys fall back to the defaults, so a file only needs the values it
//! changes:
//!
//! ```json
//! { "fixation": { "max_dispersion": 30.0 }, "aoi": { "level": "line" } }
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::aoi::{AoiConfig, AoiError, BinarizeConfig};
use crate::gaze::{FixationConfig, FixationError};
use crate::hit_test::{HitTestConfig, HitTestError};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub fixation: FixationConfig,
    pub aoi: AoiConfig,
    pub binarize: BinarizeConfig,
    pub hit_test: HitTestConfig,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed config: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Fixation(#[from] FixationError),

    #[error(transparent)]
    Aoi(#[from] AoiError),

    #[error(transparent)]
    HitTest(#[from] HitTestError),
}

impl PipelineConfig {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Self::from_json(&fs::read_to_string(path)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.fixation.validate()?;
        self.aoi.validate()?;
        self.hit_test.validate()?;
        Ok(())
    }
}
