//! Eye-movement analysis for code-reading experiments.
//!
//! Raw gaze samples become fixations ([`gaze::detect_fixations`]), rendered
//! code images become line and token rectangles ([`aoi::extract_aois`]), and
//! the two meet in [`hit_test::join`], which yields one [`hit_test::GazeRecord`]
//! per fixation landing on a token.

pub mod aoi;
pub mod config;
pub mod export;
pub mod gaze;
pub mod ingest;
pub mod overlay;
pub mod stimulus;

pub use config::PipelineConfig;
