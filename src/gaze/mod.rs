pub mod events;
pub use events::{Blink, DeviceAttr, EyeEvent, Fixation, Saccade, Sample};
pub mod fixation;
pub use fixation::{FixationConfig, FixationError, Viewport, detect_fixations};
pub mod trial;
pub use trial::{Experiment, Offset, Trial};
