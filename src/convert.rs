use crate::types::{GazeSample, Validity, WearableData, WearableEye};

/// Openness below this value counts as blinking.
pub const BLINK_OPENNESS_LOW: f32 = 0.1;
/// Openness above this value counts as blinking.
pub const BLINK_OPENNESS_HIGH: f32 = 0.9;

/// Maps raw vendor vectors into the host's reporting convention.
pub trait GazeTransform: Send + Sync {
    fn origin(&self, origin_mm: [f32; 3]) -> [f64; 3];
    fn direction(&self, direction: [f32; 3]) -> [f64; 3];
    fn position(&self, pupil: [f32; 2]) -> [f64; 2];
}

/// Passes vendor values through unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl GazeTransform for Identity {
    fn origin(&self, o: [f32; 3]) -> [f64; 3] {
        [o[0] as f64, o[1] as f64, o[2] as f64]
    }

    fn direction(&self, d: [f32; 3]) -> [f64; 3] {
        [d[0] as f64, d[1] as f64, d[2] as f64]
    }

    fn position(&self, p: [f32; 2]) -> [f64; 2] {
        [p[0] as f64, p[1] as f64]
    }
}

/// Multiplies origin and direction by 1000.
///
/// Unconfirmed against the host's unit contract: the origin already arrives
/// in millimeters, so this may double-scale. Opt in via
/// `GAZESYNC_LEGACY_SCALE`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LegacyMillimeterScale;

const LEGACY_SCALE: f64 = 1000.0;

impl GazeTransform for LegacyMillimeterScale {
    fn origin(&self, o: [f32; 3]) -> [f64; 3] {
        Identity.origin(o).map(|v| v * LEGACY_SCALE)
    }

    fn direction(&self, d: [f32; 3]) -> [f64; 3] {
        Identity.direction(d).map(|v| v * LEGACY_SCALE)
    }

    fn position(&self, p: [f32; 2]) -> [f64; 2] {
        Identity.position(p)
    }
}

/// Blink state for a single eye's openness. Both band edges are exclusive.
pub fn is_blinking(openness: f32) -> bool {
    openness < BLINK_OPENNESS_LOW || openness > BLINK_OPENNESS_HIGH
}

/// Convert one eye. Returns `None` when any required field is invalid.
pub fn convert_eye(eye: &WearableEye, transform: &dyn GazeTransform) -> Option<(GazeSample, bool)> {
    // Invalid fields are frequent and normal, so this is not logged.
    if !eye.validity.contains(Validity::all()) {
        return None;
    }

    let sample = GazeSample {
        position: transform.position(eye.pupil_position),
        direction: transform.direction(eye.gaze_direction),
        origin: transform.origin(eye.gaze_origin_mm),
        valid: true,
    };
    Some((sample, is_blinking(eye.eye_openness)))
}

/// Result of converting one binocular frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConvertedFrame {
    pub left: Option<GazeSample>,
    pub right: Option<GazeSample>,
    pub blinking: bool,
}

/// Convert both eyes of a frame. An eye that fails conversion contributes
/// no sample and `false` to the blink flag. `None` when neither eye is
/// usable.
pub fn convert_frame(data: &WearableData, transform: &dyn GazeTransform) -> Option<ConvertedFrame> {
    let left = convert_eye(&data.left, transform);
    let right = convert_eye(&data.right, transform);
    if left.is_none() && right.is_none() {
        return None;
    }

    // TODO: report left and right blink on separate channels once the host
    // descriptor grows a second blink channel.
    let blinking = left.is_some_and(|(_, b)| b) || right.is_some_and(|(_, b)| b);
    Some(ConvertedFrame {
        left: left.map(|(s, _)| s),
        right: right.map(|(s, _)| s),
        blinking,
    })
}
