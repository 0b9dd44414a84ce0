use std::time::{SystemTime, UNIX_EPOCH};

/// One eye's gaze measurement as reported to the host.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GazeSample {
    /// Normalized sensor-plane position [x, y] in (0.0, 0.0) .. (1.0, 1.0).
    pub position: [f64; 2],
    /// Gaze direction [x, y, z].
    pub direction: [f64; 3],
    /// Gaze ray origin [x, y, z].
    pub origin: [f64; 3],
    /// False only for the default sample that was never published.
    pub valid: bool,
}

/// Which eye a sample belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eye {
    Left,
    Right,
}

/// Consistent copy of the shared gaze state.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Snapshot {
    pub left: GazeSample,
    pub right: GazeSample,
    pub blinking: bool,
}

bitflags::bitflags! {
    /// Per-field validity of a raw wearable eye measurement.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Validity: u8 {
        const GAZE_ORIGIN    = 1 << 0;
        const GAZE_DIRECTION = 1 << 1;
        const EYE_OPENNESS   = 1 << 2;
        const PUPIL_POSITION = 1 << 3;
    }
}

/// Raw per-eye measurement as delivered by the wearable stream.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WearableEye {
    pub validity: Validity,
    /// Gaze origin in millimeters.
    pub gaze_origin_mm: [f32; 3],
    /// Normalized gaze direction.
    pub gaze_direction: [f32; 3],
    /// Eye openness; 0.5 is a fully open eye.
    pub eye_openness: f32,
    /// Pupil position in the sensor area, (0.0, 0.0) .. (1.0, 1.0).
    pub pupil_position: [f32; 2],
}

impl WearableEye {
    /// A measurement with every field marked valid.
    pub fn valid(
        gaze_origin_mm: [f32; 3],
        gaze_direction: [f32; 3],
        eye_openness: f32,
        pupil_position: [f32; 2],
    ) -> Self {
        Self {
            validity: Validity::all(),
            gaze_origin_mm,
            gaze_direction,
            eye_openness,
            pupil_position,
        }
    }
}

/// One binocular frame from the wearable stream.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WearableData {
    /// Device timestamp in microseconds.
    pub timestamp_us: i64,
    pub left: WearableEye,
    pub right: WearableEye,
}

/// Wall-clock timestamp attached to host reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeValue {
    pub seconds: i64,
    pub microseconds: i32,
}

impl TimeValue {
    pub fn now() -> Self {
        match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(d) => TimeValue {
                seconds: d.as_secs() as i64,
                microseconds: d.subsec_micros() as i32,
            },
            Err(_) => TimeValue::default(),
        }
    }
}

/// Host eye-tracker channel.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EyeChannel {
    Left = 0,
    Right = 1,
}

impl From<Eye> for EyeChannel {
    fn from(eye: Eye) -> Self {
        match eye {
            Eye::Left => EyeChannel::Left,
            Eye::Right => EyeChannel::Right,
        }
    }
}

/// Gaze report emitted to the host for one eye.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GazeReport {
    pub channel: EyeChannel,
    pub position: [f64; 2],
    pub direction: [f64; 3],
    pub origin: [f64; 3],
    pub timestamp: TimeValue,
}

impl GazeReport {
    pub fn new(channel: EyeChannel, sample: &GazeSample, timestamp: TimeValue) -> Self {
        Self {
            channel,
            position: sample.position,
            direction: sample.direction,
            origin: sample.origin,
            timestamp,
        }
    }
}

/// Blink transition emitted on the single blink channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlinkReport {
    pub blinking: bool,
    pub timestamp: TimeValue,
}
