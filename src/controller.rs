use crate::tracker::EyeTracker;
use crate::types::{BlinkReport, EyeChannel, GazeReport, TimeValue};
use crate::Result;

/// Capability descriptor announced to the host, sent verbatim.
pub const DEVICE_DESCRIPTOR: &str = include_str!("descriptor.json");

/// Device name registered with the host.
pub const DEVICE_NAME: &str = "TobiiDevice";

/// Host-side output boundary.
pub trait ReportSink {
    fn send_descriptor(&mut self, descriptor: &str);
    fn report_gaze(&mut self, report: GazeReport);
    fn report_blink(&mut self, report: BlinkReport);
}

/// What one `update` tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The tracker could not be opened yet.
    NotReady,
    /// No new data this tick (timeout or recoverable failure).
    NoData,
    /// Both eye reports were emitted.
    Reported { blink_changed: bool },
}

type TrackerFactory<T> = Box<dyn FnMut() -> T + Send>;

/// Drives one eye tracker from the host's update loop.
///
/// The tracker is built lazily from the factory and opened on demand, so a
/// tracker that is absent at start-up is picked up on a later tick.
pub struct TrackerController<T: EyeTracker> {
    factory: TrackerFactory<T>,
    tracker: Option<T>,
    initialized: bool,
    last_blink: bool,
    descriptor_sent: bool,
}

impl<T: EyeTracker> TrackerController<T> {
    pub fn new<F>(factory: F) -> Self
    where
        F: FnMut() -> T + Send + 'static,
    {
        Self {
            factory: Box::new(factory),
            tracker: None,
            initialized: false,
            last_blink: false,
            descriptor_sent: false,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn tracker(&self) -> Option<&T> {
        self.tracker.as_ref()
    }

    /// Build the tracker if needed and open it. Idempotent once it succeeds.
    pub fn try_init(&mut self) -> Result<()> {
        if self.initialized {
            return Ok(());
        }
        let factory = &mut self.factory;
        let tracker = self.tracker.get_or_insert_with(|| factory());

        if let Err(err) = tracker.open() {
            log::warn!(
                "Could not initialize eye tracker ({}). Will try again later.",
                err
            );
            return Err(err);
        }
        self.initialized = true;
        Ok(())
    }

    /// Discard the tracker so the next `try_init` builds a fresh one.
    pub fn reset(&mut self) {
        self.tracker = None;
        self.initialized = false;
    }

    /// One host tick. Never fails: missing hardware and missing data are
    /// both normal outcomes.
    pub fn update(&mut self, sink: &mut dyn ReportSink) -> TickOutcome {
        let timestamp = TimeValue::now();

        if !self.descriptor_sent {
            sink.send_descriptor(DEVICE_DESCRIPTOR);
            self.descriptor_sent = true;
        }

        if self.try_init().is_err() {
            return TickOutcome::NotReady;
        }
        let tracker = match self.tracker.as_mut() {
            Some(tracker) => tracker,
            None => return TickOutcome::NotReady,
        };

        if tracker.wait_and_drain().is_err() {
            return TickOutcome::NoData;
        }

        let snap = tracker.snapshot();
        sink.report_gaze(GazeReport::new(EyeChannel::Left, &snap.left, timestamp));
        sink.report_gaze(GazeReport::new(EyeChannel::Right, &snap.right, timestamp));

        let blink_changed = snap.blinking != self.last_blink;
        if blink_changed {
            self.last_blink = snap.blinking;
            sink.report_blink(BlinkReport {
                blinking: snap.blinking,
                timestamp,
            });
        }
        TickOutcome::Reported { blink_changed }
    }
}
