use crate::controller::TrackerController;
use crate::error::GazeError;
use crate::tracker::EyeTracker;
use crate::Result;

/// Driver name the host instantiates the detection callback under.
pub const DRIVER_NAME: &str = "Tobii";

/// Host registry that takes ownership of a detected device.
pub trait HostRegistry<T: EyeTracker> {
    fn adopt(&mut self, controller: TrackerController<T>);
}

/// One-shot hardware detection latch.
///
/// Until hardware is found, each `try_detect` probes the pending
/// controller. On the first success the controller is handed to the host
/// and the gate answers every later call with success without probing.
pub struct DetectionGate<T: EyeTracker> {
    make_controller: Box<dyn FnMut() -> TrackerController<T> + Send>,
    pending: Option<TrackerController<T>>,
    found: bool,
}

impl<T: EyeTracker> DetectionGate<T> {
    pub fn new<F>(make_controller: F) -> Self
    where
        F: FnMut() -> TrackerController<T> + Send + 'static,
    {
        Self {
            make_controller: Box::new(make_controller),
            pending: None,
            found: false,
        }
    }

    pub fn found(&self) -> bool {
        self.found
    }

    /// Host detection callback.
    pub fn try_detect(&mut self, host: &mut dyn HostRegistry<T>) -> Result<()> {
        if self.found {
            return Ok(());
        }

        let make_controller = &mut self.make_controller;
        let controller = self.pending.get_or_insert_with(|| make_controller());

        match controller.try_init() {
            Ok(()) => {
                self.found = true;
                if let Some(controller) = self.pending.take() {
                    host.adopt(controller);
                }
                log::info!("Eye tracker detected");
                Ok(())
            }
            Err(err) => {
                if err.is_transient() {
                    log::debug!("Device not detected yet ({})", err);
                } else {
                    log::error!("Device not detected: {}", err);
                }
                if err == GazeError::Unsupported {
                    // Start from a fresh controller on the next attempt.
                    self.pending = None;
                }
                Err(err)
            }
        }
    }
}
