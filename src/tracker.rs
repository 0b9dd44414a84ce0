use crate::types::Snapshot;
use crate::Result;

/// Eye-tracker backend driven by the poll loop.
pub trait EyeTracker: Send {
    /// Acquire and start the device. A no-op once started.
    fn open(&mut self) -> Result<()>;

    /// Block (bounded) until new data arrives and publish it.
    fn wait_and_drain(&mut self) -> Result<()>;

    /// Latest published state.
    fn snapshot(&self) -> Snapshot;
}

/// Backend with no hardware behind it: always opens, always has "data",
/// and reports the default state.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullTracker;

impl EyeTracker for NullTracker {
    fn open(&mut self) -> Result<()> {
        Ok(())
    }

    fn wait_and_drain(&mut self) -> Result<()> {
        Ok(())
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot::default()
    }
}

impl<T: EyeTracker + ?Sized> EyeTracker for Box<T> {
    fn open(&mut self) -> Result<()> {
        (**self).open()
    }

    fn wait_and_drain(&mut self) -> Result<()> {
        (**self).wait_and_drain()
    }

    fn snapshot(&self) -> Snapshot {
        (**self).snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_tracker_reports_defaults() {
        let mut tracker: Box<dyn EyeTracker> = Box::new(NullTracker);
        tracker.open().unwrap();
        tracker.wait_and_drain().unwrap();
        assert_eq!(tracker.snapshot(), Snapshot::default());
    }
}
