use crate::config::Config;
use crate::convert::{convert_frame, GazeTransform};
use crate::error::{GazeError, SdkError};
use crate::sdk::{
    ApiHandle, DeviceHandle, EngineHandle, StreamKind, TrackerSdk, WearableCallback,
};
use crate::state::SharedGazeState;
use crate::tracker::EyeTracker;
use crate::types::{Snapshot, WearableData};
use crate::Result;
use std::sync::Arc;

/// Lifecycle position of a [`DeviceSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SessionState {
    Uninitialized,
    ApiCreated,
    EngineCreated,
    DeviceOpened,
    Subscribed,
    Closed,
}

/// Log a failed SDK call and turn it into a [`GazeError`].
fn sdk_failure(op: &'static str, code: SdkError) -> GazeError {
    let err = GazeError::Sdk { op, code };
    log::error!("{}", err);
    err
}

/// Log a failed cleanup call. Cleanup failures are never propagated.
fn log_sdk_failure(op: &'static str, code: SdkError) {
    log::error!("{}", GazeError::Sdk { op, code });
}

/// Owns the vendor API, engine and device handles and feeds the wearable
/// stream into a [`SharedGazeState`].
///
/// `open` walks `Uninitialized -> ApiCreated -> EngineCreated ->
/// DeviceOpened -> Subscribed`, keeping every step it completed, so a
/// failed call can be retried and resumes where it stopped. Handles are
/// released in reverse order by `close` or on drop.
pub struct DeviceSession<S: TrackerSdk> {
    sdk: S,
    config: Config,
    transform: Arc<dyn GazeTransform>,
    shared: Arc<SharedGazeState>,
    api: Option<ApiHandle>,
    engine: Option<EngineHandle>,
    device: Option<DeviceHandle>,
    subscribed: bool,
    unusable: bool,
    closed: bool,
}

impl<S: TrackerSdk> DeviceSession<S> {
    pub fn new(sdk: S, config: Config) -> Self {
        let transform = config.transform();
        Self::with_transform(sdk, config, transform)
    }

    pub fn with_transform(sdk: S, config: Config, transform: Arc<dyn GazeTransform>) -> Self {
        Self {
            sdk,
            config,
            transform,
            shared: Arc::new(SharedGazeState::new()),
            api: None,
            engine: None,
            device: None,
            subscribed: false,
            unusable: false,
            closed: false,
        }
    }

    pub fn state(&self) -> SessionState {
        if self.closed {
            SessionState::Closed
        } else if self.subscribed {
            SessionState::Subscribed
        } else if self.device.is_some() {
            SessionState::DeviceOpened
        } else if self.engine.is_some() {
            SessionState::EngineCreated
        } else if self.api.is_some() {
            SessionState::ApiCreated
        } else {
            SessionState::Uninitialized
        }
    }

    /// True once the device was found to lack the wearable stream. Such a
    /// session never opens; build a new one to try again.
    pub fn is_unusable(&self) -> bool {
        self.unusable
    }

    /// Advance to `Subscribed`. Succeeds immediately when already there.
    pub fn open(&mut self) -> Result<()> {
        if self.closed {
            log::error!("Cannot open a closed eye tracker session");
            return Err(GazeError::NotOpened);
        }
        if self.unusable {
            return Err(GazeError::Unsupported);
        }
        if self.subscribed {
            return Ok(());
        }

        let api = match self.api {
            Some(api) => api,
            None => {
                let api = self
                    .sdk
                    .api_create()
                    .map_err(|code| sdk_failure("tobii_api_create", code))?;
                self.api = Some(api);
                api
            }
        };

        if self.engine.is_none() {
            let engine = self
                .sdk
                .engine_create(api)
                .map_err(|code| sdk_failure("tobii_engine_create", code))?;
            self.engine = Some(engine);
        }

        if self.device.is_none() {
            let device = self.open_device(api)?;
            self.device = Some(device);
        }

        self.subscribe()
    }

    /// Create the device and check it before accepting it. A device that
    /// fails a check is destroyed again.
    fn open_device(&mut self, api: ApiHandle) -> Result<DeviceHandle> {
        let url = match &self.config.device_url {
            Some(url) => url.clone(),
            None => {
                let urls = self
                    .sdk
                    .enumerate_local_device_urls(api)
                    .map_err(|code| sdk_failure("tobii_enumerate_local_device_urls", code))?;
                match urls.into_iter().next() {
                    Some(url) => url,
                    None => {
                        log::debug!("No local eye tracker enumerated");
                        return Err(GazeError::DeviceNotFound);
                    }
                }
            }
        };

        let device = self
            .sdk
            .device_create(api, &url)
            .map_err(|code| sdk_failure("tobii_device_create", code))?;

        if let Err(err) = self.check_device(device) {
            if let Err(code) = self.sdk.device_destroy(device) {
                log_sdk_failure("tobii_device_destroy", code);
            }
            return Err(err);
        }

        log::info!("Opened eye tracker at {}", url);
        Ok(device)
    }

    fn check_device(&mut self, device: DeviceHandle) -> Result<()> {
        self.sdk
            .device_clear_callback_buffers(device)
            .map_err(|code| sdk_failure("tobii_device_clear_callback_buffers", code))?;

        let supported = self
            .sdk
            .stream_supported(device, StreamKind::Wearable)
            .map_err(|code| sdk_failure("tobii_stream_supported", code))?;
        if !supported {
            log::error!(
                "Eye tracker reports that it does not support the wearable stream, which is required"
            );
            self.unusable = true;
            return Err(GazeError::Unsupported);
        }
        Ok(())
    }

    /// Start the wearable stream on an opened device.
    pub fn subscribe(&mut self) -> Result<()> {
        if self.subscribed {
            return Ok(());
        }
        let device = match self.device {
            Some(device) if !self.closed => device,
            _ => {
                log::error!("Cannot subscribe before the device is opened");
                return Err(GazeError::NotOpened);
            }
        };

        let shared = self.shared.clone();
        let transform = self.transform.clone();
        let callback: WearableCallback = Arc::new(move |data: &WearableData| {
            if let Some(frame) = convert_frame(data, transform.as_ref()) {
                shared.publish_frame(frame.left, frame.right, frame.blinking);
            }
        });

        self.sdk
            .wearable_data_subscribe(device, callback)
            .map_err(|code| sdk_failure("tobii_wearable_data_subscribe", code))?;
        self.subscribed = true;
        Ok(())
    }

    /// Wait up to the configured timeout for callback data, then process
    /// it. A timeout returns [`GazeError::Timeout`] and is not logged.
    pub fn wait_and_drain(&mut self) -> Result<()> {
        let (engine, device) = match (self.engine, self.device) {
            (Some(engine), Some(device)) if self.subscribed && !self.closed => (engine, device),
            _ => {
                log::error!("Eye tracker session must be opened before waiting for data");
                return Err(GazeError::NotOpened);
            }
        };

        match self
            .sdk
            .wait_for_callbacks(engine, device, self.config.wait_timeout)
        {
            Ok(()) => {}
            Err(SdkError::TimedOut) => return Err(GazeError::Timeout),
            Err(code) => return Err(sdk_failure("tobii_wait_for_callbacks", code)),
        }

        self.sdk
            .device_process_callbacks(device)
            .map_err(|code| sdk_failure("tobii_device_process_callbacks", code))
    }

    pub fn snapshot(&self) -> Snapshot {
        self.shared.snapshot()
    }

    /// Release everything in reverse order. Each step runs even if an
    /// earlier one failed; failures are logged only. Idempotent.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        if let Some(device) = self.device.take() {
            if self.subscribed {
                if let Err(code) = self.sdk.wearable_data_unsubscribe(device) {
                    log_sdk_failure("tobii_wearable_data_unsubscribe", code);
                }
                self.subscribed = false;
            }
            if let Err(code) = self.sdk.device_destroy(device) {
                log_sdk_failure("tobii_device_destroy", code);
            }
        }
        if let Some(engine) = self.engine.take() {
            if let Err(code) = self.sdk.engine_destroy(engine) {
                log_sdk_failure("tobii_engine_destroy", code);
            }
        }
        if let Some(api) = self.api.take() {
            if let Err(code) = self.sdk.api_destroy(api) {
                log_sdk_failure("tobii_api_destroy", code);
            }
        }
        log::debug!("Eye tracker session closed");
    }
}

impl<S: TrackerSdk> Drop for DeviceSession<S> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<S: TrackerSdk> EyeTracker for DeviceSession<S> {
    fn open(&mut self) -> Result<()> {
        DeviceSession::open(self)
    }

    fn wait_and_drain(&mut self) -> Result<()> {
        DeviceSession::wait_and_drain(self)
    }

    fn snapshot(&self) -> Snapshot {
        DeviceSession::snapshot(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{SimCall, SimControl, SimulatedSdk};
    use crate::testlog;
    use crate::types::{Validity, WearableData, WearableEye};
    use std::time::Duration;

    fn session() -> (DeviceSession<SimulatedSdk>, SimControl) {
        let sdk = SimulatedSdk::new();
        let ctl = sdk.control();
        let config = Config {
            wait_timeout: Duration::from_millis(10),
            ..Config::default()
        };
        (DeviceSession::new(sdk, config), ctl)
    }

    fn frame(left: WearableEye, right: WearableEye) -> WearableData {
        WearableData {
            timestamp_us: 0,
            left,
            right,
        }
    }

    #[test]
    fn test_open_reaches_subscribed() {
        let (mut s, ctl) = session();
        assert_eq!(s.state(), SessionState::Uninitialized);
        s.open().unwrap();
        assert_eq!(s.state(), SessionState::Subscribed);
        assert!(ctl.is_subscribed());
        assert_eq!(
            ctl.calls(),
            vec![
                SimCall::ApiCreate,
                SimCall::EngineCreate,
                SimCall::EnumerateUrls,
                SimCall::DeviceCreate,
                SimCall::ClearCallbackBuffers,
                SimCall::StreamSupported,
                SimCall::Subscribe,
            ]
        );
    }

    #[test]
    fn test_open_when_subscribed_is_noop() {
        let (mut s, ctl) = session();
        s.open().unwrap();
        let before = ctl.calls().len();
        s.open().unwrap();
        assert_eq!(ctl.calls().len(), before);
    }

    #[test]
    fn test_failed_step_resumes_on_retry() {
        testlog::capture();
        let (mut s, ctl) = session();
        ctl.fail(SimCall::EngineCreate, SdkError::NotAvailable);

        let err = s.open().unwrap_err();
        assert_eq!(
            err,
            GazeError::Sdk {
                op: "tobii_engine_create",
                code: SdkError::NotAvailable
            }
        );
        assert_eq!(s.state(), SessionState::ApiCreated);
        let errors = testlog::errors();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("tobii_engine_create"));
        assert!(errors[0].contains("Not available"));

        ctl.clear_failure(SimCall::EngineCreate);
        s.open().unwrap();
        assert_eq!(s.state(), SessionState::Subscribed);
        assert_eq!(ctl.count(SimCall::ApiCreate), 1);
        assert_eq!(ctl.count(SimCall::EngineCreate), 2);
    }

    #[test]
    fn test_failed_device_check_destroys_device() {
        let (mut s, ctl) = session();
        ctl.fail(SimCall::ClearCallbackBuffers, SdkError::Internal);
        assert!(s.open().is_err());
        assert_eq!(s.state(), SessionState::EngineCreated);
        assert_eq!(ctl.count(SimCall::DeviceDestroy), 1);

        ctl.clear_failure(SimCall::ClearCallbackBuffers);
        s.open().unwrap();
        assert_eq!(ctl.count(SimCall::DeviceCreate), 2);
    }

    #[test]
    fn test_unsupported_stream_latches_unusable() {
        testlog::capture();
        let (mut s, ctl) = session();
        ctl.set_wearable_supported(false);

        assert_eq!(s.open(), Err(GazeError::Unsupported));
        assert!(s.is_unusable());
        assert_eq!(s.state(), SessionState::EngineCreated);
        assert_eq!(testlog::errors().len(), 1);

        ctl.set_wearable_supported(true);
        assert_eq!(s.open(), Err(GazeError::Unsupported));
        assert_eq!(ctl.count(SimCall::DeviceCreate), 1);
        assert_eq!(ctl.count(SimCall::Subscribe), 0);
    }

    #[test]
    fn test_missing_device_is_not_an_error() {
        testlog::capture();
        let (mut s, ctl) = session();
        ctl.set_device_urls(Vec::new());
        assert_eq!(s.open(), Err(GazeError::DeviceNotFound));
        assert!(testlog::errors().is_empty());
        assert_eq!(s.state(), SessionState::EngineCreated);
    }

    #[test]
    fn test_configured_url_skips_enumeration() {
        let sdk = SimulatedSdk::new();
        let ctl = sdk.control();
        ctl.set_device_urls(vec!["tobii-ttp://A".into(), "tobii-ttp://B".into()]);
        let config = Config {
            device_url: Some("tobii-ttp://B".into()),
            ..Config::default()
        };
        let mut s = DeviceSession::new(sdk, config);
        s.open().unwrap();
        assert_eq!(ctl.count(SimCall::EnumerateUrls), 0);
    }

    #[test]
    fn test_wait_before_open_fails() {
        let (mut s, _ctl) = session();
        assert_eq!(s.wait_and_drain(), Err(GazeError::NotOpened));
    }

    #[test]
    fn test_wait_timeout_is_silent() {
        testlog::capture();
        let (mut s, _ctl) = session();
        s.open().unwrap();
        for _ in 0..3 {
            assert_eq!(s.wait_and_drain(), Err(GazeError::Timeout));
        }
        assert!(testlog::errors().is_empty());
    }

    #[test]
    fn test_wait_failure_logs_once_per_call() {
        testlog::capture();
        let (mut s, ctl) = session();
        s.open().unwrap();
        ctl.fail(SimCall::WaitForCallbacks, SdkError::ConnectionFailed);

        assert!(s.wait_and_drain().is_err());
        assert_eq!(testlog::errors().len(), 1);
        assert!(s.wait_and_drain().is_err());
        assert_eq!(testlog::errors().len(), 2);
        assert!(testlog::errors()[0].contains("tobii_wait_for_callbacks"));
    }

    #[test]
    fn test_process_failure_logs_once() {
        testlog::capture();
        let (mut s, ctl) = session();
        s.open().unwrap();
        ctl.fail(SimCall::ProcessCallbacks, SdkError::OperationFailed);
        ctl.feed().push(WearableData::default());

        assert!(s.wait_and_drain().is_err());
        let errors = testlog::errors();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("tobii_device_process_callbacks"));
    }

    #[test]
    fn test_drain_publishes_converted_frames() {
        let (mut s, ctl) = session();
        s.open().unwrap();
        let left = WearableEye::valid([10.0, 20.0, 300.0], [0.0, 0.0, -1.0], 0.5, [0.4, 0.6]);
        let mut right = left;
        right.validity = Validity::GAZE_ORIGIN;
        ctl.feed().push(frame(left, right));

        s.wait_and_drain().unwrap();
        let snap = s.snapshot();
        assert!(snap.left.valid);
        assert_eq!(snap.left.origin, [10.0, 20.0, 300.0]);
        assert!(!snap.right.valid);
        assert!(!snap.blinking);
    }

    #[test]
    fn test_latest_frame_wins() {
        let (mut s, ctl) = session();
        s.open().unwrap();
        let feed = ctl.feed();
        for z in [1.0f32, 2.0, 3.0] {
            let eye = WearableEye::valid([0.0, 0.0, z], [0.0, 0.0, -1.0], 0.5, [0.5, 0.5]);
            feed.push(frame(eye, eye));
        }
        s.wait_and_drain().unwrap();
        assert_eq!(s.snapshot().left.origin[2], 3.0);
    }

    #[test]
    fn test_drop_tears_down_in_reverse_order() {
        let (mut s, ctl) = session();
        s.open().unwrap();
        drop(s);
        let calls = ctl.calls();
        assert_eq!(
            &calls[calls.len() - 4..],
            &[
                SimCall::Unsubscribe,
                SimCall::DeviceDestroy,
                SimCall::EngineDestroy,
                SimCall::ApiDestroy,
            ]
        );
        assert!(!ctl.is_subscribed());
    }

    #[test]
    fn test_teardown_continues_past_failures() {
        testlog::capture();
        let (mut s, ctl) = session();
        s.open().unwrap();
        ctl.fail(SimCall::Unsubscribe, SdkError::Internal);
        ctl.fail(SimCall::DeviceDestroy, SdkError::Internal);

        s.close();
        assert_eq!(s.state(), SessionState::Closed);
        assert_eq!(ctl.count(SimCall::EngineDestroy), 1);
        assert_eq!(ctl.count(SimCall::ApiDestroy), 1);
        let errors = testlog::errors();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].contains("tobii_wearable_data_unsubscribe"));
        assert!(errors[1].contains("tobii_device_destroy"));
    }

    #[test]
    fn test_rejected_device_cleanup_failure_is_logged() {
        testlog::capture();
        let (mut s, ctl) = session();
        ctl.fail(SimCall::ClearCallbackBuffers, SdkError::Internal);
        ctl.fail(SimCall::DeviceDestroy, SdkError::Internal);

        assert_eq!(
            s.open(),
            Err(GazeError::Sdk {
                op: "tobii_device_clear_callback_buffers",
                code: SdkError::Internal
            })
        );
        let errors = testlog::errors();
        assert_eq!(errors.len(), 2);
        assert!(errors[1].contains("tobii_device_destroy"));
    }

    #[test]
    fn test_close_is_idempotent_and_final() {
        let (mut s, ctl) = session();
        s.open().unwrap();
        s.close();
        s.close();
        drop(s);
        assert_eq!(ctl.count(SimCall::ApiDestroy), 1);
        assert_eq!(ctl.count(SimCall::DeviceDestroy), 1);
    }

    #[test]
    fn test_close_partial_session_releases_only_acquired() {
        let (mut s, ctl) = session();
        ctl.fail(SimCall::EngineCreate, SdkError::NotAvailable);
        assert!(s.open().is_err());
        s.close();
        assert_eq!(ctl.count(SimCall::ApiDestroy), 1);
        assert_eq!(ctl.count(SimCall::EngineDestroy), 0);
        assert_eq!(ctl.count(SimCall::Unsubscribe), 0);
    }

    #[test]
    fn test_closed_session_does_not_reopen() {
        let (mut s, ctl) = session();
        s.open().unwrap();
        s.close();
        assert_eq!(s.open(), Err(GazeError::NotOpened));
        assert_eq!(ctl.count(SimCall::ApiCreate), 1);
    }
}
