//! In-process stand-in for the vendor SDK.
//!
//! Frames are pushed through a [`SimFeed`] from any thread (typically a
//! producer thread playing the part of the vendor's streaming thread),
//! queued on a bounded crossbeam channel, and dispatched to the subscribed
//! callback from `device_process_callbacks`. Every lifecycle call is
//! recorded and any call can be made to fail through [`SimControl`].

use crate::error::SdkError;
use crate::sdk::{
    ApiHandle, DeviceHandle, EngineHandle, SdkResult, StreamKind, TrackerSdk, WearableCallback,
};
use crate::types::WearableData;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Depth of the simulated callback buffer.
const FEED_CAPACITY: usize = 256;

/// Default URL reported by enumeration.
pub const SIM_DEVICE_URL: &str = "tobii-ttp://SIM-0001";

/// Lifecycle calls the simulator records and can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimCall {
    ApiCreate,
    ApiDestroy,
    EngineCreate,
    EngineDestroy,
    EnumerateUrls,
    DeviceCreate,
    DeviceDestroy,
    ClearCallbackBuffers,
    StreamSupported,
    Subscribe,
    Unsubscribe,
    WaitForCallbacks,
    ProcessCallbacks,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

struct SimShared {
    calls: Mutex<Vec<SimCall>>,
    failures: Mutex<HashMap<SimCall, SdkError>>,
    device_urls: Mutex<Vec<String>>,
    wearable_supported: AtomicBool,
    subscribed: AtomicBool,
    sender: Sender<WearableData>,
}

/// Test and demo handle for steering a [`SimulatedSdk`] after it has been
/// moved into a session.
#[derive(Clone)]
pub struct SimControl {
    shared: Arc<SimShared>,
}

impl SimControl {
    /// Make every subsequent `call` fail with `code` until cleared.
    pub fn fail(&self, call: SimCall, code: SdkError) {
        lock(&self.shared.failures).insert(call, code);
    }

    pub fn clear_failure(&self, call: SimCall) {
        lock(&self.shared.failures).remove(&call);
    }

    pub fn set_device_urls(&self, urls: Vec<String>) {
        *lock(&self.shared.device_urls) = urls;
    }

    pub fn set_wearable_supported(&self, supported: bool) {
        self.shared.wearable_supported.store(supported, Ordering::SeqCst);
    }

    /// Whether a wearable subscription is currently active.
    pub fn is_subscribed(&self) -> bool {
        self.shared.subscribed.load(Ordering::SeqCst)
    }

    /// Every lifecycle call made so far, in order.
    pub fn calls(&self) -> Vec<SimCall> {
        lock(&self.shared.calls).clone()
    }

    pub fn count(&self, call: SimCall) -> usize {
        lock(&self.shared.calls).iter().filter(|&&c| c == call).count()
    }

    pub fn feed(&self) -> SimFeed {
        SimFeed {
            sender: self.shared.sender.clone(),
        }
    }
}

/// Producer side of the simulated wearable stream. Cheap to clone and
/// `Send`, so it can be moved onto a producer thread.
#[derive(Clone)]
pub struct SimFeed {
    sender: Sender<WearableData>,
}

impl SimFeed {
    /// Queue a frame. Returns false when the buffer is full and the frame
    /// was dropped.
    pub fn push(&self, data: WearableData) -> bool {
        match self.sender.try_send(data) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                log::trace!("Simulated callback buffer full, dropping frame");
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }
}

/// Simulated vendor SDK with a single attachable device.
pub struct SimulatedSdk {
    shared: Arc<SimShared>,
    receiver: Receiver<WearableData>,
    pending: VecDeque<WearableData>,
    subscription: Option<(DeviceHandle, WearableCallback)>,
    apis: HashSet<ApiHandle>,
    engines: HashSet<EngineHandle>,
    devices: HashSet<DeviceHandle>,
    next_handle: u64,
}

impl Default for SimulatedSdk {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedSdk {
    pub fn new() -> Self {
        let (sender, receiver) = crossbeam_channel::bounded(FEED_CAPACITY);
        let shared = Arc::new(SimShared {
            calls: Mutex::new(Vec::new()),
            failures: Mutex::new(HashMap::new()),
            device_urls: Mutex::new(vec![SIM_DEVICE_URL.to_string()]),
            wearable_supported: AtomicBool::new(true),
            subscribed: AtomicBool::new(false),
            sender,
        });
        Self {
            shared,
            receiver,
            pending: VecDeque::new(),
            subscription: None,
            apis: HashSet::new(),
            engines: HashSet::new(),
            devices: HashSet::new(),
            next_handle: 1,
        }
    }

    pub fn control(&self) -> SimControl {
        SimControl {
            shared: self.shared.clone(),
        }
    }

    /// Record the call and return its injected failure, if any.
    fn enter(&self, call: SimCall) -> SdkResult<()> {
        lock(&self.shared.calls).push(call);
        match lock(&self.shared.failures).get(&call) {
            Some(&code) => Err(code),
            None => Ok(()),
        }
    }

    fn next(&mut self) -> u64 {
        let h = self.next_handle;
        self.next_handle += 1;
        h
    }

    fn check_device(&self, device: DeviceHandle) -> SdkResult<()> {
        if self.devices.contains(&device) {
            Ok(())
        } else {
            Err(SdkError::InvalidParameter)
        }
    }
}

impl TrackerSdk for SimulatedSdk {
    fn api_create(&mut self) -> SdkResult<ApiHandle> {
        self.enter(SimCall::ApiCreate)?;
        let api = ApiHandle(self.next());
        self.apis.insert(api);
        Ok(api)
    }

    fn api_destroy(&mut self, api: ApiHandle) -> SdkResult<()> {
        self.enter(SimCall::ApiDestroy)?;
        if !self.apis.remove(&api) {
            return Err(SdkError::InvalidParameter);
        }
        Ok(())
    }

    fn engine_create(&mut self, api: ApiHandle) -> SdkResult<EngineHandle> {
        self.enter(SimCall::EngineCreate)?;
        if !self.apis.contains(&api) {
            return Err(SdkError::InvalidParameter);
        }
        let engine = EngineHandle(self.next());
        self.engines.insert(engine);
        Ok(engine)
    }

    fn engine_destroy(&mut self, engine: EngineHandle) -> SdkResult<()> {
        self.enter(SimCall::EngineDestroy)?;
        if !self.engines.remove(&engine) {
            return Err(SdkError::InvalidParameter);
        }
        Ok(())
    }

    fn enumerate_local_device_urls(&mut self, api: ApiHandle) -> SdkResult<Vec<String>> {
        self.enter(SimCall::EnumerateUrls)?;
        if !self.apis.contains(&api) {
            return Err(SdkError::InvalidParameter);
        }
        Ok(lock(&self.shared.device_urls).clone())
    }

    fn device_create(&mut self, api: ApiHandle, url: &str) -> SdkResult<DeviceHandle> {
        self.enter(SimCall::DeviceCreate)?;
        if !self.apis.contains(&api) {
            return Err(SdkError::InvalidParameter);
        }
        if !lock(&self.shared.device_urls).iter().any(|u| u == url) {
            return Err(SdkError::ConnectionFailed);
        }
        let device = DeviceHandle(self.next());
        self.devices.insert(device);
        Ok(device)
    }

    fn device_destroy(&mut self, device: DeviceHandle) -> SdkResult<()> {
        self.enter(SimCall::DeviceDestroy)?;
        if !self.devices.remove(&device) {
            return Err(SdkError::InvalidParameter);
        }
        if matches!(self.subscription, Some((d, _)) if d == device) {
            self.subscription = None;
            self.shared.subscribed.store(false, Ordering::SeqCst);
        }
        Ok(())
    }

    fn device_clear_callback_buffers(&mut self, device: DeviceHandle) -> SdkResult<()> {
        self.enter(SimCall::ClearCallbackBuffers)?;
        self.check_device(device)?;
        self.pending.clear();
        while self.receiver.try_recv().is_ok() {}
        Ok(())
    }

    fn stream_supported(&mut self, device: DeviceHandle, stream: StreamKind) -> SdkResult<bool> {
        self.enter(SimCall::StreamSupported)?;
        self.check_device(device)?;
        Ok(match stream {
            StreamKind::Wearable => self.shared.wearable_supported.load(Ordering::SeqCst),
            StreamKind::GazePoint => false,
        })
    }

    fn wearable_data_subscribe(
        &mut self,
        device: DeviceHandle,
        callback: WearableCallback,
    ) -> SdkResult<()> {
        self.enter(SimCall::Subscribe)?;
        self.check_device(device)?;
        if self.subscription.is_some() {
            return Err(SdkError::AlreadySubscribed);
        }
        self.subscription = Some((device, callback));
        self.shared.subscribed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn wearable_data_unsubscribe(&mut self, device: DeviceHandle) -> SdkResult<()> {
        self.enter(SimCall::Unsubscribe)?;
        self.check_device(device)?;
        match self.subscription.take() {
            Some((d, _)) if d == device => {
                self.shared.subscribed.store(false, Ordering::SeqCst);
                Ok(())
            }
            other => {
                self.subscription = other;
                Err(SdkError::NotSubscribed)
            }
        }
    }

    fn wait_for_callbacks(
        &mut self,
        engine: EngineHandle,
        device: DeviceHandle,
        timeout: Duration,
    ) -> SdkResult<()> {
        self.enter(SimCall::WaitForCallbacks)?;
        if !self.engines.contains(&engine) {
            return Err(SdkError::InvalidParameter);
        }
        self.check_device(device)?;
        if !self.pending.is_empty() {
            return Ok(());
        }
        match self.receiver.recv_timeout(timeout) {
            Ok(data) => {
                self.pending.push_back(data);
                Ok(())
            }
            Err(RecvTimeoutError::Timeout) => Err(SdkError::TimedOut),
            Err(RecvTimeoutError::Disconnected) => Err(SdkError::ConnectionFailed),
        }
    }

    fn device_process_callbacks(&mut self, device: DeviceHandle) -> SdkResult<()> {
        self.enter(SimCall::ProcessCallbacks)?;
        self.check_device(device)?;
        self.pending.extend(self.receiver.try_iter());

        let callback = match &self.subscription {
            Some((d, cb)) if *d == device => cb.clone(),
            // Frames for an unsubscribed device are discarded.
            _ => {
                self.pending.clear();
                return Ok(());
            }
        };
        while let Some(data) = self.pending.pop_front() {
            callback(&data);
        }
        Ok(())
    }
}
