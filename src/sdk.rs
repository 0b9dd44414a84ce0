//! Vendor SDK boundary.
//!
//! Models the lifecycle calls of a wearable eye-tracker stream engine:
//! api/engine/device creation, wearable stream subscription, bounded waits
//! and callback processing, and destruction. Every call reports an
//! [`SdkError`] code on failure; the session layer decides what to log.

use crate::error::SdkError;
use crate::types::WearableData;
use std::sync::Arc;
use std::time::Duration;

/// Opaque API context handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ApiHandle(pub u64);

/// Opaque engine handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EngineHandle(pub u64);

/// Opaque device handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceHandle(pub u64);

/// Data streams a device may offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    GazePoint,
    Wearable,
}

/// Callback invoked with each wearable frame.
///
/// May run on a thread other than the one that subscribed.
pub type WearableCallback = Arc<dyn Fn(&WearableData) + Send + Sync>;

pub type SdkResult<T> = std::result::Result<T, SdkError>;

/// Lifecycle calls consumed from the vendor SDK.
pub trait TrackerSdk: Send {
    fn api_create(&mut self) -> SdkResult<ApiHandle>;
    fn api_destroy(&mut self, api: ApiHandle) -> SdkResult<()>;

    fn engine_create(&mut self, api: ApiHandle) -> SdkResult<EngineHandle>;
    fn engine_destroy(&mut self, engine: EngineHandle) -> SdkResult<()>;

    /// URLs of locally attached devices, in enumeration order.
    fn enumerate_local_device_urls(&mut self, api: ApiHandle) -> SdkResult<Vec<String>>;

    fn device_create(&mut self, api: ApiHandle, url: &str) -> SdkResult<DeviceHandle>;
    fn device_destroy(&mut self, device: DeviceHandle) -> SdkResult<()>;
    fn device_clear_callback_buffers(&mut self, device: DeviceHandle) -> SdkResult<()>;

    fn stream_supported(&mut self, device: DeviceHandle, stream: StreamKind) -> SdkResult<bool>;

    fn wearable_data_subscribe(
        &mut self,
        device: DeviceHandle,
        callback: WearableCallback,
    ) -> SdkResult<()>;

    /// After this returns, the SDK invokes no further callbacks for `device`.
    fn wearable_data_unsubscribe(&mut self, device: DeviceHandle) -> SdkResult<()>;

    /// Block until `device` has pending callbacks or `timeout` elapses.
    /// A timeout is reported as [`SdkError::TimedOut`].
    fn wait_for_callbacks(
        &mut self,
        engine: EngineHandle,
        device: DeviceHandle,
        timeout: Duration,
    ) -> SdkResult<()>;

    /// Dispatch pending callbacks for `device`.
    fn device_process_callbacks(&mut self, device: DeviceHandle) -> SdkResult<()>;
}
