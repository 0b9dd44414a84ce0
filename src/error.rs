use std::fmt;

/// Error codes reported by the vendor eye-tracker SDK.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SdkError {
    Internal,
    InsufficientLicense,
    NotSupported,
    NotAvailable,
    ConnectionFailed,
    TimedOut,
    AllocationFailed,
    InvalidParameter,
    AlreadySubscribed,
    NotSubscribed,
    OperationFailed,
    CallbackInProgress,
}

impl SdkError {
    /// Human readable message, matching the vendor's error table.
    pub fn message(&self) -> &'static str {
        match self {
            SdkError::Internal => "Internal error",
            SdkError::InsufficientLicense => "Insufficient license level",
            SdkError::NotSupported => "Not supported",
            SdkError::NotAvailable => "Not available",
            SdkError::ConnectionFailed => "Connection failed",
            SdkError::TimedOut => "Timed out",
            SdkError::AllocationFailed => "Allocation failed",
            SdkError::InvalidParameter => "Invalid parameter",
            SdkError::AlreadySubscribed => "Already subscribed",
            SdkError::NotSubscribed => "Not subscribed",
            SdkError::OperationFailed => "Operation failed",
            SdkError::CallbackInProgress => "Callback in progress",
        }
    }
}

impl fmt::Display for SdkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Errors that can occur while acquiring gaze data.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GazeError {
    #[error("SDK function {op} returned the following error: {code}")]
    Sdk { op: &'static str, code: SdkError },

    #[error("Timeout waiting for data")]
    Timeout,

    #[error("No eye tracker device found")]
    DeviceNotFound,

    #[error("Device does not support the wearable stream, which is required")]
    Unsupported,

    #[error("Session must be opened before waiting for data")]
    NotOpened,
}

impl GazeError {
    /// Expected outcomes that are retried on the next tick without logging
    /// at error level.
    pub fn is_transient(&self) -> bool {
        matches!(self, GazeError::Timeout | GazeError::DeviceNotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sdk_error_display_names_operation() {
        let err = GazeError::Sdk {
            op: "tobii_device_create",
            code: SdkError::ConnectionFailed,
        };
        assert_eq!(
            err.to_string(),
            "SDK function tobii_device_create returned the following error: Connection failed"
        );
    }

    #[test]
    fn test_transient_classification() {
        assert!(GazeError::Timeout.is_transient());
        assert!(GazeError::DeviceNotFound.is_transient());
        assert!(!GazeError::Unsupported.is_transient());
        assert!(!GazeError::NotOpened.is_transient());
        assert!(!GazeError::Sdk {
            op: "tobii_api_create",
            code: SdkError::Internal
        }
        .is_transient());
    }
}
