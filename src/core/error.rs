//! The tagged error value used throughout the image/JPEG/property-surface
//! core: a plain `Result<T, CamError>` error type, success represented by
//! `Ok` rather than a sentinel variant.

use std::fmt;

/// One of the fourteen failure kinds, plus a stable numeric code used
/// verbatim in the diagnostic string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CamError {
    Failed,
    NullPointer,
    OutOfMemory,
    IoError,
    DeviceNotReady,
    ConfigurationNotSupported,
    UnknownProperty,
    UnsupportedProperty,
    InvalidPropertyValue,
    ReadOnlyProperty,
    UnsupportedPixelFormat,
    ImageParametersMismatch,
    ImageEncodingFailed,
}

impl CamError {
    /// Stable numeric code for this failure kind, starting at 1 (0 is
    /// reserved for success, which a `Result`-based design represents with
    /// `Ok` rather than a variant).
    pub fn code(self) -> i32 {
        match self {
            CamError::Failed => 1,
            CamError::NullPointer => 2,
            CamError::OutOfMemory => 3,
            CamError::IoError => 4,
            CamError::DeviceNotReady => 5,
            CamError::ConfigurationNotSupported => 6,
            CamError::UnknownProperty => 7,
            CamError::UnsupportedProperty => 8,
            CamError::InvalidPropertyValue => 9,
            CamError::ReadOnlyProperty => 10,
            CamError::UnsupportedPixelFormat => 11,
            CamError::ImageParametersMismatch => 12,
            CamError::ImageEncodingFailed => 13,
        }
    }

    fn diagnostic(self) -> &'static str {
        match self {
            CamError::Failed => "generic failure",
            CamError::NullPointer => "input parameter is a null pointer",
            CamError::OutOfMemory => "out of memory",
            CamError::IoError => "I/O error",
            CamError::DeviceNotReady => "device is not ready for the requested action",
            CamError::ConfigurationNotSupported => "configuration is not supported",
            CamError::UnknownProperty => "specified property is not known",
            CamError::UnsupportedProperty => "specified property is not supported",
            CamError::InvalidPropertyValue => "specified property value is not valid",
            CamError::ReadOnlyProperty => "specified property is read only",
            CamError::UnsupportedPixelFormat => "pixel format is not supported",
            CamError::ImageParametersMismatch => "image parameters don't match",
            CamError::ImageEncodingFailed => "failed image encoding",
        }
    }
}

impl fmt::Display for CamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code(), self.diagnostic())
    }
}

impl std::error::Error for CamError {}

pub type Result<T> = std::result::Result<T, CamError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable_and_nonzero() {
        assert_eq!(CamError::Failed.code(), 1);
        assert_eq!(CamError::ImageEncodingFailed.code(), 13);
    }

    #[test]
    fn display_includes_code_and_message() {
        let msg = CamError::UnknownProperty.to_string();
        assert!(msg.contains('7'));
        assert!(msg.contains("not known"));
    }
}
