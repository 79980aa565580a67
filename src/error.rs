#![allow(dead_code)]

use thiserror::Error;

use crate::core::error::CamError;

/// Top-level error type the application surfaces from `main` and from
/// component startup. Subsystem errors (`CamError`, `std::io::Error`,
/// `config::ConfigError`) are wrapped via `#[from]`; ad-hoc failures with
/// no dedicated variant use `System`/`Component`.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("camera/http core error: {0}")]
    Core(#[from] CamError),

    #[error("{component}: {message}")]
    Component { component: String, message: String },

    #[error("{message}")]
    System { message: String },
}

impl AppError {
    pub fn component(component: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::Component {
            component: component.into(),
            message: message.into(),
        }
    }

    pub fn system(message: impl Into<String>) -> Self {
        AppError::System {
            message: message.into(),
        }
    }

    /// Coarse severity for logging: config/io/core issues are
    /// operational failures; ad-hoc component failures are warnings
    /// unless the caller chose to treat them otherwise.
    pub fn severity(&self) -> tracing::Level {
        match self {
            AppError::Config(_) | AppError::Io(_) | AppError::Core(_) => tracing::Level::ERROR,
            AppError::Component { .. } => tracing::Level::WARN,
            AppError::System { .. } => tracing::Level::ERROR,
        }
    }

    /// Whether the application can reasonably keep running after this
    /// error (e.g. a single bad frame) versus needing to exit.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, AppError::Component { .. })
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_errors_are_recoverable() {
        let err = AppError::component("capture", "frame decode failed");
        assert!(err.is_recoverable());
    }

    #[test]
    fn core_errors_are_not_recoverable() {
        let err = AppError::from(CamError::DeviceNotReady);
        assert!(!err.is_recoverable());
    }

    #[test]
    fn display_includes_the_underlying_message() {
        let err = AppError::system("shutting down");
        assert_eq!(err.to_string(), "shutting down");
    }
}
