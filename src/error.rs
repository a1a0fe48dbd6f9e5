//! Application-wide error types.

use thiserror::Error;

/// Process-level errors raised while booting or serving the bot.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(String),

    #[error("logger error: {0}")]
    Logger(String),

    #[error("server error: {0}")]
    Server(String),
}

/// Failures when reading a [`crate::field::Field`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FieldError {
    /// Timestamp-named key is absent or null.
    #[error("timestamp field '{key}' has no value")]
    MissingTimestamp { key: String },

    #[error("timestamp field '{key}' is not a valid timestamp: {value}")]
    InvalidTimestamp { key: String, value: String },

    #[error("payload is not a JSON object")]
    NotAnObject,
}

/// A slot value a converter could not turn into its target type.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConvertError {
    #[error("invalid date: '{0}'")]
    Date(String),

    #[error("invalid time: '{0}'")]
    Time(String),

    #[error("invalid duration: '{0}'")]
    Duration(String),

    #[error("{0}")]
    Custom(String),
}

impl ConvertError {
    /// Wrap any displayable error raised by a caller-supplied converter.
    pub fn custom(err: impl std::fmt::Display) -> Self {
        Self::Custom(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DispatchError {
    #[error("intent '{intent}' not found and no default intent registered")]
    HandlerNotFound { intent: String },
}

/// Errors surfaced by the adapter shell for a single webhook request.
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("malformed request: {0}")]
    MalformedRequest(String),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("handler produced no response")]
    NoResponse,
}

impl AdapterError {
    /// Short machine-readable code used in JSON error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MalformedRequest(_) => "bad_request",
            Self::Dispatch(DispatchError::HandlerNotFound { .. }) => "handler_not_found",
            Self::Serialize(_) => "internal",
            Self::NoResponse => "no_response",
        }
    }

    /// `true` when the caller (or the bot's configuration) is at fault.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::Serialize(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn config_error_display() {
        let e = AppError::Config("missing field".into());
        assert!(e.to_string().contains("config error"));
        assert!(e.to_string().contains("missing field"));
    }

    #[test]
    fn server_error_is_std_error() {
        let e = AppError::Server("bind failed".into());
        assert!(e.to_string().contains("server error"));
        let _: &dyn Error = &e;
    }

    #[test]
    fn handler_not_found_names_intent() {
        let e = DispatchError::HandlerNotFound { intent: "OrderPizza".into() };
        assert!(e.to_string().contains("OrderPizza"));
    }

    #[test]
    fn dispatch_error_is_client_error() {
        let e: AdapterError = DispatchError::HandlerNotFound { intent: "X".into() }.into();
        assert!(e.is_client_error());
        assert_eq!(e.code(), "handler_not_found");
    }

    #[test]
    fn serialize_error_is_server_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let e: AdapterError = json_err.into();
        assert!(!e.is_client_error());
        assert_eq!(e.code(), "internal");
    }

    #[test]
    fn custom_convert_error_keeps_message() {
        let e = ConvertError::custom("not a number");
        assert_eq!(e.to_string(), "not a number");
    }
}
