//! Error taxonomy shared across the agent, matching the categories spec'd
//! for the core (validation, confirmation, protected-resource, external,
//! transport, fatal-startup).

use std::fmt;

/// Stable category used to decide how an error is surfaced: as MCP tool
/// text, as an HTTP status, or as a process-ending failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing/empty required field, unknown action, interval out of range.
    Validation,
    /// A destructive tool was invoked without `confirm=true`.
    ConfirmationRequired,
    /// Attempted to disable a `required` collector.
    ProtectedResource,
    /// A controller gateway (C2) call failed.
    ExternalFailure,
    /// Malformed request at a transport boundary (HTTP/stdio).
    Transport,
    /// Unrecoverable startup failure; propagates out of `run()`.
    FatalStartup,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Validation => "validation",
            ErrorKind::ConfirmationRequired => "confirmation_required",
            ErrorKind::ProtectedResource => "protected_resource",
            ErrorKind::ExternalFailure => "external_failure",
            ErrorKind::Transport => "transport",
            ErrorKind::FatalStartup => "fatal_startup",
        };
        f.write_str(s)
    }
}

/// The agent's common error type. Library crates return this (or a
/// `thiserror` enum that carries an `ErrorKind`) so that transports can map
/// uniformly to their own wire representation without inspecting strings.
#[derive(Debug, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct NexusError {
    kind: ErrorKind,
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl NexusError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn protected_resource(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ProtectedResource, message)
    }

    pub fn external(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ExternalFailure, message)
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Transport, message)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

pub type Result<T> = std::result::Result<T, NexusError>;
