//! Container-level error types

use std::time::Duration;
use thiserror::Error;

/// Errors raised by the monolith itself, as opposed to errors raised by
/// the modules it hosts.
#[derive(Debug, Error)]
pub enum MonolithError {
    /// A route pattern could not be parsed into `METHOD /path`
    #[error("Invalid route pattern '{pattern}': {reason}")]
    InvalidRoute {
        /// The offending pattern
        pattern: String,
        /// Why it was rejected
        reason: String,
    },

    /// Two registrations claimed the same method and path
    #[error("Route '{pattern}' registered twice (first by {first}, again by {second})")]
    DuplicateRoute {
        /// The colliding pattern
        pattern: String,
        /// Owner of the first registration
        first: String,
        /// Owner of the second registration
        second: String,
    },

    /// Registration attempted after the mux was handed to the server
    #[error("Mux is sealed, cannot register '{pattern}' after serving started")]
    MuxSealed {
        /// The rejected pattern
        pattern: String,
    },

    /// A lifecycle phase was invoked out of order
    #[error("Cannot run {phase}: {reason}")]
    PhaseOrder {
        /// The phase that was requested
        phase: &'static str,
        /// Why the request was refused
        reason: String,
    },

    /// Capability looked up before every module finished setup
    #[error("Capability '{capability}' is not ready: module setup still in progress")]
    CapabilityNotReady {
        /// Type name of the capability
        capability: &'static str,
    },

    /// No module provides the capability
    #[error("No module provides capability '{capability}'")]
    CapabilityMissing {
        /// Type name of the capability
        capability: &'static str,
    },

    /// Two modules provide the same capability
    #[error("Capability '{capability}' already provided by {provider}")]
    CapabilityDuplicate {
        /// Type name of the capability
        capability: &'static str,
        /// The module that provided it first
        provider: String,
    },

    /// Capability provided after setup finished
    #[error("Capability '{capability}' provided after setup completed")]
    CapabilityLate {
        /// Type name of the capability
        capability: &'static str,
    },

    /// A deferred capability was used before post-setup bound it
    #[error("Capability '{capability}' has not been bound yet")]
    Unbound {
        /// Type name of the capability
        capability: &'static str,
    },

    /// A deferred capability was bound twice
    #[error("Capability '{capability}' is already bound")]
    AlreadyBound {
        /// Type name of the capability
        capability: &'static str,
    },

    /// Listener could not bind its address
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        /// Address the listener tried to bind
        addr: String,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// Listener failed while accepting connections
    #[error("Listener failed: {0}")]
    Listener(#[source] std::io::Error),

    /// Termination signal handlers could not be installed
    #[error("Failed to install signal handler: {0}")]
    Signal(#[source] std::io::Error),

    /// In-flight connections did not finish within the drain window
    #[error("Graceful shutdown timed out after {0:?}")]
    DrainTimeout(Duration),
}

impl MonolithError {
    /// Create a phase ordering error
    pub fn phase(phase: &'static str, reason: impl Into<String>) -> Self {
        Self::PhaseOrder {
            phase,
            reason: reason.into(),
        }
    }

    /// Create an invalid route error
    pub fn invalid_route(pattern: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidRoute {
            pattern: pattern.into(),
            reason: reason.into(),
        }
    }
}

/// A specialized Result type for container operations
pub type Result<T> = std::result::Result<T, MonolithError>;
