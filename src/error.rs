//! Error types for the ground link.
//!
//! All errors implement `std::error::Error` and carry enough structured context
//! to decide whether an operation is worth retrying.
//!
//! ## Error Categories
//!
//! - **Transport Errors**: socket bind and send failures
//! - **Lifecycle Errors**: connecting twice, sending while disconnected
//! - **Semantic Errors**: unknown command names requested of the encoder
//! - **Configuration Errors**: unreadable or malformed connection settings
//!
//! Mission upload failures are not represented here. An upload attempt always
//! resolves to an [`UploadResult`](crate::mission::UploadResult) instead of
//! propagating an error past the attempt boundary.
//!
//! ## Recovery and Retry
//!
//! ```rust
//! use skylink::LinkError;
//!
//! let error = LinkError::NotConnected;
//! if error.is_retryable() {
//!     for suggestion in error.recovery_suggestions() {
//!         println!("  - {}", suggestion);
//!     }
//! }
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for link operations.
pub type Result<T, E = LinkError> = std::result::Result<T, E>;

/// Main error type for link operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum LinkError {
    #[error("Failed to bind UDP endpoint {addr}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to send datagram to {addr}")]
    Send {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to receive on {addr}")]
    Receive {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Link already connected on {addr}")]
    AlreadyConnected { addr: String },

    #[error("Link is not connected")]
    NotConnected,

    #[error("Unknown command '{name}'")]
    UnknownCommand { name: String },

    #[error("Configuration error in {context}: {details}")]
    Config { context: String, details: String },

    #[error("Configuration file error: {path}")]
    ConfigFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl LinkError {
    /// Returns whether this error is potentially recoverable through retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            LinkError::Bind { .. } => true,
            LinkError::Send { .. } => true,
            LinkError::Receive { .. } => true,
            LinkError::NotConnected => true,
            LinkError::AlreadyConnected { .. } => false,
            LinkError::UnknownCommand { .. } => false,
            LinkError::Config { .. } => false,
            LinkError::ConfigFile { .. } => false,
        }
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            LinkError::Bind { .. } => vec![
                "Check that no other ground station is bound to the port",
                "Verify the local host address belongs to this machine",
                "Pick a different local port",
            ],
            LinkError::Send { .. } => vec![
                "Verify the vehicle or simulator is reachable",
                "Check the remote port in the connection settings",
            ],
            LinkError::Receive { .. } => vec![
                "Transient receive errors are retried automatically",
                "Check the network interface if errors persist",
            ],
            LinkError::AlreadyConnected { .. } => {
                vec!["Disconnect first or use reconnect with the new address"]
            }
            LinkError::NotConnected => vec![
                "Connect the link before sending commands",
                "Wait for the connected status event",
            ],
            LinkError::UnknownCommand { .. } => vec![
                "Use one of: arm, disarm, takeoff, land, rtl, hold, set_mode",
                "Check command name spelling",
            ],
            LinkError::Config { .. } => vec![
                "Check the YAML syntax of the connection settings",
                "Remove unknown fields or fix field types",
            ],
            LinkError::ConfigFile { .. } => {
                vec!["Check the settings file exists and is readable", "Check file permissions"]
            }
        }
    }

    /// Helper constructor for bind failures.
    pub fn bind_failed(addr: impl Into<String>, source: std::io::Error) -> Self {
        LinkError::Bind { addr: addr.into(), source }
    }

    /// Helper constructor for send failures.
    pub fn send_failed(addr: SocketAddr, source: std::io::Error) -> Self {
        LinkError::Send { addr, source }
    }

    /// Helper constructor for receive failures.
    pub fn receive_failed(addr: impl Into<String>, source: std::io::Error) -> Self {
        LinkError::Receive { addr: addr.into(), source }
    }

    /// Helper constructor for unknown command names.
    pub fn unknown_command(name: impl Into<String>) -> Self {
        LinkError::UnknownCommand { name: name.into() }
    }

    /// Helper constructor for configuration errors.
    pub fn config(context: impl Into<String>, details: impl Into<String>) -> Self {
        LinkError::Config { context: context.into(), details: details.into() }
    }
}

impl From<serde_yaml_ng::Error> for LinkError {
    fn from(err: serde_yaml_ng::Error) -> Self {
        LinkError::Config { context: "YAML deserialization".to_string(), details: err.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn error_messages_carry_their_context(
                name in "\\w+",
                addr in "[a-z0-9.]{1,20}:[0-9]{1,5}",
                details in ".*"
            ) {
                let unknown = LinkError::unknown_command(name.clone());
                prop_assert!(unknown.to_string().contains(&name));

                let bind = LinkError::bind_failed(addr.clone(), std::io::Error::other("in use"));
                prop_assert!(bind.to_string().contains(&addr));

                let config = LinkError::config("settings", details.clone());
                prop_assert!(config.to_string().contains(&details));
            }

            #[test]
            fn bind_errors_chain_to_io_source(reason in ".*") {
                let bind = LinkError::bind_failed("127.0.0.1:14550", std::io::Error::other(reason.clone()));
                let source = std::error::Error::source(&bind);
                prop_assert!(source.is_some());
                prop_assert_eq!(source.map(|s| s.to_string()), Some(reason));
            }
        }
    }

    #[test]
    fn error_traits_validation() {
        fn assert_send_sync_static<T: Send + Sync + 'static>() {}
        assert_send_sync_static::<LinkError>();

        let error = LinkError::NotConnected;
        let _: &dyn std::error::Error = &error;
    }

    #[test]
    fn retry_classification() {
        assert!(LinkError::NotConnected.is_retryable());
        assert!(
            LinkError::bind_failed("0.0.0.0:14550", std::io::Error::other("busy")).is_retryable()
        );
        assert!(!LinkError::unknown_command("flip").is_retryable());
        assert!(!LinkError::config("settings", "bad").is_retryable());

        for error in [LinkError::NotConnected, LinkError::unknown_command("flip")] {
            let suggestions = error.recovery_suggestions();
            assert!(!suggestions.is_empty());
            assert!(suggestions.iter().all(|s| s.len() > 5));
        }
    }

    #[test]
    fn socket_errors_are_transport_errors() {
        let addr: SocketAddr = "127.0.0.1:14580".parse().unwrap();
        let send = LinkError::send_failed(addr, std::io::Error::other("unreachable"));
        let receive = LinkError::receive_failed("0.0.0.0:14550", std::io::Error::other("reset"));
        for error in [send, receive] {
            assert!(error.is_retryable());
            assert!(!matches!(error, LinkError::Config { .. } | LinkError::ConfigFile { .. }));
        }
    }

    #[test]
    fn yaml_errors_become_config_errors() {
        let yaml_err = serde_yaml_ng::from_str::<u32>("not: [a number").unwrap_err();
        let error: LinkError = yaml_err.into();
        assert!(matches!(error, LinkError::Config { .. }));
    }
}
