//! Error types for feature inventory and mutation operations.
//!
//! Errors are categorized so callers can tell transient remoting failures
//! (worth retrying) from failures that must abort a host, and so the audit
//! write can be treated as advisory.

use std::path::PathBuf;
use thiserror::Error;

/// Categories of backend errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Host could not be reached (transient, retryable)
    Network,
    /// Inventory query ran but failed
    Query,
    /// Install or removal failed on the host
    Mutation,
    /// Manifest file could not be read or written
    Manifest,
    /// Pre-change audit could not be persisted
    Audit,
    /// Other/unknown errors
    Other,
}

impl ErrorCategory {
    /// Whether this error category is typically transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network)
    }

    /// Get a user-friendly description of this error category.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Network => "Host unreachable",
            Self::Query => "Inventory query failed",
            Self::Mutation => "Feature change failed",
            Self::Manifest => "Manifest file error",
            Self::Audit => "Audit snapshot not written",
            Self::Other => "Unexpected error",
        }
    }

    /// Get actionable advice for resolving this error category.
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Network => "Check that WinRM is enabled and the host name resolves",
            Self::Query => "Verify the ServerManager module is available on the host",
            Self::Mutation => "Inspect the host's feature logs; a reboot may be pending",
            Self::Manifest => "Check the manifest path and that the file is a rolesync export",
            Self::Audit => "No action needed - reconciliation continued without the audit",
            Self::Other => "Check the error details for more information",
        }
    }
}

/// Errors that can occur while talking to hosts or manifest files.
#[derive(Debug, Error)]
pub enum Error {
    /// Host could not be reached over the remoting channel
    #[error("host unreachable: {host}: {message}")]
    UnreachableHost {
        /// Host that could not be contacted
        host: String,
        /// Transport error text
        message: String,
    },

    /// Inventory query failed on a reachable host
    #[error("inventory query failed on {host}: {message}")]
    QueryFailed {
        /// Host that was queried
        host: String,
        /// Error text from the query
        message: String,
    },

    /// Installing a feature failed
    #[error("install of {name} failed on {host}: {cause}")]
    InstallFailed {
        /// Host being changed
        host: String,
        /// Feature name
        name: String,
        /// Underlying cause
        cause: String,
    },

    /// Removing a feature failed
    #[error("removal of {name} failed on {host}: {cause}")]
    RemoveFailed {
        /// Host being changed
        host: String,
        /// Feature name
        name: String,
        /// Underlying cause
        cause: String,
    },

    /// Manifest file could not be loaded
    #[error("failed to load manifest {}: {message}", .path.display())]
    ManifestLoadFailed {
        /// Manifest path
        path: PathBuf,
        /// What went wrong
        message: String,
    },

    /// Manifest file could not be saved
    #[error("failed to save manifest {}: {message}", .path.display())]
    ManifestSaveFailed {
        /// Manifest path
        path: PathBuf,
        /// What went wrong
        message: String,
    },

    /// Pre-change audit snapshot could not be written on the host
    #[error("audit snapshot not written on {host}: {message}")]
    AuditWriteFailed {
        /// Host whose audit failed
        host: String,
        /// What went wrong
        message: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Operation a shell invocation was performing, used to classify its failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation<'a> {
    /// Inventory query
    Query,
    /// Install of the named feature
    Install(&'a str),
    /// Removal of the named feature
    Remove(&'a str),
    /// Audit file write
    Audit,
}

impl Error {
    /// Get the error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::UnreachableHost { .. } => ErrorCategory::Network,
            Error::QueryFailed { .. } => ErrorCategory::Query,
            Error::InstallFailed { .. } | Error::RemoveFailed { .. } => ErrorCategory::Mutation,
            Error::ManifestLoadFailed { .. } | Error::ManifestSaveFailed { .. } => {
                ErrorCategory::Manifest
            }
            Error::AuditWriteFailed { .. } => ErrorCategory::Audit,
            _ => ErrorCategory::Other,
        }
    }

    /// Whether this error is typically transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        self.category().is_retryable()
    }

    /// Create an error from the stderr of a failed PowerShell invocation.
    ///
    /// Remoting failures become [`Error::UnreachableHost`] whatever the
    /// operation was; everything else is attributed to the operation.
    /// Only WinRM/PSRemoting transport text counts as a remoting failure, so
    /// a cmdlet that times out on a reachable host stays a mutation error.
    pub fn from_shell_output(stderr: &str, host: &str, op: Operation<'_>) -> Self {
        let stderr_lower = stderr.to_lowercase();
        let message = stderr.trim().to_string();

        if stderr_lower.contains("winrm cannot complete")
            || stderr_lower.contains("connecting to remote server")
            || stderr_lower.contains("cannot find the computer")
            || stderr_lower.contains("could not be resolved")
            || stderr_lower.contains("the network path was not found")
            || stderr_lower.contains("rpc server is unavailable")
            || stderr_lower.contains("psremotingtransportexception")
        {
            return Error::UnreachableHost {
                host: host.to_string(),
                message,
            };
        }

        match op {
            Operation::Query => Error::QueryFailed {
                host: host.to_string(),
                message,
            },
            Operation::Install(name) => Error::InstallFailed {
                host: host.to_string(),
                name: name.to_string(),
                cause: message,
            },
            Operation::Remove(name) => Error::RemoveFailed {
                host: host.to_string(),
                name: name.to_string(),
                cause: message,
            },
            Operation::Audit => Error::AuditWriteFailed {
                host: host.to_string(),
                message,
            },
        }
    }
}

/// Result type for featurekit operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_category_retryable() {
        assert!(ErrorCategory::Network.is_retryable());
        assert!(!ErrorCategory::Query.is_retryable());
        assert!(!ErrorCategory::Mutation.is_retryable());
    }

    #[test]
    fn test_from_shell_output_unreachable() {
        let err = Error::from_shell_output(
            "[srv01] Connecting to remote server srv01 failed with the following error message",
            "srv01",
            Operation::Install("Web-Server"),
        );
        assert_eq!(err.category(), ErrorCategory::Network);
        assert!(err.is_retryable());
    }

    #[test]
    fn test_from_shell_output_install() {
        let err = Error::from_shell_output(
            "Install-WindowsFeature : The request to add or remove features failed.",
            "srv01",
            Operation::Install("Web-Server"),
        );
        match err {
            Error::InstallFailed { host, name, .. } => {
                assert_eq!(host, "srv01");
                assert_eq!(name, "Web-Server");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_cmdlet_timeout_is_not_unreachable() {
        let err = Error::from_shell_output(
            "Install-WindowsFeature : The operation timed out waiting for the servicing stack.",
            "srv01",
            Operation::Install("Web-Server"),
        );
        assert!(matches!(err, Error::InstallFailed { .. }));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_winrm_timeout_is_unreachable() {
        let err = Error::from_shell_output(
            "[srv01] Processing data from remote server srv01 failed: WinRM cannot complete \
             the operation. The operation timed out. + FullyQualifiedErrorId : \
             PSRemotingTransportException",
            "srv01",
            Operation::Install("Web-Server"),
        );
        assert_eq!(err.category(), ErrorCategory::Network);
    }

    #[test]
    fn test_from_shell_output_query() {
        let err = Error::from_shell_output(
            "The term 'Get-WindowsFeature' is not recognized",
            "srv01",
            Operation::Query,
        );
        assert_eq!(err.category(), ErrorCategory::Query);
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_from_shell_output_audit() {
        let err = Error::from_shell_output("Access to the path is denied", "srv01", Operation::Audit);
        assert_eq!(err.category(), ErrorCategory::Audit);
    }
}
