//! Error taxonomy for probe, reconcile and retry operations
//!
//! Every failure the loops can see is one of these variants. The retry
//! controller uses [`MendError::is_retryable`] to decide whether another
//! attempt is allowed, and `main` turns the final error into an exit code.

use thiserror::Error;

/// Result alias used across the crate
pub type MendResult<T> = Result<T, MendError>;

/// Exit code for success or nothing to do
pub const EXIT_OK: u8 = 0;
/// Exit code for exhausted retries, unavailable probes and failed repairs
pub const EXIT_FAILED: u8 = 1;
/// Exit code for invalid arguments, configuration or credentials
pub const EXIT_INVALID: u8 = 2;

/// Failures raised by probers, actuators and the retry controller
#[derive(Debug, Error)]
pub enum MendError {
    /// The platform query could not be completed
    #[error("probe unavailable: {0}")]
    ProbeUnavailable(String),

    /// The repair credential is malformed or was rejected
    #[error("credential invalid: {0}")]
    CredentialInvalid(String),

    /// A corrective action was attempted and failed
    #[error("apply failed: {0}")]
    ApplyFailed(String),

    /// Settle mode observed a state that is still not healthy
    #[error("not settled: observed {observed}")]
    NotSettled { observed: String },

    /// A setting or flag is structurally invalid
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Every attempt allowed by the retry budget failed
    #[error("gave up after {attempts} attempt(s): {last}")]
    RetryExhausted { attempts: u32, last: Box<MendError> },
}

impl MendError {
    /// Whether another attempt may fix this failure
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            MendError::ProbeUnavailable(_) | MendError::ApplyFailed(_) | MendError::NotSettled { .. }
        )
    }

    /// Failures that must stop a polling loop as well as a single run
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            MendError::CredentialInvalid(_) | MendError::InvalidArgument(_)
        )
    }

    /// Process exit code reported for this failure
    pub fn exit_code(&self) -> u8 {
        if self.is_fatal() {
            EXIT_INVALID
        } else {
            EXIT_FAILED
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(MendError::ProbeUnavailable("no dc".into()).is_retryable());
        assert!(MendError::ApplyFailed("reg".into()).is_retryable());
        assert!(MendError::NotSettled {
            observed: "away".into()
        }
        .is_retryable());
        assert!(!MendError::CredentialInvalid("empty".into()).is_retryable());
        assert!(!MendError::InvalidArgument("retries".into()).is_retryable());
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(MendError::CredentialInvalid("x".into()).exit_code(), EXIT_INVALID);
        assert_eq!(MendError::InvalidArgument("x".into()).exit_code(), EXIT_INVALID);
        assert_eq!(MendError::ProbeUnavailable("x".into()).exit_code(), EXIT_FAILED);

        let exhausted = MendError::RetryExhausted {
            attempts: 3,
            last: Box::new(MendError::ProbeUnavailable("x".into())),
        };
        assert!(!exhausted.is_retryable());
        assert_eq!(exhausted.exit_code(), EXIT_FAILED);
        assert!(exhausted.to_string().contains("3 attempt(s)"));
    }
}
