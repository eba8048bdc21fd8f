use crate::walk::WalkError;
use thiserror::Error;

/// Errors surfaced by the glue layer.
///
/// None of these are retried internally; each one reaches the immediate
/// caller. `AuthenticationFailure` is kept apart from `TransformFailure` so
/// callers can discard any plaintext produced by a rejected request.
#[derive(Error, Debug)]
pub enum GlueError {
    /// Primitive state or buffer allocation failed
    #[error("Allocation of {size} bytes for {what} failed")]
    AllocationFailure { what: &'static str, size: usize },

    /// Key material errors
    #[error("Key rejected: {0}")]
    KeyRejected(String),

    #[error("IV setup failed: {0}")]
    IvSetupFailure(String),

    /// Block/stream processing errors
    #[error("Transform failed: {0}")]
    TransformFailure(String),

    #[error("Invalid request length {len}: {reason}")]
    InvalidLength { len: usize, reason: &'static str },

    /// Integrity errors
    #[error("Authentication failed: tag mismatch")]
    AuthenticationFailure,

    /// The segment walk failed; the fault belongs to the transport
    #[error("Transport fault: {0}")]
    TransportFault(#[from] WalkError),

    /// Configuration errors
    #[error("Invalid configuration: {0}")]
    ConfigurationError(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Self-test and registration errors
    #[error("Known-answer mismatch: {0}")]
    KatMismatch(String),

    #[error("{driver} is already registered")]
    RegistrationConflict { driver: String },

    #[error("Self-test for {driver} failed: {source}")]
    SelfTestFailure {
        driver: String,
        #[source]
        source: Box<GlueError>,
    },

    #[error("No loaded implementation of {0}")]
    NotAvailable(String),
}

/// Result type alias for glue operations
pub type Result<T> = std::result::Result<T, GlueError>;

const ENOENT: i32 = 2;
const ENOMEM: i32 = 12;
const EFAULT: i32 = 14;
const EEXIST: i32 = 17;
const EINVAL: i32 = 22;
const EBADMSG: i32 = 74;
const ENOKEY: i32 = 126;

impl GlueError {
    /// Negative errno for module-lifecycle callers that speak `0 | -E...`.
    pub fn errno(&self) -> i32 {
        match self {
            GlueError::AllocationFailure { .. } => -ENOMEM,
            GlueError::KeyRejected(_) => -ENOKEY,
            GlueError::AuthenticationFailure => -EBADMSG,
            GlueError::TransportFault(_) => -EFAULT,
            GlueError::RegistrationConflict { .. } => -EEXIST,
            GlueError::NotAvailable(_) => -ENOENT,
            GlueError::SelfTestFailure { source, .. } => source.errno(),
            GlueError::IvSetupFailure(_)
            | GlueError::TransformFailure(_)
            | GlueError::InvalidLength { .. }
            | GlueError::ConfigurationError(_)
            | GlueError::Serialization(_)
            | GlueError::KatMismatch(_) => -EINVAL,
        }
    }

    /// Name of the driver a registration error belongs to, if any.
    pub fn driver(&self) -> Option<&str> {
        match self {
            GlueError::RegistrationConflict { driver } | GlueError::SelfTestFailure { driver, .. } => {
                Some(driver.as_str())
            }
            _ => None,
        }
    }

    pub(crate) fn kat(what: impl Into<String>) -> Self {
        GlueError::KatMismatch(what.into())
    }
}
