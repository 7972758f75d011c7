//! Client-side error taxonomy.
//!
//! Authentication failures are deliberately opaque when displayed; the
//! variant is only visible through `Debug` for logging.

use std::fmt;

use crate::validation::ValidationError;

/// Generic message shown for every authentication failure.
pub const AUTH_FAILED_MESSAGE: &str = "Falha na autenticação.";

/// Failure of a single remote round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayError {
    /// HTTP status when the backend answered at all.
    pub status: Option<u16>,
    /// Machine-readable code from the error envelope.
    pub code: Option<String>,
    /// Human-readable cause.
    pub cause: String,
}

impl GatewayError {
    pub fn transport(cause: impl Into<String>) -> Self {
        Self {
            status: None,
            code: None,
            cause: cause.into(),
        }
    }

    pub fn status(status: u16, code: Option<String>, cause: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            code,
            cause: cause.into(),
        }
    }
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "gateway error ({}): {}", status, self.cause),
            None => write!(f, "gateway error: {}", self.cause),
        }
    }
}

impl std::error::Error for GatewayError {}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        GatewayError {
            status: err.status().map(|s| s.as_u16()),
            code: None,
            cause: err.to_string(),
        }
    }
}

/// Why the identity provider refused an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    InvalidCredentials,
    EmailTaken,
    WeakPassword,
    Provider(String),
}

impl AuthError {
    /// Classify a gateway failure from an auth endpoint.
    pub fn from_gateway(err: GatewayError) -> Self {
        match (err.status, err.code.as_deref()) {
            (Some(401), _) => AuthError::InvalidCredentials,
            (Some(409), _) => AuthError::EmailTaken,
            (Some(400), Some("VALIDATION_ERROR")) => AuthError::WeakPassword,
            _ => AuthError::Provider(err.cause),
        }
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(AUTH_FAILED_MESSAGE)
    }
}

impl std::error::Error for AuthError {}

/// Failure of a client store command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// No user is signed in.
    AuthRequired,
    /// The signed-in user lacks the capability (client-side check only).
    Forbidden,
    /// Target entity is not in the store.
    NotFound(String),
    /// Target exists but is not in the state the transition requires.
    Precondition(String),
    Validation(ValidationError),
    Gateway(GatewayError),
    /// Device-local storage could not be written.
    Storage(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::AuthRequired => f.write_str("authentication required"),
            StoreError::Forbidden => f.write_str("administrator role required"),
            StoreError::NotFound(what) => write!(f, "{} not found", what),
            StoreError::Precondition(msg) => f.write_str(msg),
            StoreError::Validation(err) => write!(f, "{}", err),
            StoreError::Gateway(err) => write!(f, "{}", err),
            StoreError::Storage(msg) => write!(f, "storage error: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<GatewayError> for StoreError {
    fn from(err: GatewayError) -> Self {
        StoreError::Gateway(err)
    }
}

impl From<ValidationError> for StoreError {
    fn from(err: ValidationError) -> Self {
        StoreError::Validation(err)
    }
}
