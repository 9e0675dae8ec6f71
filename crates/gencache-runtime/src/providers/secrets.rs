//! Secure credential handling for text-generation providers.
//!
//! Credentials are wrapped as soon as they are read so they can never show
//! up in `Debug` or `Display` output, log lines or error messages.
//!
//! ## Usage
//!
//! ```ignore
//! use crate::providers::secrets::ApiCredential;
//!
//! // Absent or blank means "not configured"
//! let cred = ApiCredential::from_lookup(|k| std::env::var(k).ok(), "GOOGLE_API_KEY", "Google API key");
//!
//! // Use in a request (explicit exposure)
//! request.query(&[("key", cred.expose())]);
//! ```

use secrecy::{ExposeSecret, SecretString};
use std::fmt;

/// Where a credential was loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    /// Loaded from an environment variable or an environment-style lookup
    Environment,
    /// Provided programmatically
    Programmatic,
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialSource::Environment => write!(f, "environment"),
            CredentialSource::Programmatic => write!(f, "programmatic"),
        }
    }
}

/// A securely-stored API credential.
///
/// This wrapper provides:
/// - Safe Debug implementation that shows `[REDACTED]`
/// - Memory zeroing on drop via `secrecy` crate
/// - Explicit exposure via `.expose()` method
/// - Source tracking for debugging
pub struct ApiCredential {
    value: SecretString,
    source: CredentialSource,
    name: &'static str,
}

impl ApiCredential {
    /// Create a new credential from a string value.
    pub fn new(value: impl Into<String>, source: CredentialSource, name: &'static str) -> Self {
        Self {
            value: SecretString::from(value.into()),
            source,
            name,
        }
    }

    /// Load a credential through an environment-style lookup function.
    ///
    /// Returns `None` when the variable is unset or blank: a missing key is
    /// a configuration state, not an error.
    pub fn from_lookup<F>(lookup: F, env_var: &str, name: &'static str) -> Option<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        lookup(env_var)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(|v| Self::new(v, CredentialSource::Environment, name))
    }

    /// Expose the credential value for use in API calls.
    ///
    /// # Security
    ///
    /// Only call this at the point where the credential is actually needed
    /// (e.g., setting an HTTP header). Never store the exposed value.
    pub fn expose(&self) -> &str {
        self.value.expose_secret()
    }

    /// Get the source of this credential.
    pub fn source(&self) -> CredentialSource {
        self.source
    }
}

impl fmt::Debug for ApiCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiCredential")
            .field("value", &"[REDACTED]")
            .field("source", &self.source)
            .field("name", &self.name)
            .finish()
    }
}

impl fmt::Display for ApiCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} from {} [REDACTED]", self.name, self.source)
    }
}
