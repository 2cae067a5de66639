//! Resolution error taxonomy.

use thiserror::Error;
use wire_cache::CacheError;
use wire_core::StateError;

/// Result type for resolution operations.
pub type ResolveResult<T> = Result<T, ResolveError>;

/// Errors raised while resolving, constructing or reconstructing components.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Tree generation failed. Fatal for the current resolution attempt.
    #[error("structure build failed: {message}")]
    StructureBuild {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// The fragment carries no usable component reference.
    #[error("component not found: {message}")]
    ComponentNotFound {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// Reconstruction could not locate the named or aliased fragment.
    #[error("fragment \"{0}\" could not be found")]
    FragmentNotFound(String),

    /// No strategy complies, or an accessor cannot be instantiated.
    #[error("resolver not found: {0}")]
    ResolverNotFound(String),

    /// Reading or writing the long-lived resolver cache failed.
    #[error("resolver cache lookup failed: {0}")]
    CacheLookup(#[from] CacheError),

    /// Lifecycle misuse.
    #[error(transparent)]
    State(#[from] StateError),
}

impl ResolveError {
    /// Structure build failure without an underlying cause.
    pub fn structure_build(message: impl Into<String>) -> Self {
        Self::StructureBuild {
            message: message.into(),
            source: None,
        }
    }

    /// Component lookup failure without an underlying cause.
    pub fn component_not_found(message: impl Into<String>) -> Self {
        Self::ComponentNotFound {
            message: message.into(),
            source: None,
        }
    }

    /// HTTP-equivalent status for the transport layer.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::FragmentNotFound(_) => 404,
            Self::ResolverNotFound(_) => 400,
            _ => 500,
        }
    }

    /// Whether the transport should answer "not found".
    pub fn is_not_found(&self) -> bool {
        self.status_code() == 404
    }

    /// Whether the transport should answer "bad request".
    pub fn is_bad_request(&self) -> bool {
        self.status_code() == 400
    }
}
