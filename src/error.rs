/// Unified error types for the OID directory toolkit
use thiserror::Error;

/// Main error type for codec, profile and cache operations
#[derive(Error, Debug)]
pub enum DirError {
    /// Malformed NumberForm, DotNotation, NameAndNumberForm or ASN.1 text
    #[error("Notation format error: {0}")]
    NotationFormat(String),

    /// Missing or unrecognized root arc label
    #[error("Root classification error: {0}")]
    RootClassification(String),

    /// X.660 arc constraints (second-arc range, long-arc placement)
    #[error("Illegal arc: {0}")]
    IllegalArc(String),

    /// Encapsulation, brace or keyword violations in a subtree specification
    #[error("Subtree specification format error: {0}")]
    SubtreeSpecFormat(String),

    /// Generalized time parse failures
    #[error("Time format error: {0}")]
    TimeFormat(String),

    /// DN suffix or dimension model mismatches
    #[error("Directory profile error: {0}")]
    DirectoryProfile(String),

    /// Operation attempted on an uninitialized or frozen cache
    #[error("Cache state error: {0}")]
    CacheState(String),

    /// Snapshot encode/decode errors
    #[error("Snapshot error: {0}")]
    Snapshot(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Field table lookups for attribute names that are not registered
    #[error("Unknown field: {0}")]
    UnknownField(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DirError {
    /// Short, stable label for metrics and structured logs
    pub fn kind(&self) -> &'static str {
        match self {
            DirError::NotationFormat(_) => "notation_format",
            DirError::RootClassification(_) => "root_classification",
            DirError::IllegalArc(_) => "illegal_arc",
            DirError::SubtreeSpecFormat(_) => "subtree_spec_format",
            DirError::TimeFormat(_) => "time_format",
            DirError::DirectoryProfile(_) => "directory_profile",
            DirError::CacheState(_) => "cache_state",
            DirError::Snapshot(_) => "snapshot",
            DirError::Config(_) => "config",
            DirError::UnknownField(_) => "unknown_field",
            DirError::Io(_) => "io",
        }
    }
}

impl From<serde_cbor::Error> for DirError {
    fn from(e: serde_cbor::Error) -> Self {
        DirError::Snapshot(e.to_string())
    }
}

/// Result type alias for directory operations
pub type DirResult<T> = Result<T, DirError>;
