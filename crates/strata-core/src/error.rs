//! Error types for strata operations.
//!
//! This module provides a structured error hierarchy with error codes for
//! programmatic handling. Business-level outcomes (a promotion that was
//! declined, a delete of an absent id) are expressed as values on the
//! relevant result types, not as errors; only infrastructure and input
//! failures surface here.

use std::collections::HashMap;
use thiserror::Error;

/// Result type alias for strata operations.
pub type StrataResult<T> = Result<T, StrataError>;

/// Main error type for all strata operations.
#[derive(Error, Debug)]
pub enum StrataError {
    /// Input validation failed.
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        code: ErrorCode,
        details: HashMap<String, String>,
    },

    /// Observation or memory not found where presence was required.
    #[error("Not found: {message}")]
    NotFound {
        message: String,
        code: ErrorCode,
        entity_id: Option<String>,
    },

    /// Backing store operation failed.
    #[error("Store error: {message}")]
    Store {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error codes for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Validation (VAL_xxx)
    ValInvalidInput,
    ValMissingField,
    ValInvalidFilter,

    // Observation (OBS_xxx)
    ObsNotFound,

    // Memory (MEM_xxx)
    MemNotFound,

    // Store (STORE_xxx)
    StoreConnectionFailed,
    StoreOperationFailed,

    // Configuration (CFG_xxx)
    CfgInvalidValue,

    // Internal
    Internal,
}

impl ErrorCode {
    /// Get the string representation of the error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ValInvalidInput => "VAL_001",
            ErrorCode::ValMissingField => "VAL_002",
            ErrorCode::ValInvalidFilter => "VAL_003",
            ErrorCode::ObsNotFound => "OBS_001",
            ErrorCode::MemNotFound => "MEM_001",
            ErrorCode::StoreConnectionFailed => "STORE_001",
            ErrorCode::StoreOperationFailed => "STORE_002",
            ErrorCode::CfgInvalidValue => "CFG_001",
            ErrorCode::Internal => "INT_001",
        }
    }
}

impl StrataError {
    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            code: ErrorCode::ValInvalidInput,
            details: HashMap::new(),
        }
    }

    /// Create a not found error for an observation.
    pub fn observation_not_found(id: impl Into<String>) -> Self {
        let id = id.into();
        Self::NotFound {
            message: format!("Observation with id '{}' not found", id),
            code: ErrorCode::ObsNotFound,
            entity_id: Some(id),
        }
    }

    /// Create a not found error for a long-term memory.
    pub fn memory_not_found(id: impl Into<String>) -> Self {
        let id = id.into();
        Self::NotFound {
            message: format!("Memory with id '{}' not found", id),
            code: ErrorCode::MemNotFound,
            entity_id: Some(id),
        }
    }

    /// Create a store error.
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
            code: ErrorCode::StoreOperationFailed,
            source: None,
        }
    }

    /// Create a store error wrapping an underlying cause.
    pub fn store_with_source(
        message: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::Store {
            message: message.into(),
            code: ErrorCode::StoreOperationFailed,
            source: Some(source),
        }
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Get the error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Validation { code, .. } => *code,
            Self::NotFound { code, .. } => *code,
            Self::Store { code, .. } => *code,
            Self::Configuration(_) => ErrorCode::CfgInvalidValue,
            _ => ErrorCode::Internal,
        }
    }
}
