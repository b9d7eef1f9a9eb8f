//! Error handling for wikibeamer conversions
//!
//! This module provides a unified error type and result type for all
//! conversion operations. Unmatched markup is never an error (it passes
//! through literally); the variants here cover the fatal cases only.

use std::fmt;

/// Conversion error type
#[derive(Debug, Clone)]
pub enum ConversionError {
    /// Syntax error - malformed overlay spec, autotemplate line,
    /// usepackage declaration or boolean value
    SyntaxError {
        message: String,
        /// The offending snippet of raw input
        snippet: String,
    },
    /// Cyclic file inclusion
    IncludeLoop {
        /// The file whose inclusion would close the cycle
        filename: String,
        /// The active inclusion stack, outermost first
        stack: Vec<String>,
    },
    /// IO error (for file operations)
    IoError { message: String },
    /// Internal error
    InternalError { message: String },
}

impl fmt::Display for ConversionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversionError::SyntaxError { message, snippet } => {
                write!(f, "syntax error: {}\n\tcode:\n{}", message, snippet)
            }
            ConversionError::IncludeLoop { filename, stack } => {
                write!(
                    f,
                    "Loop detected while trying to include: '{}'.\nStack: {}",
                    filename,
                    stack.join("->")
                )
            }
            ConversionError::IoError { message } => {
                write!(f, "IO error: {}", message)
            }
            ConversionError::InternalError { message } => {
                write!(f, "Internal error: {}", message)
            }
        }
    }
}

impl std::error::Error for ConversionError {}

impl From<std::io::Error> for ConversionError {
    fn from(err: std::io::Error) -> Self {
        ConversionError::IoError {
            message: err.to_string(),
        }
    }
}

/// Result type for conversion operations
pub type ConversionResult<T> = Result<T, ConversionError>;

// Convenience constructors
impl ConversionError {
    pub fn syntax(message: impl Into<String>, snippet: impl Into<String>) -> Self {
        ConversionError::SyntaxError {
            message: message.into(),
            snippet: snippet.into(),
        }
    }

    pub fn include_loop(filename: impl Into<String>, stack: Vec<String>) -> Self {
        ConversionError::IncludeLoop {
            filename: filename.into(),
            stack,
        }
    }

    pub fn io(message: impl Into<String>) -> Self {
        ConversionError::IoError {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ConversionError::InternalError {
            message: message.into(),
        }
    }

    /// Process exit code for the CLI layer.
    pub fn exit_code(&self) -> i32 {
        match self {
            ConversionError::IoError { .. } => -2,
            ConversionError::SyntaxError { .. }
            | ConversionError::IncludeLoop { .. }
            | ConversionError::InternalError { .. } => -3,
        }
    }
}
