// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use std::fmt;

/// Error type shared by every segkit crate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SegError {
    InvalidInput(String),
    NumericalIssue(String),
    NotSupported(String),
}

impl SegError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn numerical_issue(msg: impl Into<String>) -> Self {
        Self::NumericalIssue(msg.into())
    }

    pub fn not_supported(msg: impl Into<String>) -> Self {
        Self::NotSupported(msg.into())
    }

    /// Message without the error-class prefix.
    pub fn message(&self) -> &str {
        match self {
            Self::InvalidInput(msg) | Self::NumericalIssue(msg) | Self::NotSupported(msg) => msg,
        }
    }

    /// Prefixes the message with `context`, keeping the error class.
    pub fn with_context(self, context: impl fmt::Display) -> Self {
        match self {
            Self::InvalidInput(msg) => Self::InvalidInput(format!("{context}: {msg}")),
            Self::NumericalIssue(msg) => Self::NumericalIssue(format!("{context}: {msg}")),
            Self::NotSupported(msg) => Self::NotSupported(format!("{context}: {msg}")),
        }
    }

    /// Stable machine-readable code for this error class.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::NumericalIssue(_) => "numerical_issue",
            Self::NotSupported(_) => "not_supported",
        }
    }
}

impl fmt::Display for SegError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
            Self::NumericalIssue(msg) => write!(f, "numerical issue: {msg}"),
            Self::NotSupported(msg) => write!(f, "not supported: {msg}"),
        }
    }
}

impl std::error::Error for SegError {}
