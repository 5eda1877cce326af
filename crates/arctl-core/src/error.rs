// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Error taxonomy for the controller boundary.
//!
//! The transition kernel itself never fails. Errors only arise when raw
//! metrics or configuration bundles are constructed, or when persisted
//! records are loaded and checked against the active configuration.

use std::fmt;

/// An error raised at the controller's construction or persistence boundary.
#[derive(Debug)]
pub enum ArctlError {
    /// A raw metric was non-finite or outside `[0, 1]`.
    InputRangeViolation {
        /// Name of the offending metric channel.
        field: &'static str,
        /// The rejected value.
        value: f64,
    },
    /// A configuration parameter is out of its documented range.
    ConfigViolation {
        /// Dotted path of the offending parameter (e.g. `time.min_step_interval`).
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
    /// A restored state breaks an invariant under the active configuration.
    InvalidState {
        /// Name of the offending state field.
        field: &'static str,
        /// Which invariant the value breaks.
        reason: String,
    },
    /// A persisted record carries a schema version this build cannot read.
    UnsupportedSchema {
        /// Version found in the record.
        found: u32,
        /// Highest version this build understands.
        supported: u32,
    },
    /// Encoding or decoding of a state or configuration document failed.
    Serialization(String),
    /// Reading a configuration or snapshot file failed.
    Io(std::io::Error),
}

impl fmt::Display for ArctlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArctlError::InputRangeViolation { field, value } => {
                write!(f, "Raw metric '{field}' must be finite and in [0, 1], got {value}")
            }
            ArctlError::ConfigViolation { field, reason } => {
                write!(f, "Invalid configuration for '{field}': {reason}")
            }
            ArctlError::InvalidState { field, reason } => {
                write!(f, "Invalid state field '{field}': {reason}")
            }
            ArctlError::UnsupportedSchema { found, supported } => {
                write!(
                    f,
                    "Persisted state has schema version {found}, this build supports up to {supported}"
                )
            }
            ArctlError::Serialization(msg) => write!(f, "Serialization error: {msg}"),
            ArctlError::Io(err) => write!(f, "I/O error: {err}"),
        }
    }
}

impl std::error::Error for ArctlError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ArctlError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ArctlError {
    fn from(err: std::io::Error) -> Self {
        ArctlError::Io(err)
    }
}

impl From<serde_json::Error> for ArctlError {
    fn from(err: serde_json::Error) -> Self {
        ArctlError::Serialization(err.to_string())
    }
}

/// Convenience alias used across the controller crates.
pub type Result<T> = std::result::Result<T, ArctlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names_the_field() {
        let err = ArctlError::InputRangeViolation {
            field: "repetition",
            value: 1.5,
        };
        let msg = err.to_string();
        assert!(msg.contains("repetition"));
        assert!(msg.contains("1.5"));
    }

    #[test]
    fn test_io_error_exposes_source() {
        use std::error::Error;
        let err = ArctlError::from(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert!(err.source().is_some());
    }
}
