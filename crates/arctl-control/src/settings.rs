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

//! Loading a [`ControllerConfig`] from TOML.
//!
//! Missing keys take their defaults, so a settings file only needs the
//! values it overrides:
//!
//! ```toml
//! [time]
//! deadlock_timeout = 8.0
//!
//! [policy]
//! max_energy = 12
//!
//! [policy.temperatures]
//! emergency = 1.4
//! ```

use arctl_core::{ArctlError, ControllerConfig, Result};
use std::fs;
use std::path::Path;

/// Parses and validates a settings document.
pub fn from_toml_str(source: &str) -> Result<ControllerConfig> {
    let config: ControllerConfig =
        toml::from_str(source).map_err(|e| ArctlError::Serialization(e.to_string()))?;
    config.validated()
}

/// Reads, parses and validates a settings file.
pub fn load(path: impl AsRef<Path>) -> Result<ControllerConfig> {
    let path = path.as_ref();
    let source = fs::read_to_string(path)?;
    let config = from_toml_str(&source)?;
    log::info!("Controller: settings loaded from {}.", path.display());
    Ok(config)
}

/// Renders a configuration as TOML.
pub fn to_toml_string(config: &ControllerConfig) -> Result<String> {
    toml::to_string(config).map_err(|e| ArctlError::Serialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_is_default() {
        assert_eq!(from_toml_str("").unwrap(), ControllerConfig::default());
    }

    #[test]
    fn test_partial_override() {
        let cfg = from_toml_str(
            "[time]\ndeadlock_timeout = 8.0\n\n[policy]\nmax_energy = 12\n\n[policy.temperatures]\nemergency = 1.4\n",
        )
        .unwrap();
        assert_eq!(cfg.time.deadlock_timeout, 8.0);
        assert_eq!(cfg.time.min_step_interval, 0.01);
        assert_eq!(cfg.policy.max_energy, 12);
        assert_eq!(cfg.policy.temperatures.emergency, 1.4);
        assert_eq!(cfg.policy.temperatures.standard, 0.7);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = from_toml_str("[policy]\nsmoothing_alpha = 2.0\n").unwrap_err();
        assert!(matches!(err, ArctlError::ConfigViolation { .. }));
    }

    #[test]
    fn test_malformed_document() {
        let err = from_toml_str("[time\n").unwrap_err();
        assert!(matches!(err, ArctlError::Serialization(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = load("/definitely/not/here/arctl.toml").unwrap_err();
        assert!(matches!(err, ArctlError::Io(_)));
    }

    #[test]
    fn test_toml_round_trip() {
        let cfg = ControllerConfig::default();
        let text = to_toml_string(&cfg).unwrap();
        assert_eq!(from_toml_str(&text).unwrap(), cfg);
    }
}
