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

//! Versioned persistence of [`SystemState`].
//!
//! Records are wrapped in an envelope carrying `schema_version`. JSON records
//! from older schemas load with defaults for fields added since; records from
//! a newer schema are refused instead of being silently truncated. The
//! compact binary form is not self-describing and only accepts the current
//! version.
//!
//! Schema history:
//! - `1`: no `reset_used`, `time_state` or `context_note`.
//! - `2`: current.

use crate::error::{ArctlError, Result};
use crate::state::SystemState;
use serde::{Deserialize, Serialize};

/// Schema version written by this build.
pub const SCHEMA_VERSION: u32 = 2;
/// Oldest schema version this build can read.
pub const MIN_SCHEMA_VERSION: u32 = 1;

/// A persisted state with its schema tag.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PersistedState {
    /// Schema the record was written with.
    pub schema_version: u32,
    /// The stored snapshot.
    pub state: SystemState,
}

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    schema_version: u32,
    state: &'a SystemState,
}

/// Serializes `state` to a tagged JSON record.
pub fn to_json(state: &SystemState) -> Result<String> {
    Ok(serde_json::to_string(&EnvelopeRef {
        schema_version: SCHEMA_VERSION,
        state,
    })?)
}

/// Loads a JSON record written by this or an older schema.
pub fn from_json(json: &str) -> Result<SystemState> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    let version = value
        .get("schema_version")
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| ArctlError::Serialization("record has no schema_version".into()))?;
    let version = u32::try_from(version).unwrap_or(u32::MAX);
    check_version(version, MIN_SCHEMA_VERSION)?;

    let record: PersistedState = serde_json::from_value(value)?;
    if record.schema_version < SCHEMA_VERSION {
        log::info!(
            "Persistence: upgraded state record from schema {} to {}.",
            record.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(record.state)
}

/// Serializes `state` to the compact binary form.
pub fn to_bytes(state: &SystemState) -> Result<Vec<u8>> {
    bincode::serde::encode_to_vec(
        EnvelopeRef {
            schema_version: SCHEMA_VERSION,
            state,
        },
        bincode::config::standard(),
    )
    .map_err(|e| ArctlError::Serialization(e.to_string()))
}

/// Loads a binary record. Only the current schema is accepted.
pub fn from_bytes(bytes: &[u8]) -> Result<SystemState> {
    let config = bincode::config::standard();
    let (version, _): (u32, usize) = bincode::serde::decode_from_slice(bytes, config)
        .map_err(|e| ArctlError::Serialization(e.to_string()))?;
    check_version(version, SCHEMA_VERSION)?;

    let (record, _): (PersistedState, usize) = bincode::serde::decode_from_slice(bytes, config)
        .map_err(|e| ArctlError::Serialization(e.to_string()))?;
    Ok(record.state)
}

fn check_version(found: u32, oldest: u32) -> Result<()> {
    if (oldest..=SCHEMA_VERSION).contains(&found) {
        Ok(())
    } else {
        Err(ArctlError::UnsupportedSchema {
            found,
            supported: SCHEMA_VERSION,
        })
    }
}
