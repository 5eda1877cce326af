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

//! # ARCTL Core
//!
//! A deterministic feedback controller for autoregressive text generation.
//! Each tick it consumes quality signals (entropy, divergence, repetition)
//! and the wall-clock time, and produces a sampling temperature that steers
//! generation away from degenerate repetition loops.
//!
//! The heart of the crate is [`kernel::step`], a pure transition function
//! over an immutable [`SystemState`]. A caller owns one state per generation
//! lineage and replaces it with the kernel's output on every tick; the
//! [`ControllerConfig`] is read-only and may be shared freely.

#![warn(missing_docs)]

pub mod chronos;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod interfaces;
pub mod kernel;
pub mod persistence;
pub mod state;

pub use config::{ControllerConfig, ModeTemperatures, PolicyConfig, TimeConfig};
pub use diagnostics::{diagnose, Diagnostics};
pub use error::{ArctlError, Result};
pub use interfaces::{Clock, ManualClock, MetricExtractor, SystemClock};
pub use kernel::step;
pub use state::{OperationalMode, RawMetrics, SamplingConfig, SystemState, TimeState};
