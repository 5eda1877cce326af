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

//! # ARCTL Telemetry
//!
//! Logging bootstrap and per-step telemetry for the adaptive controller.
//! Records can be folded inline with a [`TelemetryCollector`] or shipped to
//! a background [`TelemetrySink`] so the control path never blocks.

#![warn(missing_docs)]

pub mod collector;
pub mod logging;
pub mod sink;
pub mod window;

pub use collector::{StepRecord, TelemetryCollector, TelemetryReport};
pub use sink::{SinkConfig, TelemetrySink};
pub use window::RollingWindow;
