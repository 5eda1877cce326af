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

//! # ARCTL Control
//!
//! The host-facing side of the adaptive controller. A [`Controller`] owns
//! one generation lineage, reads time from a pluggable
//! [`Clock`](arctl_core::Clock) and hands the sampler a [`ControlStatus`]
//! every tick. Settings are loaded from TOML through [`settings`].

#![warn(missing_docs)]

pub mod controller;
pub mod injection;
pub mod settings;

pub use controller::{ControlStatus, Controller};
pub use injection::inject_context;
