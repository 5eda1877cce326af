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

//! Prompt-side use of the synchronization note.

use arctl_core::{SystemState, TimeState};
use std::borrow::Cow;

/// Prefixes `prompt` with the state's context note after a LAG or GAP.
///
/// On SYNC the prompt is returned untouched.
pub fn inject_context<'a>(state: &SystemState, prompt: &'a str) -> Cow<'a, str> {
    if state.time_state == TimeState::Sync || state.context_note.is_empty() {
        return Cow::Borrowed(prompt);
    }
    Cow::Owned(format!("{}\n\nUser query: {}", state.context_note, prompt))
}
