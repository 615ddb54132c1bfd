// Copyright 2024 FastLabs Developers
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

use std::fmt;
use std::sync::atomic::AtomicU8;
use std::sync::atomic::Ordering;

/// The lifecycle state of a facility's dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DispatchState {
    /// No worker is consuming the queue, either not started yet or shut down.
    Stopped,
    /// The worker is consuming the queue.
    Running,
    /// Shutdown was requested and the worker is emptying the queue.
    Draining,
}

impl DispatchState {
    pub fn as_str(&self) -> &'static str {
        match self {
            DispatchState::Stopped => "stopped",
            DispatchState::Running => "running",
            DispatchState::Draining => "draining",
        }
    }

    fn from_u8(value: u8) -> DispatchState {
        match value {
            1 => DispatchState::Running,
            2 => DispatchState::Draining,
            _ => DispatchState::Stopped,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            DispatchState::Stopped => 0,
            DispatchState::Running => 1,
            DispatchState::Draining => 2,
        }
    }
}

impl fmt::Display for DispatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A [`DispatchState`] shared between the dispatcher and its worker.
#[derive(Debug)]
pub(crate) struct AtomicState(AtomicU8);

impl AtomicState {
    pub(crate) fn new(state: DispatchState) -> Self {
        Self(AtomicU8::new(state.as_u8()))
    }

    pub(crate) fn load(&self) -> DispatchState {
        DispatchState::from_u8(self.0.load(Ordering::Acquire))
    }

    pub(crate) fn store(&self, state: DispatchState) {
        self.0.store(state.as_u8(), Ordering::Release);
    }
}
