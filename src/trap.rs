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

//! Traps for errors that cannot be returned to the caller.
//!
//! Logging calls never fail from the application's point of view. Errors raised while
//! delivering records, while reading configuration in best-effort mode, or while reading a
//! JSON-lines file are handed to a [`Trap`] instead.

use std::fmt;
use std::io;
use std::io::Write;
use std::sync::Arc;
use std::sync::Mutex;

use crate::Error;
use crate::ErrorKind;

/// A trap for errors raised off the caller's path.
pub trait Trap: fmt::Debug + Send + Sync + 'static {
    /// Handle an error.
    fn trap(&self, err: &Error);
}

impl<T: Trap> From<T> for Box<dyn Trap> {
    fn from(value: T) -> Self {
        Box::new(value)
    }
}

/// A default trap that sends errors to standard error if possible.
///
/// If standard error is not available, it does nothing.
#[derive(Debug, Default)]
#[non_exhaustive]
pub struct DefaultTrap {}

impl Trap for DefaultTrap {
    fn trap(&self, err: &Error) {
        let _ = writeln!(io::stderr(), "{err}");
    }
}

/// A trap that keeps a summary of every trapped error in memory.
///
/// Cloning the trap shares the underlying storage, so a clone can be handed to a facility
/// while the original is kept for assertions.
#[derive(Debug, Default, Clone)]
pub struct CollectingTrap {
    errors: Arc<Mutex<Vec<(ErrorKind, String)>>>,
}

impl CollectingTrap {
    /// Return the kind and the rendered message of every trapped error, in order.
    pub fn errors(&self) -> Vec<(ErrorKind, String)> {
        self.errors.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Return the number of trapped errors of the given kind.
    pub fn count(&self, kind: ErrorKind) -> usize {
        self.errors
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|(k, _)| *k == kind)
            .count()
    }
}

impl Trap for CollectingTrap {
    fn trap(&self, err: &Error) {
        self.errors
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((err.kind(), err.to_string()));
    }
}
