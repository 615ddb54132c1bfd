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

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use crate::Error;
use crate::append::Append;

/// An appender that keeps log lines in memory so a test can assert on them.
///
/// Cloning the appender shares the captured lines.
///
/// # Examples
///
/// ```
/// use logforth_queue::append::Testing;
///
/// let testing = Testing::default();
/// let captured = testing.clone();
/// assert!(captured.lines().is_empty());
/// ```
#[derive(Debug, Default, Clone)]
pub struct Testing {
    lines: Arc<Mutex<Vec<String>>>,
}

impl Testing {
    fn lock(&self) -> MutexGuard<'_, Vec<String>> {
        self.lines.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Return a copy of every captured line, in write order.
    pub fn lines(&self) -> Vec<String> {
        self.lock().clone()
    }

    /// Remove and return every captured line.
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.lock())
    }
}

impl Append for Testing {
    fn append(&self, line: &str) -> Result<(), Error> {
        self.lock().push(line.to_string());
        Ok(())
    }
}
