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

//! Layouts for formatting log records.

pub use json::Attribute;
pub use json::JsonLayout;
pub use text::TextLayout;

use crate::record::Record;

mod json;
mod text;

/// Represents a layout for formatting log records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Layout {
    Json(JsonLayout),
    Text(TextLayout),
}

impl Default for Layout {
    fn default() -> Self {
        Layout::Json(JsonLayout::default())
    }
}

impl Layout {
    /// Format a record. Formatting never fails.
    pub fn format(&self, record: &Record) -> String {
        match self {
            Layout::Json(layout) => layout.format(record),
            Layout::Text(layout) => layout.format(record),
        }
    }
}
