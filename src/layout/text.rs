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

use std::fmt::Write;

use serde_json::Value;

use crate::layout::Layout;
use crate::layout::json::format_timestamp;
use crate::record::Record;

/// A layout that formats log records as human-readable text.
///
/// Output format:
///
/// ```text
/// 2024-08-11T14:44:57.172051+00:00 [ERROR|app::db|L51] Hello error! host=db1
/// 2024-08-11T14:44:57.172187+00:00 [WARNING|app::db|L52] Hello warn!
/// ```
///
/// An exception or a stack is written on the following lines.
///
/// # Examples
///
/// ```
/// use logforth_queue::layout::TextLayout;
///
/// let text_layout = TextLayout::default();
/// ```
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct TextLayout {}

impl TextLayout {
    /// Format a record as text. Only an exception or a stack adds newlines.
    pub fn format(&self, record: &Record) -> String {
        let mut text = String::new();

        // writing to a String never fails
        let _ = write!(
            text,
            "{} [{}|{}|L{}] {}",
            format_timestamp(record.time()),
            record.level(),
            record.module().unwrap_or(record.target()),
            record.line().unwrap_or_default(),
            record.message(),
        );

        for (key, value) in record.extras() {
            match value {
                Value::String(s) => {
                    let _ = write!(text, " {key}={s}");
                }
                value => {
                    let _ = write!(text, " {key}={value}");
                }
            }
        }

        if let Some(exception) = record.exception() {
            let _ = write!(text, "\n{exception}");
        }
        if let Some(stack) = record.stack_info() {
            let _ = write!(text, "\nStack (most recent call first):\n{stack}");
        }

        text
    }
}

impl From<TextLayout> for Layout {
    fn from(layout: TextLayout) -> Self {
        Layout::Text(layout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Level;

    #[test]
    fn test_text_layout() {
        let record = Record::builder()
            .time("2024-08-11T14:44:57.5Z".parse().unwrap())
            .level(Level::Warning)
            .module("app::db")
            .line(52)
            .message("pool exhausted")
            .extra("size", 8)
            .extra("host", "db1")
            .build();

        assert_eq!(
            TextLayout::default().format(&record),
            "2024-08-11T14:44:57.500000+00:00 [WARNING|app::db|L52] pool exhausted host=db1 size=8"
        );
    }
}
