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

//! Read a JSON-lines log file back and print a severity-filtered view of it.
//!
//! ```
//! use logforth_queue::reader::Reader;
//! use logforth_queue::trap::DefaultTrap;
//!
//! let input = concat!(
//!     r#"{"level":"INFO","message":"started","module":"app","function":"main","line":3}"#,
//!     "\n",
//!     r#"{"level":"ERROR","message":"boom","module":"app::db","function":"query","line":42}"#,
//!     "\n",
//! );
//!
//! let mut out = vec![];
//! let reader = Reader::new("WARNING").unwrap();
//! let summary = reader
//!     .render(input.as_bytes(), &mut out, &DefaultTrap::default())
//!     .unwrap();
//! assert_eq!(summary.rendered, 1);
//! assert_eq!(String::from_utf8(out).unwrap(), "[ERROR|app::db|query|42] boom\n");
//! ```

use std::fs::File;
use std::io::BufRead;
use std::io::BufReader;
use std::io::Write;
use std::path::Path;

use serde_json::Map;
use serde_json::Value;

use crate::Error;
use crate::ErrorKind;
use crate::Level;
use crate::Trap;
use crate::trap::DefaultTrap;

/// Counts of what a [`Reader::render`] pass did with each non-empty line.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReadSummary {
    /// Records printed.
    pub rendered: usize,
    /// Records below the minimum level.
    pub filtered: usize,
    /// Lines that are not JSON objects.
    pub skipped: usize,
}

/// Renders records of a JSON-lines log at or above a minimum level.
#[derive(Debug, Clone)]
pub struct Reader {
    min_level: Level,
    #[cfg(feature = "colored")]
    colored: bool,
}

impl Reader {
    /// Create a reader keeping records at `min_level` or above.
    ///
    /// # Errors
    ///
    /// Return an [`ErrorKind::InvalidSeverity`] error if `min_level` is not a severity name.
    pub fn new(min_level: &str) -> Result<Reader, Error> {
        Ok(Reader {
            min_level: min_level.parse()?,
            #[cfg(feature = "colored")]
            colored: false,
        })
    }

    /// Color the level of each printed record.
    #[cfg(feature = "colored")]
    pub fn colored(mut self, colored: bool) -> Self {
        self.colored = colored;
        self
    }

    pub fn min_level(&self) -> Level {
        self.min_level
    }

    /// Stream `input` line by line and write one line per kept record to `out`.
    ///
    /// A line that cannot be parsed is reported to `trap` and skipped. Only I/O errors on
    /// `input` or `out` stop the pass.
    pub fn render(
        &self,
        mut input: impl BufRead,
        mut out: impl Write,
        trap: &dyn Trap,
    ) -> Result<ReadSummary, Error> {
        let mut summary = ReadSummary::default();
        let mut buf = Vec::new();
        let mut line_number = 0usize;

        loop {
            buf.clear();
            let n = input
                .read_until(b'\n', &mut buf)
                .map_err(Error::from_io_error)?;
            if n == 0 {
                break;
            }
            line_number += 1;

            let line = buf.trim_ascii();
            if line.is_empty() {
                continue;
            }

            let entry = match parse_line(line) {
                Ok(entry) => entry,
                Err(err) => {
                    trap.trap(&err.with_context("line", line_number));
                    summary.skipped += 1;
                    continue;
                }
            };

            let level = entry_level(&entry);
            if level < self.min_level {
                summary.filtered += 1;
                continue;
            }

            writeln!(
                out,
                "[{}|{}|{}|{}] {}",
                self.level_tag(level),
                field(&entry, "module"),
                field(&entry, "function"),
                field(&entry, "line"),
                field(&entry, "message"),
            )
            .map_err(Error::from_io_error)?;
            summary.rendered += 1;
        }

        out.flush().map_err(Error::from_io_error)?;
        Ok(summary)
    }

    #[cfg(not(feature = "colored"))]
    fn level_tag(&self, level: Level) -> &'static str {
        level.as_str()
    }

    #[cfg(feature = "colored")]
    fn level_tag(&self, level: Level) -> colored::ColoredString {
        use colored::Color;
        use colored::Colorize;

        if !self.colored {
            return level.as_str().normal();
        }
        let color = match level {
            Level::Critical => Color::BrightRed,
            Level::Error => Color::Red,
            Level::Warning => Color::Yellow,
            Level::Info => Color::Green,
            Level::Debug => Color::Blue,
        };
        level.as_str().color(color)
    }
}

/// Print the records of the log file at `path` at or above `min_level` to stdout.
///
/// Unparseable lines are reported on stderr.
pub fn display(path: impl AsRef<Path>, min_level: &str) -> Result<ReadSummary, Error> {
    let reader = Reader::new(min_level)?;
    let path = path.as_ref();
    let file = File::open(path).map_err(|err| {
        Error::new(ErrorKind::Io, "failed to open log file")
            .with_context("path", path.display())
            .with_source(err)
    })?;
    reader.render(
        BufReader::new(file),
        std::io::stdout().lock(),
        &DefaultTrap::default(),
    )
}

fn parse_line(line: &[u8]) -> Result<Map<String, Value>, Error> {
    match serde_json::from_slice::<Value>(line) {
        Ok(Value::Object(entry)) => Ok(entry),
        Ok(_) => Err(Error::new(ErrorKind::Parse, "log line is not a JSON object")),
        Err(err) => Err(Error::new(ErrorKind::Parse, "failed to parse log line").with_source(err)),
    }
}

fn entry_level(entry: &Map<String, Value>) -> Level {
    let level = match entry.get("level") {
        Some(Value::String(name)) => name.parse().ok(),
        Some(Value::Number(n)) => n
            .as_u64()
            .and_then(|n| u8::try_from(n).ok())
            .and_then(Level::from_value),
        _ => None,
    };
    level.unwrap_or(Level::Debug)
}

fn field(entry: &Map<String, Value>, key: &str) -> String {
    match entry.get(key) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(value) => value.to_string(),
    }
}
