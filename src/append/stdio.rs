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

use std::io::Write;

use serde::Deserialize;

use crate::Error;
use crate::append::Append;

/// A standard stream of the process.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stream {
    /// Standard output.
    #[default]
    Stdout,
    /// Standard error.
    Stderr,
}

/// An appender that prints log lines to stdout or stderr.
///
/// Lines are written as UTF-8 bytes whatever the platform's console encoding, and each line is
/// flushed as soon as it is written.
#[derive(Debug, Default)]
pub struct Console {
    stream: Stream,
}

impl Console {
    /// Create a console appender for the given stream.
    pub fn new(stream: Stream) -> Self {
        Self { stream }
    }

    /// The stream this appender writes to.
    pub fn stream(&self) -> Stream {
        self.stream
    }

    fn write_line(out: &mut impl Write, line: &str) -> std::io::Result<()> {
        let mut bytes = Vec::with_capacity(line.len() + 1);
        bytes.extend_from_slice(line.as_bytes());
        bytes.push(b'\n');
        out.write_all(&bytes)?;
        out.flush()
    }
}

impl Append for Console {
    fn append(&self, line: &str) -> Result<(), Error> {
        let result = match self.stream {
            Stream::Stdout => Self::write_line(&mut std::io::stdout().lock(), line),
            Stream::Stderr => Self::write_line(&mut std::io::stderr().lock(), line),
        };
        result.map_err(Error::from_io_error)
    }

    fn flush(&self) -> Result<(), Error> {
        let result = match self.stream {
            Stream::Stdout => std::io::stdout().flush(),
            Stream::Stderr => std::io::stderr().flush(),
        };
        result.map_err(Error::from_io_error)
    }
}
