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

use std::path::Path;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::MutexGuard;

use crate::Error;
use crate::append::Append;
use crate::append::rolling_file::RollingFileWriter;
use crate::append::rolling_file::RollingFileWriterBuilder;

/// A builder to configure and create a [`RollingFile`] appender.
#[derive(Debug)]
pub struct RollingFileBuilder {
    builder: RollingFileWriterBuilder,
}

impl RollingFileBuilder {
    /// Create a new rolling file appender builder writing to `path`.
    ///
    /// By default the file is never rotated.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            builder: RollingFileWriterBuilder::new(path),
        }
    }

    /// Set the size in bytes past which the active file is rotated.
    pub fn max_bytes(mut self, n: u64) -> Self {
        self.builder = self.builder.max_bytes(n);
        self
    }

    /// Set the number of archived files to keep.
    pub fn backup_count(mut self, n: usize) -> Self {
        self.builder = self.builder.backup_count(n);
        self
    }

    /// Build the [`RollingFile`] appender.
    ///
    /// # Errors
    ///
    /// Return an error if the log file cannot be opened.
    pub fn build(self) -> Result<RollingFile, Error> {
        let writer = self.builder.build()?;
        Ok(RollingFile::new(writer))
    }
}

/// An appender that writes log lines to a size-rotated file.
#[derive(Debug)]
pub struct RollingFile {
    writer: Mutex<RollingFileWriter>,
}

impl RollingFile {
    fn new(writer: RollingFileWriter) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    fn writer(&self) -> MutexGuard<'_, RollingFileWriter> {
        self.writer.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// The path of the active file.
    pub fn path(&self) -> PathBuf {
        self.writer().path().to_path_buf()
    }

    /// Redirect later lines to `path`. See [`RollingFileWriter::set_path`].
    pub fn set_path(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        self.writer().set_path(path.as_ref())
    }
}

impl Append for RollingFile {
    fn append(&self, line: &str) -> Result<(), Error> {
        let mut bytes = Vec::with_capacity(line.len() + 1);
        bytes.extend_from_slice(line.as_bytes());
        bytes.push(b'\n');
        self.writer()
            .write_line(&bytes)
            .map_err(Error::from_io_error)
    }

    fn flush(&self) -> Result<(), Error> {
        self.writer().flush().map_err(Error::from_io_error)
    }

    fn close(&self) -> Result<(), Error> {
        self.writer().close().map_err(Error::from_io_error)
    }
}

impl Drop for RollingFile {
    fn drop(&mut self) {
        let writer = self.writer.get_mut().unwrap_or_else(|e| e.into_inner());
        if let Err(err) = writer.flush() {
            eprintln!("failed to flush rolling file writer: {err}");
        }
    }
}
