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

//! Output targets for formatted log lines, and the [`Sink`] that binds a target to a level,
//! filters and a layout.

use std::fmt;

use crate::Error;

pub mod rolling_file;
mod sink;
mod stdio;
mod testing;

pub use self::rolling_file::RollingFile;
pub use self::rolling_file::RollingFileBuilder;
pub use self::sink::Sink;
pub use self::sink::SinkKind;
pub use self::sink::Target;
pub use self::stdio::Console;
pub use self::stdio::Stream;
pub use self::testing::Testing;

/// A destination for formatted log lines.
pub trait Append: fmt::Debug + Send + Sync + 'static {
    /// Write one formatted line. The appender adds the line terminator.
    fn append(&self, line: &str) -> Result<(), Error>;

    /// Flush any buffered lines.
    ///
    /// Default to a no-op.
    fn flush(&self) -> Result<(), Error> {
        Ok(())
    }

    /// Flush and release the underlying resource. Later appends may fail.
    ///
    /// Default to [`Append::flush`].
    fn close(&self) -> Result<(), Error> {
        self.flush()
    }
}

impl<T: Append> From<T> for Box<dyn Append> {
    fn from(value: T) -> Self {
        Box::new(value)
    }
}
