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

use crate::Error;
use crate::Level;
use crate::append::Append;
use crate::append::Console;
use crate::append::RollingFile;
use crate::append::Stream;
use crate::append::Testing;
use crate::filter;
use crate::filter::Filter;
use crate::layout::JsonLayout;
use crate::layout::Layout;
use crate::record::AtomicLevel;
use crate::record::Record;

/// The kind of a [`Sink`]'s target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SinkKind {
    Console,
    RollingFile,
    Testing,
    Custom,
}

impl SinkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SinkKind::Console => "console",
            SinkKind::RollingFile => "rotating_file",
            SinkKind::Testing => "testing",
            SinkKind::Custom => "custom",
        }
    }
}

impl fmt::Display for SinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a [`Sink`] writes its lines.
#[derive(Debug)]
pub enum Target {
    Console(Console),
    RollingFile(RollingFile),
    Testing(Testing),
    Custom(Box<dyn Append>),
}

impl Target {
    fn as_append(&self) -> &dyn Append {
        match self {
            Target::Console(append) => append,
            Target::RollingFile(append) => append,
            Target::Testing(append) => append,
            Target::Custom(append) => append.as_ref(),
        }
    }
}

impl From<Console> for Target {
    fn from(append: Console) -> Self {
        Target::Console(append)
    }
}

impl From<RollingFile> for Target {
    fn from(append: RollingFile) -> Self {
        Target::RollingFile(append)
    }
}

impl From<Testing> for Target {
    fn from(append: Testing) -> Self {
        Target::Testing(append)
    }
}

impl From<Box<dyn Append>> for Target {
    fn from(append: Box<dyn Append>) -> Self {
        Target::Custom(append)
    }
}

/// A named output with its own minimum level, filters and layout.
///
/// # Examples
///
/// ```
/// use logforth_queue::Level;
/// use logforth_queue::append::Sink;
/// use logforth_queue::filter::Filter;
///
/// let sink = Sink::console("stdout")
///     .with_level(Level::Debug)
///     .with_filter(Filter::non_error());
/// assert!(sink.accepts_level(Level::Debug));
/// ```
#[derive(Debug)]
pub struct Sink {
    name: String,
    min_level: AtomicLevel,
    filters: Vec<Filter>,
    layout: Option<Layout>,
    target: Target,
}

impl Sink {
    /// Create a sink writing to `target` that accepts every level.
    ///
    /// Without [`Sink::with_layout`], the sink uses the facility's JSON layout.
    pub fn new(name: impl Into<String>, target: impl Into<Target>) -> Self {
        Self {
            name: name.into(),
            min_level: AtomicLevel::new(Level::Debug),
            filters: vec![],
            layout: None,
            target: target.into(),
        }
    }

    /// Create a sink writing to standard output.
    pub fn console(name: impl Into<String>) -> Self {
        Self::new(name, Console::default())
    }

    /// Set the minimum level of records this sink accepts.
    pub fn with_level(self, level: Level) -> Self {
        self.min_level.store(level);
        self
    }

    /// Append a filter to the sink.
    pub fn with_filter(mut self, filter: impl Into<Filter>) -> Self {
        self.filters.push(filter.into());
        self
    }

    /// Set the layout used to format records.
    pub fn with_layout(mut self, layout: impl Into<Layout>) -> Self {
        self.layout = Some(layout.into());
        self
    }

    pub(crate) fn inherit_layout(&mut self, layout: &JsonLayout) {
        if self.layout.is_none() {
            self.layout = Some(layout.clone().into());
        }
    }

    /// The unique name of the sink within its facility.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The kind of target this sink writes to.
    pub fn kind(&self) -> SinkKind {
        match self.target {
            Target::Console(_) => SinkKind::Console,
            Target::RollingFile(_) => SinkKind::RollingFile,
            Target::Testing(_) => SinkKind::Testing,
            Target::Custom(_) => SinkKind::Custom,
        }
    }

    /// The minimum level currently accepted.
    pub fn min_level(&self) -> Level {
        self.min_level.load()
    }

    /// The layout this sink formats records with, if one was set.
    pub fn layout(&self) -> Option<&Layout> {
        self.layout.as_ref()
    }

    /// The stream of a console sink.
    pub fn console_stream(&self) -> Option<Stream> {
        match &self.target {
            Target::Console(console) => Some(console.stream()),
            _ => None,
        }
    }

    /// The appender of a rotating-file sink.
    pub fn rolling_file(&self) -> Option<&RollingFile> {
        match &self.target {
            Target::RollingFile(file) => Some(file),
            _ => None,
        }
    }

    /// The appender of an in-memory sink.
    pub fn testing(&self) -> Option<&Testing> {
        match &self.target {
            Target::Testing(testing) => Some(testing),
            _ => None,
        }
    }

    /// Change the minimum level. Takes effect for the next record checked.
    pub fn set_min_level(&self, level: Level) {
        self.min_level.store(level);
    }

    /// Whether a record of `level` passes the minimum level.
    pub fn accepts_level(&self, level: Level) -> bool {
        level >= self.min_level.load()
    }

    /// Whether the record passes both the minimum level and every filter.
    pub fn accepts(&self, record: &Record) -> bool {
        self.accepts_level(record.level()) && filter::accepts(&self.filters, record)
    }

    /// Format the record and write it. Does not check [`Sink::accepts`].
    pub fn write(&self, record: &Record) -> Result<(), Error> {
        let line = match &self.layout {
            Some(layout) => layout.format(record),
            None => JsonLayout::default().format(record),
        };
        self.write_line(&line)
    }

    /// Write an already formatted line.
    pub fn write_line(&self, line: &str) -> Result<(), Error> {
        self.target
            .as_append()
            .append(line)
            .map_err(|err| Error::sink_write(&self.name, err))
    }

    pub fn flush(&self) -> Result<(), Error> {
        self.target
            .as_append()
            .flush()
            .map_err(|err| Error::sink_write(&self.name, err))
    }

    /// Flush and release the target. A closed file sink fails later writes.
    pub fn close(&self) -> Result<(), Error> {
        self.target
            .as_append()
            .close()
            .map_err(|err| Error::sink_write(&self.name, err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use crate::layout::TextLayout;

    #[derive(Debug)]
    struct Broken;

    impl Append for Broken {
        fn append(&self, _: &str) -> Result<(), Error> {
            Err(Error::from_io_error(std::io::Error::other("disk full")))
        }
    }

    fn record(level: Level) -> Record {
        Record::builder().level(level).message("hello").build()
    }

    #[test]
    fn test_level_then_filters() {
        let sink = Sink::new("stdout", Testing::default())
            .with_level(Level::Info)
            .with_filter(Filter::non_error());
        assert!(!sink.accepts(&record(Level::Debug)));
        assert!(sink.accepts(&record(Level::Info)));
        assert!(!sink.accepts(&record(Level::Error)));

        sink.set_min_level(Level::Debug);
        assert_eq!(sink.min_level(), Level::Debug);
        assert!(sink.accepts(&record(Level::Debug)));
    }

    #[test]
    fn test_write_uses_layout() {
        let testing = Testing::default();
        let sink = Sink::new("mem", testing.clone()).with_layout(TextLayout::default());
        sink.write(&record(Level::Info)).unwrap();

        let lines = testing.take();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].ends_with("|L0] hello"), "{}", lines[0]);
        assert_eq!(sink.kind(), SinkKind::Testing);
    }

    #[test]
    fn test_write_error_names_sink() {
        let sink = Sink::new("broken", Box::new(Broken) as Box<dyn Append>);
        let err = sink.write(&record(Level::Error)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SinkWrite);
        assert_eq!(err.context("sink"), Some("broken"));
        assert_eq!(sink.kind(), SinkKind::Custom);
    }
}
