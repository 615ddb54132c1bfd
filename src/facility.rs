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

use std::collections::HashSet;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use crate::Error;
use crate::ErrorKind;
use crate::Level;
use crate::Trap;
use crate::append::Sink;
use crate::append::SinkKind;
use crate::append::Stream;
use crate::config::Config;
use crate::dispatch::Control;
use crate::dispatch::DispatchState;
use crate::dispatch::Dispatcher;
use crate::dispatch::Overflow;
use crate::layout::JsonLayout;
use crate::record::Record;
use crate::trap::DefaultTrap;

/// The extension every file written by a rotating-file sink is given.
pub const LOG_FILE_EXTENSION: &str = "jsonl";

const DEFAULT_THREAD_NAME: &str = "logforth-queue";

/// A queued logging facility: a set of sinks fed by one background worker.
///
/// Logging calls only enqueue the record; the worker formats it and writes it to every sink
/// that accepts it, in the order records were enqueued across all threads.
///
/// # Examples
///
/// ```
/// use logforth_queue::Facility;
/// use logforth_queue::Level;
/// use logforth_queue::Record;
/// use logforth_queue::append::Sink;
/// use logforth_queue::append::Testing;
///
/// let testing = Testing::default();
/// let facility = Facility::builder()
///     .sink(Sink::new("memory", testing.clone()).with_level(Level::Info))
///     .build();
/// facility.start().unwrap();
///
/// facility.log(Record::builder().level(Level::Debug).message("dropped").build());
/// facility.log(Record::builder().level(Level::Info).message("kept").build());
/// facility.shutdown();
///
/// assert_eq!(testing.lines().len(), 1);
/// ```
#[derive(Debug)]
pub struct Facility {
    dispatcher: Dispatcher,
    config_errors: Vec<Error>,
}

impl Facility {
    /// Create a new [`FacilityBuilder`].
    pub fn builder() -> FacilityBuilder {
        FacilityBuilder::default()
    }

    /// Build a facility from a configuration, skipping whatever is invalid.
    ///
    /// Every invalid sink definition, field or severity is reported to the [`DefaultTrap`] and
    /// kept in [`Facility::config_errors`]. If no sink can be built, a stdout console sink
    /// accepting every level is installed instead.
    pub fn from_config(config: &Config) -> Facility {
        Facility::builder().config(config).build()
    }

    /// Build a facility from a configuration, failing on the first invalid entry.
    pub fn try_from_config(config: &Config) -> Result<Facility, Error> {
        Facility::builder().config(config).try_build()
    }

    /// Start the background worker. Records logged before this call are delivered first.
    ///
    /// # Errors
    ///
    /// Return an error if the facility has been shut down or the thread cannot be spawned.
    pub fn start(&self) -> Result<(), Error> {
        self.dispatcher.start()
    }

    /// Deliver every queued record, stop the worker, then flush and close all sinks.
    ///
    /// Records logged afterwards are dropped. Calling this more than once is a no-op.
    pub fn shutdown(&self) {
        self.dispatcher.shutdown();
    }

    /// The current lifecycle state of the worker.
    pub fn state(&self) -> DispatchState {
        self.dispatcher.state()
    }

    /// Enqueue a record. This never blocks on sink I/O and never fails.
    pub fn log(&self, record: Record) {
        self.dispatcher.enqueue(record);
    }

    /// Whether any sink would accept a record of `level`.
    pub fn enabled(&self, level: Level) -> bool {
        self.sinks().iter().any(|sink| sink.accepts_level(level))
    }

    /// Block until every record logged before this call has been written, then flush all sinks.
    pub fn flush(&self) -> Result<(), Error> {
        self.dispatcher.control(Control::Flush)
    }

    /// Every sink, in the order they were added.
    pub fn sinks(&self) -> &[Sink] {
        self.dispatcher.sinks()
    }

    /// Find a sink by name.
    pub fn locate_sink(&self, name: &str) -> Option<&Sink> {
        self.sinks().iter().find(|sink| sink.name() == name)
    }

    /// The configuration errors skipped while this facility was built.
    pub fn config_errors(&self) -> &[Error] {
        &self.config_errors
    }

    /// Change the minimum level of the console sink.
    ///
    /// The stdout console sink is preferred, then the first console sink. Records logged
    /// before this call are still filtered with the previous level.
    ///
    /// # Errors
    ///
    /// Return an [`ErrorKind::InvalidSeverity`] error if `level` is not a severity name, or an
    /// [`ErrorKind::NotFound`] error if there is no console sink. Either way nothing changes.
    pub fn set_console_level(&self, level: &str) -> Result<(), Error> {
        let level: Level = level.parse()?;
        let index = self
            .position(|sink| sink.console_stream() == Some(Stream::Stdout))
            .or_else(|| self.position(|sink| sink.kind() == SinkKind::Console))
            .ok_or_else(|| Error::new(ErrorKind::NotFound, "no console sink"))?;
        self.dispatcher.control(Control::SetLevel {
            sink: index,
            level,
        })
    }

    /// Change the minimum level of the sink named `name`, in queue order.
    pub fn set_sink_level(&self, name: &str, level: &str) -> Result<(), Error> {
        let level: Level = level.parse()?;
        let index = self
            .position(|sink| sink.name() == name)
            .ok_or_else(|| Error::new(ErrorKind::NotFound, "no such sink").with_context("sink", name))?;
        self.dispatcher.control(Control::SetLevel {
            sink: index,
            level,
        })
    }

    /// Redirect the rotating-file sink to `path` and return the path actually used.
    ///
    /// The extension is replaced with `.jsonl` unless it already is one. Missing parent
    /// directories are created. Records logged before this call end up in the previous file.
    ///
    /// # Errors
    ///
    /// Return an [`ErrorKind::NotFound`] error if there is no rotating-file sink, or an
    /// [`ErrorKind::Io`] error if the file cannot be opened, in which case the previous file
    /// stays active.
    pub fn set_log_file(&self, path: impl AsRef<Path>) -> Result<PathBuf, Error> {
        let path = normalize_log_file(path.as_ref());
        let index = self
            .position(|sink| sink.kind() == SinkKind::RollingFile)
            .ok_or_else(|| Error::new(ErrorKind::NotFound, "no rotating file sink"))?;
        self.dispatcher.control(Control::SetPath {
            sink: index,
            path: path.clone(),
        })?;
        Ok(path)
    }

    fn position(&self, predicate: impl Fn(&Sink) -> bool) -> Option<usize> {
        self.sinks().iter().position(predicate)
    }

    pub(crate) fn trap(&self) -> &dyn Trap {
        self.dispatcher.trap()
    }
}

impl Drop for Facility {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn normalize_log_file(path: &Path) -> PathBuf {
    if path.extension().is_some_and(|ext| ext == LOG_FILE_EXTENSION) {
        path.to_path_buf()
    } else {
        path.with_extension(LOG_FILE_EXTENSION)
    }
}

/// A builder for configuring a [`Facility`].
#[derive(Debug)]
pub struct FacilityBuilder {
    sinks: Vec<Sink>,
    layout: JsonLayout,
    trap: Box<dyn Trap>,
    thread_name: String,
    buffered_lines_limit: Option<usize>,
    overflow: Overflow,
    config_errors: Vec<Error>,
    fallback_sink: bool,
}

impl Default for FacilityBuilder {
    fn default() -> Self {
        FacilityBuilder {
            sinks: vec![],
            layout: JsonLayout::default(),
            trap: Box::new(DefaultTrap::default()),
            thread_name: DEFAULT_THREAD_NAME.to_string(),
            buffered_lines_limit: None,
            overflow: Overflow::Block,
            config_errors: vec![],
            fallback_sink: false,
        }
    }
}

impl FacilityBuilder {
    /// Add a sink. Sink names must be unique.
    pub fn sink(mut self, sink: Sink) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Set the JSON layout of every sink that has no layout of its own.
    pub fn layout(mut self, layout: JsonLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Set the trap that receives delivery and configuration errors.
    pub fn trap(mut self, trap: impl Into<Box<dyn Trap>>) -> Self {
        self.trap = trap.into();
        self
    }

    /// Set the name of the worker thread.
    pub fn thread_name(mut self, thread_name: impl Into<String>) -> Self {
        self.thread_name = thread_name.into();
        self
    }

    /// Set the number of records the queue holds before overflowing. Unbounded by default.
    pub fn buffered_lines_limit(mut self, buffered_lines_limit: Option<usize>) -> Self {
        self.buffered_lines_limit = buffered_lines_limit;
        self
    }

    /// Block the logging call while a bounded queue is full. This is the default.
    pub fn overflow_block(mut self) -> Self {
        self.overflow = Overflow::Block;
        self
    }

    /// Drop incoming records while a bounded queue is full.
    pub fn overflow_drop_incoming(mut self) -> Self {
        self.overflow = Overflow::DropIncoming;
        self
    }

    /// Add the sinks, layout and queue settings of `config`.
    ///
    /// Invalid entries are skipped and reported when the facility is built.
    pub fn config(mut self, config: &Config) -> Self {
        self.layout = config.layout(&mut self.config_errors);
        let sinks = config.build_sinks(&mut self.config_errors);
        self.sinks.extend(sinks);

        let queue = config.queue();
        if let Some(thread_name) = &queue.thread_name {
            self.thread_name = thread_name.clone();
        }
        self.buffered_lines_limit = queue.capacity;
        self.overflow = queue.overflow;
        self.fallback_sink = true;
        self
    }

    /// Build the facility, reporting skipped configuration entries to the trap.
    pub fn build(self) -> Facility {
        let Self {
            sinks,
            layout,
            trap,
            thread_name,
            buffered_lines_limit,
            overflow,
            mut config_errors,
            fallback_sink,
        } = self;

        let mut names = HashSet::new();
        let mut unique = Vec::with_capacity(sinks.len());
        for mut sink in sinks {
            if !names.insert(sink.name().to_string()) {
                config_errors.push(
                    Error::configuration("duplicate sink name").with_context("sink", sink.name()),
                );
                continue;
            }
            sink.inherit_layout(&layout);
            unique.push(sink);
        }
        if unique.is_empty() && fallback_sink {
            let mut sink = Sink::console("console").with_level(Level::Debug);
            sink.inherit_layout(&layout);
            unique.push(sink);
        }

        let trap: Arc<dyn Trap> = Arc::from(trap);
        for err in &config_errors {
            trap.trap(err);
        }

        let dispatcher = Dispatcher::new(unique, trap, thread_name, buffered_lines_limit, overflow);
        Facility {
            dispatcher,
            config_errors,
        }
    }

    /// Build the facility, or return the first configuration error.
    pub fn try_build(mut self) -> Result<Facility, Error> {
        if !self.config_errors.is_empty() {
            return Err(self.config_errors.swap_remove(0));
        }

        {
            let mut names = HashSet::new();
            if let Some(sink) = self.sinks.iter().find(|s| !names.insert(s.name())) {
                return Err(
                    Error::configuration("duplicate sink name").with_context("sink", sink.name())
                );
            }
        }
        Ok(self.build())
    }
}

/// Shuts a shared facility down when dropped.
///
/// A facility handed to the `log` bridge lives in an [`Arc`] and is never dropped by the
/// logger. Keep this guard alive in `main` so queued records are written before the process
/// exits.
#[derive(Debug)]
#[must_use = "dropping the guard shuts the facility down immediately"]
pub struct ExitGuard {
    facility: Arc<Facility>,
}

impl ExitGuard {
    pub fn new(facility: Arc<Facility>) -> Self {
        Self { facility }
    }

    pub fn facility(&self) -> &Arc<Facility> {
        &self.facility
    }
}

impl Drop for ExitGuard {
    fn drop(&mut self) {
        self.facility.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::append::Testing;
    use crate::trap::CollectingTrap;

    fn info(message: &'static str) -> Record {
        Record::builder().level(Level::Info).message(message).build()
    }

    #[test]
    fn test_normalize_log_file() {
        assert_eq!(
            normalize_log_file(Path::new("logs/app.log")),
            PathBuf::from("logs/app.jsonl")
        );
        assert_eq!(
            normalize_log_file(Path::new("logs/app")),
            PathBuf::from("logs/app.jsonl")
        );
        assert_eq!(
            normalize_log_file(Path::new("logs/app.jsonl")),
            PathBuf::from("logs/app.jsonl")
        );
    }

    #[test]
    fn test_records_before_start_are_delivered() {
        let testing = Testing::default();
        let facility = Facility::builder()
            .sink(Sink::new("memory", testing.clone()))
            .build();
        assert_eq!(facility.state(), DispatchState::Stopped);

        facility.log(info("early"));
        facility.start().unwrap();
        assert_eq!(facility.state(), DispatchState::Running);
        facility.log(info("late"));
        facility.flush().unwrap();

        let lines = testing.lines();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("early"));
        assert!(lines[1].contains("late"));

        facility.shutdown();
        assert_eq!(facility.state(), DispatchState::Stopped);
    }

    #[test]
    fn test_shutdown_without_start_drains_on_caller() {
        let testing = Testing::default();
        let facility = Facility::builder()
            .sink(Sink::new("memory", testing.clone()))
            .build();
        facility.log(info("buffered"));
        facility.shutdown();
        facility.shutdown();
        assert_eq!(testing.lines().len(), 1);
    }

    #[test]
    fn test_log_after_shutdown_is_reported_once() {
        let trap = CollectingTrap::default();
        let testing = Testing::default();
        let facility = Facility::builder()
            .sink(Sink::new("memory", testing.clone()))
            .trap(trap.clone())
            .build();
        facility.start().unwrap();
        facility.shutdown();

        facility.log(info("lost"));
        facility.log(info("lost again"));
        assert!(testing.lines().is_empty());
        assert_eq!(trap.count(ErrorKind::Shutdown), 1);

        let err = facility.start().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Shutdown);
        let err = facility.flush().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Shutdown);
    }

    #[test]
    fn test_reconfiguration_errors_have_no_effect() {
        let facility = Facility::builder()
            .sink(Sink::console("stdout").with_level(Level::Warning))
            .sink(Sink::new("memory", Testing::default()))
            .build();
        facility.start().unwrap();

        let err = facility.set_console_level("VERBOSE").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidSeverity);
        assert_eq!(facility.sinks()[0].min_level(), Level::Warning);

        let err = facility.set_sink_level("nope", "INFO").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = facility.set_log_file("logs/app.jsonl").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        facility.set_console_level("error").unwrap();
        assert_eq!(facility.sinks()[0].min_level(), Level::Error);
        facility.set_sink_level("memory", "CRITICAL").unwrap();
        assert_eq!(facility.locate_sink("memory").unwrap().min_level(), Level::Critical);
        assert!(facility.locate_sink("missing").is_none());
    }

    #[test]
    fn test_duplicate_sink_names() {
        let trap = CollectingTrap::default();
        let facility = Facility::builder()
            .sink(Sink::new("memory", Testing::default()))
            .sink(Sink::new("memory", Testing::default()))
            .trap(trap.clone())
            .build();
        assert_eq!(facility.sinks().len(), 1);
        assert_eq!(trap.count(ErrorKind::Configuration), 1);

        let err = Facility::builder()
            .sink(Sink::new("memory", Testing::default()))
            .sink(Sink::new("memory", Testing::default()))
            .try_build()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_from_config_falls_back_to_console() {
        let config = Config::from_json(r#"{"sinks": {"bad": {"kind": "console", "level": "LOUD"}}}"#)
            .unwrap();
        let facility = Facility::builder()
            .trap(CollectingTrap::default())
            .config(&config)
            .build();
        assert_eq!(facility.config_errors().len(), 1);
        assert_eq!(facility.sinks().len(), 1);
        assert_eq!(facility.sinks()[0].console_stream(), Some(Stream::Stdout));
        assert_eq!(facility.sinks()[0].min_level(), Level::Debug);

        let err = Facility::try_from_config(&config).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert_eq!(err.context("sink"), Some("bad"));
    }
}
