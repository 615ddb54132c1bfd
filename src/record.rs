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

//! Log record and severity levels.

use std::backtrace::Backtrace;
use std::backtrace::BacktraceStatus;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::AtomicU8;
use std::sync::atomic::Ordering;

use jiff::Timestamp;
use serde::Serialize;
use serde_json::Value;

use crate::Error;
use crate::ErrorKind;

/// Keys a caller-supplied extra field can never take.
///
/// An extra whose key is listed here is dropped when the record is built, so the built-in
/// attribute always wins.
pub const RESERVED_FIELDS: &[&str] = &[
    "message",
    "timestamp",
    "level",
    "target",
    "module",
    "function",
    "file",
    "line",
    "thread",
    "exc_info",
    "stack_info",
];

/// Return whether `key` is one of the [`RESERVED_FIELDS`].
pub fn is_reserved(key: &str) -> bool {
    RESERVED_FIELDS.contains(&key)
}

/// An enum representing the available severity levels, from least to most severe.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    /// Designates diagnostic information.
    Debug,
    /// Designates useful information.
    Info,
    /// Designates hazardous situations.
    Warning,
    /// Designates serious errors.
    Error,
    /// Designates errors the program may not recover from.
    Critical,
}

impl Level {
    /// All levels, from least to most severe.
    pub const ALL: [Level; 5] = [
        Level::Debug,
        Level::Info,
        Level::Warning,
        Level::Error,
        Level::Critical,
    ];

    /// Return the string representation of the `Level`.
    ///
    /// This returns the same string as the `fmt::Display` implementation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warning => "WARNING",
            Level::Error => "ERROR",
            Level::Critical => "CRITICAL",
        }
    }

    /// Return the numeric severity of the `Level`.
    ///
    /// ```
    /// use logforth_queue::Level;
    ///
    /// assert_eq!(Level::Debug.value(), 10);
    /// assert_eq!(Level::Critical.value(), 50);
    /// ```
    pub fn value(&self) -> u8 {
        match self {
            Level::Debug => 10,
            Level::Info => 20,
            Level::Warning => 30,
            Level::Error => 40,
            Level::Critical => 50,
        }
    }

    /// Return the `Level` of the given numeric severity, if it is exactly one of the table's.
    pub fn from_value(value: u8) -> Option<Level> {
        Level::ALL.into_iter().find(|level| level.value() == value)
    }
}

impl fmt::Debug for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Level {
    type Err = Error;

    fn from_str(s: &str) -> Result<Level, Self::Err> {
        for (name, level) in [
            ("debug", Level::Debug),
            ("info", Level::Info),
            ("warning", Level::Warning),
            ("warn", Level::Warning),
            ("error", Level::Error),
            ("critical", Level::Critical),
            ("fatal", Level::Critical),
        ] {
            if s.trim().eq_ignore_ascii_case(name) {
                return Ok(level);
            }
        }

        Err(Error::new(
            ErrorKind::InvalidSeverity,
            format!("malformed level: {s:?}"),
        ))
    }
}

impl From<log::Level> for Level {
    fn from(level: log::Level) -> Self {
        match level {
            log::Level::Error => Level::Error,
            log::Level::Warn => Level::Warning,
            log::Level::Info => Level::Info,
            log::Level::Debug | log::Level::Trace => Level::Debug,
        }
    }
}

/// A level that can be swapped while other threads read it.
#[derive(Debug)]
pub(crate) struct AtomicLevel(AtomicU8);

impl AtomicLevel {
    pub(crate) fn new(level: Level) -> Self {
        Self(AtomicU8::new(level.value()))
    }

    pub(crate) fn load(&self) -> Level {
        // only values from the table are ever stored
        Level::from_value(self.0.load(Ordering::Acquire)).unwrap_or(Level::Debug)
    }

    pub(crate) fn store(&self, level: Level) {
        self.0.store(level.value(), Ordering::Release);
    }
}

/// Exception details attached to a record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExceptionInfo {
    message: String,
    causes: Vec<String>,
    backtrace: Option<String>,
}

impl ExceptionInfo {
    /// Capture an error, its chain of sources, and a backtrace when `RUST_BACKTRACE` or
    /// `RUST_LIB_BACKTRACE` enable one.
    pub fn from_error<E>(err: &E) -> Self
    where
        E: std::error::Error + ?Sized,
    {
        let mut causes = vec![];
        let mut source = err.source();
        while let Some(cause) = source {
            causes.push(cause.to_string());
            source = cause.source();
        }

        let backtrace = Backtrace::capture();
        let backtrace = match backtrace.status() {
            BacktraceStatus::Captured => Some(backtrace.to_string()),
            _ => None,
        };

        Self {
            message: err.to_string(),
            causes,
            backtrace,
        }
    }

    /// The error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The messages of the error's sources, outermost first.
    pub fn causes(&self) -> &[String] {
        &self.causes
    }

    /// The rendered backtrace, if one was captured.
    pub fn backtrace(&self) -> Option<&str> {
        self.backtrace.as_deref()
    }
}

impl fmt::Display for ExceptionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)?;
        if !self.causes.is_empty() {
            write!(f, "\n\nCaused by:")?;
            for (i, cause) in self.causes.iter().enumerate() {
                write!(f, "\n    {i}: {cause}")?;
            }
        }
        if let Some(backtrace) = &self.backtrace {
            write!(f, "\n\nStack backtrace:\n{backtrace}")?;
        }
        Ok(())
    }
}

/// The payload of a log message.
///
/// A record is immutable once built. Construct it with [`Record::builder`] or with one of the
/// logging macros, which also capture the call site.
#[derive(Clone, Debug)]
pub struct Record {
    // the observed time
    time: Timestamp,

    // the metadata
    level: Level,
    target: Cow<'static, str>,
    module: Option<Cow<'static, str>>,
    function: Option<Cow<'static, str>>,
    file: Option<Cow<'static, str>>,
    line: Option<u32>,
    thread: Option<String>,

    // the payload
    message: Cow<'static, str>,
    exception: Option<ExceptionInfo>,
    stack_info: Option<String>,

    // structural logging
    extras: BTreeMap<String, Value>,
}

impl Record {
    /// Returns a new builder, stamped with the current time and thread.
    pub fn builder() -> RecordBuilder {
        RecordBuilder::default()
    }

    /// The observed time.
    pub fn time(&self) -> Timestamp {
        self.time
    }

    /// The severity of the message.
    pub fn level(&self) -> Level {
        self.level
    }

    /// The name of the target of the directive.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// The module path of the call site.
    pub fn module(&self) -> Option<&str> {
        self.module.as_deref()
    }

    /// The function enclosing the call site.
    pub fn function(&self) -> Option<&str> {
        self.function.as_deref()
    }

    /// The source file containing the call site.
    pub fn file(&self) -> Option<&str> {
        self.file.as_deref()
    }

    /// The line of the call site.
    pub fn line(&self) -> Option<u32> {
        self.line
    }

    /// The name of the thread that created the record.
    pub fn thread(&self) -> Option<&str> {
        self.thread.as_deref()
    }

    /// The message body.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The exception attached to the record.
    pub fn exception(&self) -> Option<&ExceptionInfo> {
        self.exception.as_ref()
    }

    /// The stack of the call site, if it was requested.
    pub fn stack_info(&self) -> Option<&str> {
        self.stack_info.as_deref()
    }

    /// The caller-supplied extra fields. None of them uses a reserved key.
    pub fn extras(&self) -> &BTreeMap<String, Value> {
        &self.extras
    }
}

/// Builder for [`Record`].
#[derive(Debug)]
pub struct RecordBuilder {
    record: Record,
}

impl Default for RecordBuilder {
    fn default() -> Self {
        RecordBuilder {
            record: Record {
                time: Timestamp::now(),
                level: Level::Info,
                target: Cow::Borrowed(""),
                module: None,
                function: None,
                file: None,
                line: None,
                thread: std::thread::current().name().map(str::to_string),
                message: Cow::Borrowed(""),
                exception: None,
                stack_info: None,
                extras: BTreeMap::new(),
            },
        }
    }
}

impl RecordBuilder {
    /// Set [`time`](Record::time).
    pub fn time(mut self, time: Timestamp) -> Self {
        self.record.time = time;
        self
    }

    /// Set [`level`](Record::level).
    pub fn level(mut self, level: Level) -> Self {
        self.record.level = level;
        self
    }

    /// Set [`target`](Record::target).
    pub fn target(mut self, target: impl Into<Cow<'static, str>>) -> Self {
        self.record.target = target.into();
        self
    }

    /// Set [`module`](Record::module).
    pub fn module(mut self, module: impl Into<Cow<'static, str>>) -> Self {
        self.record.module = Some(module.into());
        self
    }

    /// Set [`function`](Record::function).
    pub fn function(mut self, function: impl Into<Cow<'static, str>>) -> Self {
        self.record.function = Some(function.into());
        self
    }

    /// Set [`file`](Record::file).
    pub fn file(mut self, file: impl Into<Cow<'static, str>>) -> Self {
        self.record.file = Some(file.into());
        self
    }

    /// Set [`line`](Record::line).
    pub fn line(mut self, line: u32) -> Self {
        self.record.line = Some(line);
        self
    }

    /// Set [`thread`](Record::thread).
    pub fn thread(mut self, thread: impl Into<String>) -> Self {
        self.record.thread = Some(thread.into());
        self
    }

    /// Set [`message`](Record::message).
    pub fn message(mut self, message: impl Into<Cow<'static, str>>) -> Self {
        self.record.message = message.into();
        self
    }

    /// Attach an error as the record's [`exception`](Record::exception).
    pub fn exception<E>(mut self, err: &E) -> Self
    where
        E: std::error::Error + ?Sized,
    {
        self.record.exception = Some(ExceptionInfo::from_error(err));
        self
    }

    /// Capture the current stack as the record's [`stack_info`](Record::stack_info).
    pub fn stack_info(mut self) -> Self {
        self.record.stack_info = Some(Backtrace::force_capture().to_string());
        self
    }

    /// Add an extra field.
    ///
    /// The value is converted to JSON now. A value that cannot be represented in JSON is kept
    /// as the string of the conversion error. A reserved key is silently dropped.
    pub fn extra(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        let key = key.into();
        if is_reserved(&key) {
            return self;
        }
        let value = serde_json::to_value(value).unwrap_or_else(|err| Value::String(err.to_string()));
        self.record.extras.insert(key, value);
        self
    }

    /// Add an extra field in its display form. A reserved key is silently dropped.
    pub fn extra_display(mut self, key: impl Into<String>, value: impl fmt::Display) -> Self {
        let key = key.into();
        if is_reserved(&key) {
            return self;
        }
        self.record
            .extras
            .insert(key, Value::String(value.to_string()));
        self
    }

    /// Invoke the builder and return a `Record`.
    pub fn build(self) -> Record {
        self.record
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[derive(Debug)]
    struct Outer(Inner);

    #[derive(Debug)]
    struct Inner;

    impl fmt::Display for Outer {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("failed to load config")
        }
    }

    impl fmt::Display for Inner {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("file not found")
        }
    }

    impl std::error::Error for Outer {
        fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
            Some(&self.0)
        }
    }

    impl std::error::Error for Inner {}

    #[test]
    fn test_level_order_and_table() {
        assert!(Level::Debug < Level::Info);
        assert!(Level::Info < Level::Warning);
        assert!(Level::Warning < Level::Error);
        assert!(Level::Error < Level::Critical);
        for level in Level::ALL {
            assert_eq!(Level::from_value(level.value()), Some(level));
        }
        assert_eq!(Level::from_value(25), None);
    }

    #[test]
    fn test_level_from_str() {
        assert_eq!("debug".parse::<Level>().unwrap(), Level::Debug);
        assert_eq!("WARNING".parse::<Level>().unwrap(), Level::Warning);
        assert_eq!("Warn".parse::<Level>().unwrap(), Level::Warning);
        assert_eq!("fatal".parse::<Level>().unwrap(), Level::Critical);
        let err = "verbose".parse::<Level>().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidSeverity);
    }

    #[test]
    fn test_reserved_extras_are_dropped() {
        let record = Record::builder()
            .message("hello")
            .extra("message", "shadow")
            .extra("line", 7)
            .extra("user", "alice")
            .extra_display("level", Level::Critical)
            .build();

        assert_eq!(record.message(), "hello");
        assert_eq!(record.extras().len(), 1);
        assert_eq!(record.extras()["user"], Value::from("alice"));
    }

    #[test]
    fn test_unserializable_extra_degrades_to_string() {
        let mut map = HashMap::new();
        map.insert((1, 2), "tuple keys are not JSON object keys");
        let record = Record::builder().extra("weird", map).build();
        assert!(record.extras()["weird"].is_string());
    }

    #[test]
    fn test_exception_chain() {
        let record = Record::builder()
            .level(Level::Error)
            .exception(&Outer(Inner))
            .build();
        let exception = record.exception().unwrap();
        assert_eq!(exception.message(), "failed to load config");
        assert_eq!(exception.causes(), ["file not found".to_string()]);
        assert!(exception
            .to_string()
            .starts_with("failed to load config\n\nCaused by:\n    0: file not found"));
    }

    #[test]
    fn test_atomic_level() {
        let level = AtomicLevel::new(Level::Info);
        assert_eq!(level.load(), Level::Info);
        level.store(Level::Critical);
        assert_eq!(level.load(), Level::Critical);
    }
}
