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

//! Facility configuration.
//!
//! A [`Config`] is a plain serde structure. Each sink definition is kept as raw JSON until the
//! facility is built, so one malformed sink does not prevent the others from being created.
//!
//! ```
//! use logforth_queue::config::Config;
//!
//! let config = Config::from_json(
//!     r#"{
//!         "fields": {"level": "levelname", "message": "message", "timestamp": "timestamp"},
//!         "sinks": {
//!             "stdout": {"kind": "console", "level": "DEBUG", "filters": ["non_error"]},
//!             "stderr": {"kind": "console", "stream": "stderr", "level": "WARNING"}
//!         }
//!     }"#,
//! )
//! .unwrap();
//! assert_eq!(config.sinks().count(), 2);
//! ```

use std::path::PathBuf;

use serde::Deserialize;
use serde_json::Map;
use serde_json::Value;

use crate::Error;
use crate::Level;
use crate::append::Console;
use crate::append::RollingFileBuilder;
use crate::append::Sink;
use crate::append::Stream;
use crate::dispatch::Overflow;
use crate::filter::Filter;
use crate::layout::JsonLayout;
use crate::layout::TextLayout;

/// The configuration of a facility.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Output key to record attribute, in output order. Absent means the default JSON fields.
    fields: Option<Map<String, Value>>,
    /// Sink name to sink definition.
    sinks: Map<String, Value>,
    queue: QueueConfig,
}

/// The queue settings of a facility.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QueueConfig {
    /// Name of the worker thread.
    pub thread_name: Option<String>,
    /// Bound of the queue; unbounded when absent.
    pub capacity: Option<usize>,
    /// What to do with a record when a bounded queue is full.
    pub overflow: Overflow,
}

impl Config {
    /// Parse a configuration from JSON text.
    pub fn from_json(json: &str) -> Result<Config, Error> {
        serde_json::from_str(json).map_err(|err| {
            Error::configuration("failed to parse logging configuration").with_source(err)
        })
    }

    /// The configured sink definitions, in configuration order.
    pub fn sinks(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.sinks.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn queue(&self) -> &QueueConfig {
        &self.queue
    }

    /// Build the JSON layout from `fields`. An invalid entry is reported and skipped.
    pub(crate) fn layout(&self, errors: &mut Vec<Error>) -> JsonLayout {
        let Some(fields) = &self.fields else {
            return JsonLayout::default();
        };

        let mut layout = JsonLayout::empty();
        for (key, attribute) in fields {
            let Some(attribute) = attribute.as_str() else {
                errors.push(
                    Error::configuration("field attribute must be a string")
                        .with_context("key", key),
                );
                continue;
            };
            match layout.clone().field(key.as_str(), attribute) {
                Ok(extended) => layout = extended,
                Err(err) => errors.push(err),
            }
        }
        layout
    }

    /// Build every valid sink. An invalid definition is reported and skipped.
    pub(crate) fn build_sinks(&self, errors: &mut Vec<Error>) -> Vec<Sink> {
        let mut sinks = vec![];
        for (name, value) in &self.sinks {
            match build_sink(name, value) {
                Ok(sink) => sinks.push(sink),
                Err(err) => errors.push(err.with_context("sink", name)),
            }
        }
        sinks
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum SinkKindConfig {
    Console,
    RotatingFile,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum LayoutConfig {
    Json,
    Text,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FilterConfig {
    Named(String),
    MaxLevel { max_level: String },
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SinkConfig {
    kind: SinkKindConfig,
    #[serde(default)]
    level: Option<String>,
    #[serde(default)]
    stream: Option<Stream>,
    #[serde(default)]
    filters: Vec<FilterConfig>,
    #[serde(default)]
    layout: Option<LayoutConfig>,
    #[serde(default)]
    path: Option<PathBuf>,
    #[serde(default)]
    max_bytes: u64,
    #[serde(default)]
    backup_count: usize,
}

fn build_sink(name: &str, value: &Value) -> Result<Sink, Error> {
    let config = SinkConfig::deserialize(value).map_err(|err| {
        Error::configuration("invalid sink definition").with_source(err)
    })?;

    let mut sink = match config.kind {
        SinkKindConfig::Console => {
            let stream = config.stream.unwrap_or_default();
            Sink::new(name, Console::new(stream))
        }
        SinkKindConfig::RotatingFile => {
            let path = config
                .path
                .ok_or_else(|| Error::configuration("rotating file sink requires a path"))?;
            let file = RollingFileBuilder::new(path)
                .max_bytes(config.max_bytes)
                .backup_count(config.backup_count)
                .build()
                .map_err(|err| Error::configuration("failed to open log file").with_source(err))?;
            Sink::new(name, file)
        }
    };

    if let Some(level) = config.level {
        sink = sink.with_level(parse_level(&level)?);
    }
    for filter in config.filters {
        sink = sink.with_filter(build_filter(filter)?);
    }
    if let Some(LayoutConfig::Text) = config.layout {
        sink = sink.with_layout(TextLayout::default());
    }
    Ok(sink)
}

fn build_filter(filter: FilterConfig) -> Result<Filter, Error> {
    match filter {
        FilterConfig::Named(name) if name == "non_error" => Ok(Filter::non_error()),
        FilterConfig::Named(name) => {
            Err(Error::configuration("unknown filter").with_context("filter", name))
        }
        FilterConfig::MaxLevel { max_level } => Ok(Filter::MaxLevel(parse_level(&max_level)?)),
    }
}

fn parse_level(level: &str) -> Result<Level, Error> {
    level
        .parse()
        .map_err(|err| Error::configuration("invalid severity").with_source(err))
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::ErrorKind;
    use crate::append::SinkKind;

    #[test]
    fn test_builds_valid_sinks_and_reports_the_rest() {
        let temp_dir = TempDir::new().expect("failed to create a temporary directory");
        let path = temp_dir.path().join("logs").join("log.jsonl");
        let json = serde_json::json!({
            "sinks": {
                "stdout": {"kind": "console", "level": "debug", "filters": ["non_error"]},
                "stderr": {"kind": "console", "stream": "stderr", "level": "LOUD"},
                "file": {"kind": "rotating_file", "level": "WARNING", "path": path,
                         "max_bytes": 10000, "backup_count": 3},
                "pipe": {"kind": "socket"},
                "gauge": {"kind": "console", "filters": [{"max_level": "warn"}], "layout": "text"}
            }
        });
        let config: Config = serde_json::from_value(json).unwrap();

        let mut errors = vec![];
        let sinks = config.build_sinks(&mut errors);
        let names: Vec<_> = sinks.iter().map(|s| s.name()).collect();
        assert_eq!(names, ["stdout", "file", "gauge"]);
        assert_eq!(sinks[1].kind(), SinkKind::RollingFile);
        assert_eq!(sinks[1].min_level(), Level::Warning);
        assert!(path.exists());
        assert!(sinks[2].layout().is_some());

        assert_eq!(errors.len(), 2);
        assert!(errors.iter().all(|e| e.kind() == ErrorKind::Configuration));
        assert_eq!(errors[0].context("sink"), Some("stderr"));
        assert_eq!(errors[1].context("sink"), Some("pipe"));
    }

    #[test]
    fn test_fields_keep_configuration_order() {
        let config = Config::from_json(
            r#"{"fields": {"lvl": "levelname", "msg": "message", "bad": "colour", "n": 3}}"#,
        )
        .unwrap();

        let mut errors = vec![];
        let layout = config.layout(&mut errors);
        let keys: Vec<_> = layout.fields().iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, ["lvl", "msg"]);
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_queue_settings() {
        let config = Config::from_json(
            r#"{"queue": {"thread_name": "log-worker", "capacity": 16, "overflow": "drop_incoming"}}"#,
        )
        .unwrap();
        assert_eq!(config.queue().thread_name.as_deref(), Some("log-worker"));
        assert_eq!(config.queue().capacity, Some(16));
        assert_eq!(config.queue().overflow, Overflow::DropIncoming);

        let err = Config::from_json("{").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }
}
