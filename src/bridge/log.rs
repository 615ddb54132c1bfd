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

//! A bridge to forward records of the `log` crate to a [`Facility`].
//!
//! Key-values attached with the `kv` syntax become extra fields:
//!
//! ```
//! use std::sync::Arc;
//!
//! use logforth_queue::ExitGuard;
//! use logforth_queue::Facility;
//! use logforth_queue::append::Sink;
//!
//! let facility = Arc::new(Facility::builder().sink(Sink::console("stdout")).build());
//! facility.start().unwrap();
//! let _guard = ExitGuard::new(facility.clone());
//!
//! if let Err(err) = logforth_queue::bridge::log::try_setup_log_crate(facility) {
//!     eprintln!("failed to setup log crate: {err}");
//! }
//! log::info!(attempt = 3; "connected");
//! ```

use std::sync::Arc;

use log::kv;
use serde_json::Value;

use crate::ErrorKind;
use crate::Facility;
use crate::Level;
use crate::record::Record;

/// A [`log::Log`] implementation feeding a shared [`Facility`].
#[derive(Debug)]
pub struct LogBridge {
    facility: Arc<Facility>,
}

impl LogBridge {
    pub fn new(facility: Arc<Facility>) -> Self {
        Self { facility }
    }

    fn convert(&self, record: &log::Record) -> Record {
        let mut builder = Record::builder()
            .level(record.level().into())
            .target(record.target().to_string());

        if let Some(module) = record.module_path_static() {
            builder = builder.module(module);
        } else if let Some(module) = record.module_path() {
            builder = builder.module(module.to_string());
        }
        if let Some(file) = record.file_static() {
            builder = builder.file(file);
        } else if let Some(file) = record.file() {
            builder = builder.file(file.to_string());
        }
        if let Some(line) = record.line() {
            builder = builder.line(line);
        }

        builder = match record.args().as_str() {
            Some(message) => builder.message(message),
            None => builder.message(record.args().to_string()),
        };

        let mut extras = ExtraCollector(vec![]);
        // the collector never fails
        let _ = record.key_values().visit(&mut extras);
        for (key, value) in extras.0 {
            builder = builder.extra(key, value);
        }

        builder.build()
    }
}

impl log::Log for LogBridge {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        self.facility.enabled(Level::from(metadata.level()))
    }

    fn log(&self, record: &log::Record) {
        if self.enabled(record.metadata()) {
            self.facility.log(self.convert(record));
        }
    }

    fn flush(&self) {
        if let Err(err) = self.facility.flush() {
            if err.kind() != ErrorKind::Shutdown {
                self.facility.trap().trap(&err);
            }
        }
    }
}

struct ExtraCollector(Vec<(String, Value)>);

impl<'kvs> kv::VisitSource<'kvs> for ExtraCollector {
    fn visit_pair(&mut self, key: kv::Key<'kvs>, value: kv::Value<'kvs>) -> Result<(), kv::Error> {
        self.0.push((key.as_str().to_string(), to_json(&value)));
        Ok(())
    }
}

fn to_json(value: &kv::Value) -> Value {
    if let Some(b) = value.to_bool() {
        Value::Bool(b)
    } else if let Some(n) = value.to_i64() {
        Value::from(n)
    } else if let Some(n) = value.to_u64() {
        Value::from(n)
    } else if let Some(n) = value.to_f64() {
        Value::from(n)
    } else if let Some(s) = value.to_borrowed_str() {
        Value::String(s.to_string())
    } else {
        Value::String(value.to_string())
    }
}

/// Install a [`LogBridge`] for `facility` as the `log` crate global logger.
///
/// This function will set the global maximum log level to `Trace`. Records are still filtered
/// by the levels of the facility's sinks.
///
/// # Errors
///
/// Return an error if the log crate global logger has already been set.
pub fn try_setup_log_crate(facility: Arc<Facility>) -> Result<(), log::SetLoggerError> {
    log::set_boxed_logger(Box::new(LogBridge::new(facility)))?;
    log::set_max_level(log::LevelFilter::Trace);
    Ok(())
}
