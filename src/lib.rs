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

//! A queued structured logging facility.
//!
//! Logging calls build a [`Record`] and push it onto a queue; one background worker formats
//! each record and writes it to every [`Sink`](append::Sink) that accepts it. Records are
//! written as JSON lines by default, files are rotated by size, and the [`reader`] renders a
//! written file back as a severity-filtered human view.
//!
//! # Examples
//!
//! Console and rotating file sinks with their own thresholds:
//!
//! ```
//! use logforth_queue::Facility;
//! use logforth_queue::Level;
//! use logforth_queue::append::RollingFileBuilder;
//! use logforth_queue::append::Sink;
//!
//! let dir = tempfile::tempdir().unwrap();
//! let file = RollingFileBuilder::new(dir.path().join("log.jsonl"))
//!     .max_bytes(1024 * 1024)
//!     .backup_count(3)
//!     .build()
//!     .unwrap();
//!
//! let facility = Facility::builder()
//!     .sink(Sink::console("stdout").with_level(Level::Debug))
//!     .sink(Sink::new("file", file).with_level(Level::Warning))
//!     .build();
//! facility.start().unwrap();
//!
//! logforth_queue::info!(facility, user = "alice"; "signed in");
//! logforth_queue::warning!(facility, "disk usage at {}%", 91);
//!
//! facility.set_console_level("ERROR").unwrap();
//! facility.shutdown();
//! ```
//!
//! From a configuration:
//!
//! ```
//! use logforth_queue::Facility;
//! use logforth_queue::config::Config;
//!
//! let config = Config::from_json(
//!     r#"{"sinks": {"stderr": {"kind": "console", "stream": "stderr", "level": "WARNING"}}}"#,
//! )
//! .unwrap();
//! let facility = Facility::from_config(&config);
//! assert!(facility.config_errors().is_empty());
//! ```

#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod append;
pub mod bridge;
pub mod config;
pub mod filter;
pub mod layout;
pub mod reader;
pub mod record;
pub mod trap;

#[doc(hidden)]
pub mod macros;

mod dispatch;
mod error;
mod facility;

pub use self::append::Append;
pub use self::dispatch::DispatchState;
pub use self::dispatch::Overflow;
pub use self::error::Error;
pub use self::error::ErrorKind;
pub use self::facility::ExitGuard;
pub use self::facility::Facility;
pub use self::facility::FacilityBuilder;
pub use self::facility::LOG_FILE_EXTENSION;
pub use self::filter::Filter;
pub use self::layout::Layout;
pub use self::record::Level;
pub use self::record::Record;
pub use self::trap::Trap;
