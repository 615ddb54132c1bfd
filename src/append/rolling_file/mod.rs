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

//! Appender for writing log lines to size-rotated files.
//!
//! # Example
//!
//!```
//! use logforth_queue::append::RollingFileBuilder;
//!
//! let dir = tempfile::tempdir().unwrap();
//! let file = RollingFileBuilder::new(dir.path().join("app.jsonl"))
//!     .max_bytes(5 * 1024 * 1024)
//!     .backup_count(3)
//!     .build()
//!     .unwrap();
//! assert!(file.path().ends_with("app.jsonl"));
//! ```

pub use append::RollingFile;
pub use append::RollingFileBuilder;
pub use rolling::RollingFileWriter;
pub use rolling::RollingFileWriterBuilder;

mod append;
mod rolling;
