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

use std::str::FromStr;

use jiff::Timestamp;
use jiff::tz::Offset;
use serde_json::Map;
use serde_json::Value;

use crate::Error;
use crate::layout::Layout;
use crate::record::Record;
use crate::record::is_reserved;

/// An attribute of a [`Record`] that can be selected into a JSON line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attribute {
    /// The message body.
    Message,
    /// The observed time, in UTC.
    Timestamp,
    /// The rendered exception.
    ExcInfo,
    /// The rendered stack of the call site.
    StackInfo,
    /// The severity name.
    Level,
    /// The severity number.
    LevelNo,
    /// The target.
    Target,
    /// The module path.
    Module,
    /// The enclosing function.
    Function,
    /// The source file.
    File,
    /// The source line.
    Line,
    /// The thread name.
    Thread,
}

impl Attribute {
    // The attributes computed for every record, whether selected or not.
    fn always_key(&self) -> Option<&'static str> {
        match self {
            Attribute::Message => Some("message"),
            Attribute::Timestamp => Some("timestamp"),
            Attribute::ExcInfo => Some("exc_info"),
            Attribute::StackInfo => Some("stack_info"),
            _ => None,
        }
    }

    fn resolve(&self, record: &Record) -> Value {
        match self {
            Attribute::Message => Value::from(record.message()),
            Attribute::Timestamp => Value::from(format_timestamp(record.time())),
            Attribute::ExcInfo => record
                .exception()
                .map_or(Value::Null, |e| Value::from(e.to_string())),
            Attribute::StackInfo => record.stack_info().map_or(Value::Null, Value::from),
            Attribute::Level => Value::from(record.level().as_str()),
            Attribute::LevelNo => Value::from(record.level().value()),
            Attribute::Target => Value::from(record.target()),
            Attribute::Module => record.module().map_or(Value::Null, Value::from),
            Attribute::Function => record.function().map_or(Value::Null, Value::from),
            Attribute::File => record.file().map_or(Value::Null, Value::from),
            Attribute::Line => record.line().map_or(Value::Null, Value::from),
            Attribute::Thread => record.thread().map_or(Value::Null, Value::from),
        }
    }
}

impl FromStr for Attribute {
    type Err = Error;

    /// Parse an attribute name. The common aliases `levelname`, `funcName`, `lineno` and
    /// friends are accepted too.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let attribute = match s {
            "message" | "msg" => Attribute::Message,
            "timestamp" | "created" | "asctime" => Attribute::Timestamp,
            "exc_info" => Attribute::ExcInfo,
            "stack_info" => Attribute::StackInfo,
            "level" | "levelname" => Attribute::Level,
            "levelno" => Attribute::LevelNo,
            "target" | "name" => Attribute::Target,
            "module" => Attribute::Module,
            "function" | "funcName" => Attribute::Function,
            "file" | "filename" | "pathname" => Attribute::File,
            "line" | "lineno" => Attribute::Line,
            "thread" | "threadName" | "thread_name" => Attribute::Thread,
            _ => {
                return Err(Error::configuration(format!("unknown record attribute: {s:?}")));
            }
        };
        Ok(attribute)
    }
}

/// A JSON layout for formatting log records, one object per line.
///
/// Output format with the default field selection:
///
/// ```json
/// {"level":"ERROR","message":"Hello error!","timestamp":"2024-08-11T14:44:57.172051+00:00","module":"app","function":"main","line":51}
/// {"level":"INFO","message":"Hello info!","timestamp":"2024-08-11T14:44:57.172246+00:00","module":"app","function":"main","line":53,"user":"alice"}
/// ```
///
/// The selected fields come first in selection order, then `message`, `timestamp`, `exc_info`
/// and `stack_info` if they were not selected, then every extra field in key order.
///
/// # Examples
///
/// ```
/// use logforth_queue::layout::JsonLayout;
///
/// let layout = JsonLayout::empty()
///     .field("level", "levelname")
///     .unwrap()
///     .field("logger", "name")
///     .unwrap();
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonLayout {
    fields: Vec<(String, Attribute)>,
}

impl Default for JsonLayout {
    fn default() -> Self {
        Self {
            fields: vec![
                ("level".to_string(), Attribute::Level),
                ("message".to_string(), Attribute::Message),
                ("timestamp".to_string(), Attribute::Timestamp),
                ("module".to_string(), Attribute::Module),
                ("function".to_string(), Attribute::Function),
                ("line".to_string(), Attribute::Line),
            ],
        }
    }
}

impl JsonLayout {
    /// Create a layout that selects no field; only the always-present ones and the extras are
    /// written.
    pub fn empty() -> Self {
        Self { fields: vec![] }
    }

    /// Select the record attribute named `attribute` under the output key `key`.
    ///
    /// Selecting an existing key again replaces its attribute in place.
    pub fn field(mut self, key: impl Into<String>, attribute: &str) -> Result<Self, Error> {
        let key = key.into();
        let attribute = attribute
            .parse::<Attribute>()
            .map_err(|err| err.with_context("key", &key))?;
        match self.fields.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = attribute,
            None => self.fields.push((key, attribute)),
        }
        Ok(self)
    }

    /// The selected `(output key, attribute)` pairs, in output order.
    pub fn fields(&self) -> &[(String, Attribute)] {
        &self.fields
    }

    /// Format a record as one JSON object without a trailing newline.
    ///
    /// This never fails: every value in a record is JSON already.
    pub fn format(&self, record: &Record) -> String {
        let mut always = vec![
            ("message", Attribute::Message.resolve(record)),
            ("timestamp", Attribute::Timestamp.resolve(record)),
        ];
        if record.exception().is_some() {
            always.push(("exc_info", Attribute::ExcInfo.resolve(record)));
        }
        if record.stack_info().is_some() {
            always.push(("stack_info", Attribute::StackInfo.resolve(record)));
        }

        let mut line = Map::new();
        for (key, attribute) in &self.fields {
            let taken = attribute.always_key().and_then(|name| {
                let pos = always.iter().position(|(k, _)| *k == name)?;
                Some(always.remove(pos).1)
            });
            let value = taken.unwrap_or_else(|| attribute.resolve(record));
            line.insert(key.clone(), value);
        }

        for (key, value) in always {
            line.insert(key.to_string(), value);
        }

        for (key, value) in record.extras() {
            if !is_reserved(key) {
                line.insert(key.clone(), value.clone());
            }
        }

        Value::Object(line).to_string()
    }
}

impl From<JsonLayout> for Layout {
    fn from(layout: JsonLayout) -> Self {
        Layout::Json(layout)
    }
}

pub(crate) fn format_timestamp(ts: Timestamp) -> String {
    format!("{:.6}", ts.display_with_offset(Offset::UTC))
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;
    use crate::Level;

    fn fixed_record() -> Record {
        Record::builder()
            .time("2024-08-11T14:44:57.172051Z".parse().unwrap())
            .level(Level::Info)
            .target("app")
            .module("app::db")
            .function("connect")
            .line(42)
            .message("connected")
            .extra("host", "db1")
            .extra("attempt", 3)
            .build()
    }

    #[test]
    fn test_default_layout() {
        let line = JsonLayout::default().format(&fixed_record());
        insta::assert_snapshot!(line, @r#"{"level":"INFO","message":"connected","timestamp":"2024-08-11T14:44:57.172051+00:00","module":"app::db","function":"connect","line":42,"attempt":3,"host":"db1"}"#);
    }

    #[test]
    fn test_empty_layout_keeps_always_fields_and_extras() {
        let line = JsonLayout::empty().format(&fixed_record());
        assert_eq!(
            line,
            r#"{"message":"connected","timestamp":"2024-08-11T14:44:57.172051+00:00","attempt":3,"host":"db1"}"#
        );
    }

    #[test]
    fn test_aliased_fields_and_renaming() {
        let layout = JsonLayout::empty()
            .field("msg", "message")
            .unwrap()
            .field("logger", "name")
            .unwrap()
            .field("lvl", "levelno")
            .unwrap();
        let line = layout.format(&fixed_record());
        let value: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["msg"], "connected");
        assert_eq!(value["logger"], "app");
        assert_eq!(value["lvl"], 20);
        // selected always-fields are not duplicated under their own name
        assert!(value.get("message").is_none());
        assert_eq!(value["timestamp"], "2024-08-11T14:44:57.172051+00:00");
    }

    #[test]
    fn test_unknown_attribute_is_rejected() {
        let err = JsonLayout::empty().field("x", "no_such_attribute").unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Configuration);
        assert_eq!(err.context("key"), Some("x"));
    }

    #[test]
    fn test_exception_is_rendered() {
        let record = Record::builder()
            .level(Level::Error)
            .message("exception message")
            .exception(&io::Error::other("division by zero"))
            .build();
        let line = JsonLayout::default().format(&record);
        assert!(!line.contains('\n'));
        let value: Value = serde_json::from_str(&line).unwrap();
        assert!(value["exc_info"]
            .as_str()
            .unwrap()
            .starts_with("division by zero"));
    }

    #[test]
    fn test_selected_missing_attributes_render_null() {
        let record = Record::builder().message("bare").build();
        let layout = JsonLayout::default().field("exc", "exc_info").unwrap();
        let value: Value = serde_json::from_str(&layout.format(&record)).unwrap();
        assert_eq!(value["module"], Value::Null);
        assert_eq!(value["line"], Value::Null);
        assert_eq!(value["exc"], Value::Null);
    }
}
