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

//! Logging macros capturing the call site.
//!
//! Each macro takes the facility first, then optional `key = value` extra fields ended by a
//! semicolon, then the format arguments of the message:
//!
//! ```
//! use logforth_queue::Facility;
//! use logforth_queue::append::Sink;
//! use logforth_queue::append::Testing;
//!
//! let testing = Testing::default();
//! let facility = Facility::builder().sink(Sink::new("memory", testing.clone())).build();
//!
//! logforth_queue::info!(facility, host = "db1", attempt = 3; "connected after {} retries", 2);
//! logforth_queue::debug!(facility, "plain message");
//! facility.shutdown();
//!
//! assert_eq!(testing.lines().len(), 2);
//! ```

/// Log a record at the given level.
#[macro_export]
macro_rules! log {
    ($facility:expr, $level:expr, $($key:ident = $value:expr),+ ; $($arg:tt)+) => {{
        let level = $level;
        if $facility.enabled(level) {
            let record = $crate::__record!(level, $($arg)+)
                $(.extra(::std::stringify!($key), &$value))+
                .build();
            $facility.log(record);
        }
    }};
    ($facility:expr, $level:expr, $($arg:tt)+) => {{
        let level = $level;
        if $facility.enabled(level) {
            let record = $crate::__record!(level, $($arg)+).build();
            $facility.log(record);
        }
    }};
}

/// Log a record at [`Level::Debug`](crate::Level::Debug).
#[macro_export]
macro_rules! debug {
    ($facility:expr, $($arg:tt)+) => {
        $crate::log!($facility, $crate::Level::Debug, $($arg)+)
    };
}

/// Log a record at [`Level::Info`](crate::Level::Info).
#[macro_export]
macro_rules! info {
    ($facility:expr, $($arg:tt)+) => {
        $crate::log!($facility, $crate::Level::Info, $($arg)+)
    };
}

/// Log a record at [`Level::Warning`](crate::Level::Warning).
#[macro_export]
macro_rules! warning {
    ($facility:expr, $($arg:tt)+) => {
        $crate::log!($facility, $crate::Level::Warning, $($arg)+)
    };
}

/// Log a record at [`Level::Error`](crate::Level::Error).
#[macro_export]
macro_rules! error {
    ($facility:expr, $($arg:tt)+) => {
        $crate::log!($facility, $crate::Level::Error, $($arg)+)
    };
}

/// Log a record at [`Level::Critical`](crate::Level::Critical).
#[macro_export]
macro_rules! critical {
    ($facility:expr, $($arg:tt)+) => {
        $crate::log!($facility, $crate::Level::Critical, $($arg)+)
    };
}

/// Log an error at [`Level::Error`](crate::Level::Error) with its cause chain attached.
///
/// ```
/// use logforth_queue::Facility;
/// use logforth_queue::append::Sink;
///
/// let facility = Facility::builder().sink(Sink::console("stdout")).build();
/// if let Err(err) = "x".parse::<i32>() {
///     logforth_queue::exception!(facility, err, "failed to parse input");
/// }
/// ```
#[macro_export]
macro_rules! exception {
    ($facility:expr, $err:expr, $($arg:tt)+) => {{
        let level = $crate::Level::Error;
        if $facility.enabled(level) {
            let record = $crate::__record!(level, $($arg)+).exception(&$err).build();
            $facility.log(record);
        }
    }};
}

#[doc(hidden)]
#[macro_export]
macro_rules! __record {
    ($level:expr, $($arg:tt)+) => {
        $crate::Record::builder()
            .level($level)
            .target(::std::module_path!())
            .module(::std::module_path!())
            .function($crate::__function!())
            .file(::std::file!())
            .line(::std::line!())
            .message(::std::format!($($arg)+))
    };
}

/// The name of the enclosing function.
#[doc(hidden)]
#[macro_export]
macro_rules! __function {
    () => {{
        fn f() {}
        fn type_name_of<T>(_: T) -> &'static str {
            ::std::any::type_name::<T>()
        }
        $crate::macros::function_name(type_name_of(f))
    }};
}

/// Strip the path and closure suffixes from the type name of a function item nested in the
/// function of interest.
#[doc(hidden)]
pub fn function_name(type_name: &'static str) -> &'static str {
    let mut name = type_name.strip_suffix("::f").unwrap_or(type_name);
    while let Some(outer) = name.strip_suffix("::{{closure}}") {
        name = outer;
    }
    name.rsplit("::").next().unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_function_name() {
        assert_eq!(function_name("app::db::connect::f"), "connect");
        assert_eq!(function_name("app::db::connect::{{closure}}::f"), "connect");
        assert_eq!(function_name("main::f"), "main");
        assert_eq!(__function!(), "test_function_name");
    }
}
