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

//! Filters for log records.
//!
//! A sink drops a record below its minimum level before any filter runs. Filters then narrow
//! what the sink accepts further, e.g. keep errors off a stdout sink that is paired with a
//! stderr one.

use std::fmt;

use crate::Level;
use crate::record::Record;

/// The result of a filter check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterResult {
    /// The record will be processed without further filtering.
    Accept,
    /// The record should not be processed.
    Reject,
    /// No decision could be made, further filtering should occur.
    Neutral,
}

/// Represents a filter that can be applied to log records.
#[derive(Debug)]
pub enum Filter {
    /// Reject records more severe than the given level.
    MaxLevel(Level),
    /// A custom filter.
    Custom(CustomFilter),
}

impl Filter {
    /// Reject every record above [`Level::Info`], so only non-error severities pass.
    pub fn non_error() -> Self {
        Filter::MaxLevel(Level::Info)
    }

    pub(crate) fn matches(&self, record: &Record) -> FilterResult {
        match self {
            Filter::MaxLevel(level) => {
                if record.level() <= *level {
                    FilterResult::Neutral
                } else {
                    FilterResult::Reject
                }
            }
            Filter::Custom(filter) => filter.matches(record),
        }
    }
}

/// Run `filters` in order; the first decisive result wins.
pub(crate) fn accepts(filters: &[Filter], record: &Record) -> bool {
    for filter in filters {
        match filter.matches(record) {
            FilterResult::Reject => return false,
            FilterResult::Accept => return true,
            FilterResult::Neutral => {}
        }
    }

    true
}

/// A filter that you can pass the custom filter function.
///
/// The custom filter function accepts [`&Record`][Record] and returns the [`FilterResult`].
/// For example:
///
/// ```rust
/// use logforth_queue::filter::CustomFilter;
/// use logforth_queue::filter::FilterResult;
/// use logforth_queue::record::Record;
///
/// let filter = CustomFilter::new(|record: &Record| {
///     if record.target() == "noisy" {
///         FilterResult::Reject
///     } else {
///         FilterResult::Neutral
///     }
/// });
/// ```
pub struct CustomFilter {
    f: Box<dyn Fn(&Record) -> FilterResult + Send + Sync + 'static>,
}

impl fmt::Debug for CustomFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CustomFilter {{ ... }}")
    }
}

impl CustomFilter {
    pub fn new(filter: impl Fn(&Record) -> FilterResult + Send + Sync + 'static) -> Self {
        CustomFilter {
            f: Box::new(filter),
        }
    }

    fn matches(&self, record: &Record) -> FilterResult {
        (self.f)(record)
    }
}

impl From<CustomFilter> for Filter {
    fn from(filter: CustomFilter) -> Self {
        Filter::Custom(filter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(level: Level, target: &'static str) -> Record {
        Record::builder().level(level).target(target).build()
    }

    #[test]
    fn test_non_error_filter() {
        let filters = [Filter::non_error()];
        assert!(accepts(&filters, &record(Level::Debug, "app")));
        assert!(accepts(&filters, &record(Level::Info, "app")));
        assert!(!accepts(&filters, &record(Level::Warning, "app")));
        assert!(!accepts(&filters, &record(Level::Critical, "app")));
    }

    #[test]
    fn test_first_decisive_filter_wins() {
        let filters = [
            CustomFilter::new(|r: &Record| {
                if r.target() == "audit" {
                    FilterResult::Accept
                } else {
                    FilterResult::Neutral
                }
            })
            .into(),
            Filter::non_error(),
        ];
        assert!(accepts(&filters, &record(Level::Error, "audit")));
        assert!(!accepts(&filters, &record(Level::Error, "app")));
    }
}
