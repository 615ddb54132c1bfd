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

use std::fs;
use std::fs::OpenOptions;
use std::io::BufReader;
use std::io::Write;

use logforth_queue::ErrorKind;
use logforth_queue::Facility;
use logforth_queue::Level;
use logforth_queue::Record;
use logforth_queue::append::RollingFileBuilder;
use logforth_queue::append::Sink;
use logforth_queue::layout::JsonLayout;
use logforth_queue::reader::Reader;
use logforth_queue::trap::CollectingTrap;
use serde_json::Value;
use tempfile::TempDir;

fn record(level: Level, function: &'static str, line: u32, message: &'static str) -> Record {
    Record::builder()
        .level(level)
        .module("billing::invoice")
        .function(function)
        .line(line)
        .message(message)
        .build()
}

#[test]
fn test_reader_skips_corrupt_line() {
    let temp_dir = TempDir::new().expect("failed to create a temporary directory");
    let path = temp_dir.path().join("log.jsonl");

    let file = RollingFileBuilder::new(&path).build().unwrap();
    let facility = Facility::builder().sink(Sink::new("file", file)).build();
    facility.log(record(Level::Debug, "load", 10, "loading invoices"));
    facility.log(record(Level::Warning, "total", 27, "negative total"));
    facility.shutdown();

    // a partially written line, as left behind by a crash
    let mut file = OpenOptions::new().append(true).open(&path).unwrap();
    file.write_all(b"{\"level\":\"ERROR\",\"mess\n").unwrap();
    drop(file);

    let file = RollingFileBuilder::new(&path).build().unwrap();
    let facility = Facility::builder().sink(Sink::new("file", file)).build();
    facility.log(record(Level::Error, "send", 88, "smtp refused"));
    facility.log(record(Level::Critical, "send", 91, "giving up"));
    facility.shutdown();

    let trap = CollectingTrap::default();
    let mut out = vec![];
    let summary = Reader::new("WARNING")
        .unwrap()
        .render(BufReader::new(fs::File::open(&path).unwrap()), &mut out, &trap)
        .unwrap();

    assert_eq!(summary.rendered, 3);
    assert_eq!(summary.filtered, 1);
    assert_eq!(summary.skipped, 1);
    assert_eq!(trap.count(ErrorKind::Parse), 1);
    assert!(trap.errors()[0].1.contains("line: 3"));

    insta::assert_snapshot!(String::from_utf8(out).unwrap(), @r"
    [WARNING|billing::invoice|total|27] negative total
    [ERROR|billing::invoice|send|88] smtp refused
    [CRITICAL|billing::invoice|send|91] giving up
    ");
}

#[test]
fn test_format_then_parse_preserves_fields() {
    let layout = JsonLayout::default();
    let record = Record::builder()
        .level(Level::Error)
        .module("billing::invoice")
        .function("send")
        .line(88)
        .message("smtp refused")
        .extra("retries", 3)
        .extra("recipients", vec!["a@example.com", "b@example.com"])
        .extra("message", "shadowed")
        .exception(&std::io::Error::other("connection reset"))
        .build();

    let line: Value = serde_json::from_str(&layout.format(&record)).unwrap();
    assert_eq!(line["level"], "ERROR");
    assert_eq!(line["message"], "smtp refused");
    assert_eq!(line["module"], "billing::invoice");
    assert_eq!(line["function"], "send");
    assert_eq!(line["line"], 88);
    assert_eq!(line["retries"], 3);
    assert_eq!(line["recipients"][1], "b@example.com");
    assert!(line["exc_info"].as_str().unwrap().starts_with("connection reset"));

    let timestamp: jiff::Timestamp = line["timestamp"].as_str().unwrap().parse().unwrap();
    assert_eq!(
        timestamp.as_microsecond(),
        record.time().as_microsecond()
    );
}
