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

use std::sync::Arc;

use logforth_queue::ExitGuard;
use logforth_queue::Facility;
use logforth_queue::Level;
use logforth_queue::append::Sink;
use logforth_queue::append::Testing;
use serde_json::Value;

#[test]
fn test_log_crate_reaches_facility() {
    let testing = Testing::default();
    let facility = Arc::new(
        Facility::builder()
            .sink(Sink::new("memory", testing.clone()).with_level(Level::Info))
            .build(),
    );
    facility.start().unwrap();
    let guard = ExitGuard::new(facility.clone());

    logforth_queue::bridge::log::try_setup_log_crate(facility).unwrap();
    assert!(!log::log_enabled!(log::Level::Debug));

    log::debug!("not delivered");
    log::warn!(user = "alice", attempts = 3; "login throttled");
    log::logger().flush();

    let lines = testing.lines();
    assert_eq!(lines.len(), 1);
    let line: Value = serde_json::from_str(&lines[0]).unwrap();
    assert_eq!(line["level"], "WARNING");
    assert_eq!(line["message"], "login throttled");
    assert_eq!(line["module"], "log_bridge");
    assert_eq!(line["user"], "alice");
    assert_eq!(line["attempts"], 3);

    drop(guard);
    log::info!("after shutdown");
    assert_eq!(testing.lines().len(), 1);
}
