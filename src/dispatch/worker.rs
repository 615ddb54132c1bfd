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

use crossbeam_channel::Receiver;
use crossbeam_channel::TryRecvError;

use crate::Trap;
use crate::append::Sink;
use crate::dispatch::Control;
use crate::dispatch::Task;
use crate::dispatch::state::AtomicState;
use crate::dispatch::state::DispatchState;
use crate::record::Record;

pub(crate) struct Worker {
    receiver: Receiver<Task>,
    sinks: Arc<[Sink]>,
    trap: Arc<dyn Trap>,
    state: Arc<AtomicState>,
}

impl Worker {
    pub(crate) fn new(
        receiver: Receiver<Task>,
        sinks: Arc<[Sink]>,
        trap: Arc<dyn Trap>,
        state: Arc<AtomicState>,
    ) -> Self {
        Self {
            receiver,
            sinks,
            trap,
            state,
        }
    }

    pub(crate) fn run(self) {
        while let Ok(task) = self.receiver.recv() {
            match task {
                Task::Shutdown => break,
                task => self.handle(task),
            }
        }

        self.drain();
    }

    /// Deliver whatever is queued right now, in order.
    pub(crate) fn deliver_pending(&self) {
        loop {
            match self.receiver.try_recv() {
                Ok(Task::Shutdown) => {}
                Ok(task) => self.handle(task),
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
    }

    /// Deliver whatever is still queued and flush every sink.
    pub(crate) fn drain(&self) {
        self.state.store(DispatchState::Draining);
        self.deliver_pending();
        self.flush_all();
    }

    /// Close every sink. Later writes to a closed file sink fail.
    pub(crate) fn close_all(&self) {
        for sink in self.sinks.iter() {
            if let Err(err) = sink.close() {
                self.trap.trap(&err);
            }
        }
    }

    fn handle(&self, task: Task) {
        match task {
            Task::Log(record) => self.deliver(&record),
            Task::Control { control, done } => {
                let result = control.apply(&self.sinks, self.trap.as_ref());
                // the caller may have given up waiting
                let _ = done.send(result);
            }
            Task::Shutdown => {}
        }
    }

    fn deliver(&self, record: &Record) {
        for sink in self.sinks.iter() {
            if !sink.accepts(record) {
                continue;
            }
            if let Err(err) = sink.write(record) {
                self.trap.trap(&err);
            }
        }
    }

    fn flush_all(&self) {
        if let Err(err) = Control::Flush.apply(&self.sinks, self.trap.as_ref()) {
            self.trap.trap(&err);
        }
    }
}
